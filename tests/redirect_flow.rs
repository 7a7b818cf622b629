
use bang_redirect::catalog::{Catalog, CatalogEntry, RemoteBang};
use bang_redirect::dispatch::TabTarget;
use bang_redirect::interceptor::{PassReason, RedirectDecision};
use bang_redirect::prefs::{save_custom_bang, set_bang_symbol, BangForm, JsonPreferences, PreferenceStore};
use bang_redirect::{resolve_redirect, BangStore, Disposition, Dispatcher, Interceptor, RequestDetails};
use mock_navigator::{next_redirect, MockNavigator};
use std::sync::Arc;
use std::time::Duration;

const BING_W: &str = "https://www.bing.com/search?q={{{s}}}&form=wiki";

fn defaults() -> Vec<RemoteBang> {
    vec![
        RemoteBang {
            t: Some("w".into()),
            u: Some(BING_W.into()),
        },
        RemoteBang {
            t: Some("wayback".into()),
            u: Some("https://web.archive.org/web/*/{{{s}}}".into()),
        },
    ]
}

fn ddg(query: &str) -> RequestDetails {
    RequestDetails::new(format!(
        "https://duckduckgo.com/?q={}",
        urlencoding::encode(query)
    ))
}

#[test]
fn large_hadron_collider_redirects() {
    let prefs = JsonPreferences::in_memory();
    let store = BangStore::new();
    store.initialize_from(&defaults(), &prefs);
    let (navigator, rx) = MockNavigator::new();
    let interceptor = Interceptor::new(store, Dispatcher::new(Arc::new(navigator)));

    let request = ddg("!w large hadron collider").with_tab(4);
    assert_eq!(interceptor.on_before_request(&request), Disposition::Allow);
    assert_eq!(
        next_redirect(&rx),
        Some((
            TabTarget::Tab(4),
            "https://www.bing.com/search?q=large%20hadron%20collider&form=wiki".to_string()
        ))
    );
}

#[test]
fn suffix_bang_without_tab_targets_active_tab() {
    let store = BangStore::new();
    store.initialize_from(&defaults(), &JsonPreferences::in_memory());
    let (navigator, rx) = MockNavigator::new();
    let interceptor = Interceptor::new(store, Dispatcher::new(Arc::new(navigator)));

    interceptor.on_before_request(&ddg("einstein !W"));
    let (target, url) = next_redirect(&rx).unwrap();
    assert_eq!(target, TabTarget::Active);
    assert_eq!(url, "https://www.bing.com/search?q=einstein&form=wiki");
}

#[test]
fn empty_query_opens_site_root() {
    let store = BangStore::new();
    store.initialize_from(&defaults(), &JsonPreferences::in_memory());
    let (navigator, rx) = MockNavigator::new();
    let interceptor = Interceptor::new(store, Dispatcher::new(Arc::new(navigator)));

    interceptor.on_before_request(&ddg("!w"));
    assert_eq!(next_redirect(&rx).unwrap().1, "https://www.bing.com");
}

#[test]
fn wayback_gets_the_raw_query() {
    let store = BangStore::new();
    store.initialize_from(&defaults(), &JsonPreferences::in_memory());
    let request = ddg("!wayback https://example.com/a?b=c");
    let interceptor = Interceptor::new(store, Dispatcher::new(Arc::new(MockNavigator::new().0)));
    assert_eq!(
        interceptor.decide(&request).redirect_url(),
        Some("https://web.archive.org/web/*/https://example.com/a?b=c")
    );
}

#[test]
fn autocomplete_never_redirects() {
    let store = BangStore::new();
    store.initialize_from(&defaults(), &JsonPreferences::in_memory());
    let (navigator, rx) = MockNavigator::new();
    let interceptor = Interceptor::new(store, Dispatcher::new(Arc::new(navigator)));

    for query in ["!w einstein", "einstein !w", "!w"] {
        let request = RequestDetails::new(format!(
            "https://www.google.com/autocomplete?q={}",
            urlencoding::encode(query)
        ));
        assert_eq!(interceptor.on_before_request(&request), Disposition::Allow);
        assert_eq!(
            interceptor.decide(&request),
            RedirectDecision::PassThrough(PassReason::NoQuery)
        );
    }
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn uninitialized_store_passes_everything_through() {
    let interceptor = Interceptor::new(
        BangStore::new(),
        Dispatcher::new(Arc::new(MockNavigator::new().0)),
    );
    assert_eq!(
        interceptor.decide(&ddg("!w einstein")),
        RedirectDecision::PassThrough(PassReason::UnknownToken)
    );
}

#[test]
fn live_preference_changes_reach_the_interceptor() {
    let prefs = JsonPreferences::in_memory();
    let store = BangStore::new();
    let listener = store.spawn_change_listener(prefs.subscribe());
    store.initialize_from(&defaults(), &prefs);
    let interceptor = Interceptor::new(store.clone(), Dispatcher::new(Arc::new(MockNavigator::new().0)));

    save_custom_bang(
        &prefs,
        &BangForm {
            name: "Rust docs".into(),
            url: "https://doc.rust-lang.org/std/?search={{{s}}}".into(),
            bang: "rs".into(),
            url_encode_query: true,
            open_base_url: false,
        },
        None,
    )
    .unwrap();
    set_bang_symbol(&prefs, "?").unwrap();
    drop(prefs);
    listener.join().unwrap();

    assert_eq!(store.symbol(), "?");
    assert_eq!(
        interceptor.decide(&ddg("?rs vec")).redirect_url(),
        Some("https://doc.rust-lang.org/std/?search=vec")
    );
    assert_eq!(
        interceptor.decide(&ddg("!rs vec")),
        RedirectDecision::PassThrough(PassReason::NoToken)
    );
    // Empty query, base URL shortcut disabled for custom bangs.
    assert_eq!(
        interceptor.decide(&ddg("?rs")).redirect_url(),
        Some("https://doc.rust-lang.org/std/?search=")
    );
}

#[test]
fn removing_an_override_removes_the_bang() {
    let prefs = JsonPreferences::in_memory();
    save_custom_bang(
        &prefs,
        &BangForm {
            name: "German Wikipedia".into(),
            url: "https://de.wikipedia.org/w/index.php?search={{{s}}}".into(),
            bang: "w".into(),
            url_encode_query: true,
            open_base_url: true,
        },
        None,
    )
    .unwrap();
    let store = BangStore::new();
    let changes = prefs.subscribe();
    store.initialize_from(&defaults(), &prefs);
    assert!(store.resolve("w").unwrap().template.starts_with("https://de.wikipedia.org"));

    prefs.remove("bang_w").unwrap();
    store.apply_changes(&changes.try_recv().unwrap());
    assert!(store.resolve("w").is_none());
}

#[test]
fn prefix_and_suffix_detection_hold_for_every_catalog_token() {
    let mut catalog = Catalog::new();
    for token in ["a", "gh", "yt", "w", "crates"] {
        catalog.insert(CatalogEntry::from_default(token, "https://x.example/?q={{{s}}}"));
    }
    for symbol in ["!", "::", "@"] {
        for token in ["a", "gh", "yt", "w", "crates"] {
            for query in ["one", "two words", "three word query"] {
                let expected = Some(format!(
                    "https://x.example/?q={}",
                    urlencoding::encode(query)
                ));
                let prefixed = ddg(&format!("{symbol}{token} {query}"));
                let suffixed = ddg(&format!("{query} {symbol}{token}"));
                assert_eq!(
                    resolve_redirect(&prefixed, &catalog, symbol).redirect_url(),
                    expected.as_deref()
                );
                assert_eq!(
                    resolve_redirect(&suffixed, &catalog, symbol).redirect_url(),
                    expected.as_deref()
                );
                assert_eq!(
                    resolve_redirect(&ddg(query), &catalog, symbol),
                    RedirectDecision::PassThrough(PassReason::NoToken)
                );
            }
        }
    }
}

#[test]
fn concurrent_edits_leave_catalog_matching_preferences() {
    for _ in 0..20 {
        let prefs = Arc::new(JsonPreferences::in_memory());
        let store = BangStore::new();
        let listener = store.spawn_change_listener(prefs.subscribe());
        store.initialize_from(&defaults(), prefs.as_ref());

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let prefs = prefs.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let url = format!("https://w{w}-{i}.example/?q={{{{{{s}}}}}}");
                        let value = serde_json::json!({"name": "x", "bang": "x", "url": url});
                        prefs
                            .set(std::collections::BTreeMap::from([("bang_x".to_string(), value)]))
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let stored = prefs.get("bang_x").unwrap().unwrap();
        drop(prefs);
        listener.join().unwrap();
        assert_eq!(
            store.resolve("x").unwrap().template,
            stored["url"].as_str().unwrap()
        );
    }
}

#[test]
fn reload_picks_up_bangs_added_by_another_writer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preferences.json");
    let serving = JsonPreferences::open(&path).unwrap();
    let store = BangStore::new();
    let changes = serving.subscribe();
    store.initialize_from(&defaults(), &serving);

    let editor = JsonPreferences::open(&path).unwrap();
    save_custom_bang(
        &editor,
        &BangForm {
            name: "crates.io".into(),
            url: "https://crates.io/search?q={{{s}}}".into(),
            bang: "cr".into(),
            url_encode_query: true,
            open_base_url: false,
        },
        None,
    )
    .unwrap();
    assert!(store.resolve("cr").is_none());

    serving.reload().unwrap();
    store.apply_changes(&changes.try_recv().unwrap());
    assert_eq!(
        store.resolve("cr").unwrap().template,
        "https://crates.io/search?q={{{s}}}"
    );
}
