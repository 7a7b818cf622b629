use crate::catalog::{fetch_default_bangs, Catalog, CatalogEntry, CatalogSources, RemoteBang};
use crate::prefs::{classify_key, CustomBang, PrefKey, PreferenceChange, PreferenceStore};
use crate::DEFAULT_BANG_SYMBOL;
use serde_json::Value;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

#[derive(Debug)]
struct StoreState {
    catalog: Catalog,
    symbol: String,
    initialized: bool,
}

/// The bang catalog and the active bang symbol.
///
/// Cloning yields another handle to the same state. The store starts empty;
/// lookups made before initialization finishes simply find nothing.
#[derive(Clone, Debug)]
pub struct BangStore {
    inner: Arc<RwLock<StoreState>>,
}

impl Default for BangStore {
    fn default() -> Self {
        Self::new()
    }
}

fn valid_symbol(value: &Value) -> Option<&str> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.chars().any(char::is_whitespace))
}

impl BangStore {
    pub fn new() -> Self {
        Self::with_catalog(Catalog::new())
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreState {
                catalog,
                symbol: DEFAULT_BANG_SYMBOL.to_string(),
                initialized: false,
            })),
        }
    }

    /// Run `f` against the current catalog and symbol. Returns `None` if the
    /// lock was poisoned.
    pub fn with_state<R>(&self, f: impl FnOnce(&Catalog, &str) -> R) -> Option<R> {
        let state = self.inner.read().ok()?;
        Some(f(&state.catalog, &state.symbol))
    }

    pub fn resolve(&self, token: &str) -> Option<CatalogEntry> {
        self.with_state(|catalog, _| catalog.resolve(token).cloned())
            .flatten()
    }

    pub fn symbol(&self) -> String {
        self.with_state(|_, symbol| symbol.to_string())
            .unwrap_or_else(|| DEFAULT_BANG_SYMBOL.to_string())
    }

    pub fn len(&self) -> usize {
        self.with_state(|catalog, _| catalog.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.read().map(|s| s.initialized).unwrap_or(false)
    }

    /// Build the catalog from `defaults`, overlay the custom bangs and symbol
    /// stored in `prefs`, and install the result.
    ///
    /// The store stays write-locked while preferences are read so that no
    /// change notification can slip between the read and the install.
    pub fn initialize_from(&self, defaults: &[RemoteBang], prefs: &dyn PreferenceStore) {
        let mut catalog = Catalog::from_remote(defaults);
        let Ok(mut state) = self.inner.write() else {
            tracing::error!("bang store lock poisoned; catalog not installed");
            return;
        };

        let mut symbol = None;
        match prefs.get_all() {
            Ok(items) => {
                let mut custom = Vec::new();
                for (key, value) in &items {
                    match classify_key(key) {
                        PrefKey::Bang(_) => match CustomBang::from_value(value) {
                            Some(bang) => custom.push(bang),
                            None => tracing::warn!(%key, "ignoring unreadable custom bang"),
                        },
                        PrefKey::BangSymbol => match valid_symbol(value) {
                            Some(s) => symbol = Some(s.to_string()),
                            None => tracing::warn!("ignoring invalid bang symbol {value}"),
                        },
                        PrefKey::SearchEngine(_) | PrefKey::Legacy(_) => {}
                    }
                }
                let applied = catalog.overlay(custom.iter());
                tracing::debug!(applied, "applied custom bangs");
            }
            Err(err) => tracing::warn!("failed to read preferences ({err:#}); using defaults only"),
        }

        state.catalog = catalog;
        if let Some(symbol) = symbol {
            state.symbol = symbol;
        }
        state.initialized = true;
        tracing::info!(bangs = state.catalog.len(), symbol = %state.symbol, "bang catalog ready");
    }

    /// Fetch the default catalog and initialize. Blocks on the network.
    pub fn initialize(&self, sources: &CatalogSources, prefs: &dyn PreferenceStore) {
        let defaults = fetch_default_bangs(sources);
        self.initialize_from(&defaults, prefs);
    }

    /// [`BangStore::initialize`] on a background thread.
    pub fn spawn_initialize(
        &self,
        sources: CatalogSources,
        prefs: Arc<dyn PreferenceStore>,
    ) -> JoinHandle<()> {
        let store = self.clone();
        thread::spawn(move || store.initialize(&sources, prefs.as_ref()))
    }

    /// Apply a single preference change. Re-applying the same change leaves
    /// the store unchanged.
    pub fn apply_change(&self, change: &PreferenceChange) {
        let Ok(mut state) = self.inner.write() else {
            tracing::error!("bang store lock poisoned; dropping change to {}", change.key);
            return;
        };
        match classify_key(&change.key) {
            PrefKey::Bang(suffix) => {
                let old_token = change
                    .old_value
                    .as_ref()
                    .and_then(CustomBang::from_value)
                    .map(|b| b.bang.trim().to_lowercase())
                    .unwrap_or_else(|| suffix.to_lowercase());
                match &change.new_value {
                    Some(value) => {
                        let Some(entry) = CustomBang::from_value(value)
                            .as_ref()
                            .and_then(CatalogEntry::from_custom)
                        else {
                            tracing::warn!(key = %change.key, "ignoring unreadable custom bang");
                            return;
                        };
                        if change.old_value.is_some() && old_token != entry.token {
                            state.catalog.remove(&old_token);
                        }
                        tracing::debug!(token = %entry.token, "custom bang updated");
                        state.catalog.insert(entry);
                    }
                    None => {
                        state.catalog.remove(&old_token);
                        tracing::debug!(token = %old_token, "custom bang removed");
                    }
                }
            }
            PrefKey::BangSymbol => match &change.new_value {
                Some(value) => match valid_symbol(value) {
                    Some(symbol) => {
                        tracing::debug!(%symbol, "bang symbol changed");
                        state.symbol = symbol.to_string();
                    }
                    None => tracing::warn!("ignoring invalid bang symbol {value}"),
                },
                None => state.symbol = DEFAULT_BANG_SYMBOL.to_string(),
            },
            PrefKey::SearchEngine(_) | PrefKey::Legacy(_) => {}
        }
    }

    pub fn apply_changes(&self, changes: &[PreferenceChange]) {
        for change in changes {
            self.apply_change(change);
        }
    }

    /// Apply change batches from `changes` until the sender goes away.
    pub fn spawn_change_listener(
        &self,
        changes: Receiver<Vec<PreferenceChange>>,
    ) -> JoinHandle<()> {
        let store = self.clone();
        thread::spawn(move || {
            for batch in changes {
                store.apply_changes(&batch);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::JsonPreferences;
    use serde_json::json;

    fn change(key: &str, old: Option<Value>, new: Option<Value>) -> PreferenceChange {
        PreferenceChange {
            key: key.into(),
            old_value: old,
            new_value: new,
        }
    }

    fn bang(token: &str, url: &str) -> Value {
        json!({ "name": token, "bang": token, "url": url, "urlEncodeQuery": true })
    }

    #[test]
    fn empty_until_initialized() {
        let store = BangStore::new();
        assert!(!store.is_initialized());
        assert!(store.resolve("w").is_none());
        assert_eq!(store.symbol(), "!");
    }

    #[test]
    fn upsert_and_remove_are_immediate() {
        let store = BangStore::new();
        let value = bang("gh", "https://github.com/search?q={{{s}}}");
        store.apply_change(&change("bang_gh", None, Some(value.clone())));
        let entry = store.resolve("gh").unwrap();
        assert!(!entry.open_base_url);

        store.apply_change(&change("bang_gh", None, Some(value.clone())));
        assert_eq!(store.len(), 1);

        store.apply_change(&change("bang_gh", Some(value), None));
        assert!(store.resolve("gh").is_none());
    }

    #[test]
    fn retargeted_key_drops_the_old_token() {
        let store = BangStore::new();
        let old = bang("a", "https://a.example/?q={{{s}}}");
        store.apply_change(&change("bang_a", None, Some(old.clone())));
        store.apply_change(&change(
            "bang_a",
            Some(old),
            Some(bang("b", "https://b.example/?q={{{s}}}")),
        ));
        assert!(store.resolve("a").is_none());
        assert_eq!(store.resolve("b").unwrap().template, "https://b.example/?q={{{s}}}");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn removal_without_old_value_uses_key() {
        let store = BangStore::new();
        store.apply_change(&change("bang_gh", None, Some(bang("gh", "https://github.com"))));
        store.apply_change(&change("bang_gh", None, None));
        assert!(store.is_empty());
    }

    #[test]
    fn symbol_changes_apply_and_reset() {
        let store = BangStore::new();
        store.apply_change(&change("bangSymbol", None, Some(json!("?"))));
        assert_eq!(store.symbol(), "?");
        store.apply_change(&change("bangSymbol", None, Some(json!(""))));
        assert_eq!(store.symbol(), "?");
        store.apply_change(&change("bangSymbol", Some(json!("?")), None));
        assert_eq!(store.symbol(), "!");
    }

    #[test]
    fn search_engine_keys_are_ignored() {
        let store = BangStore::new();
        store.apply_change(&change("searchEngine_default", None, Some(json!("ddg"))));
        assert!(store.is_empty());
        assert_eq!(store.symbol(), "!");
    }

    #[test]
    fn initialize_overlays_preferences() {
        let prefs = JsonPreferences::in_memory();
        prefs
            .set(crate::prefs::PrefMap::from([
                ("bang_w".to_string(), bang("w", "https://de.wikipedia.org/?search={{{s}}}")),
                ("bang_broken".to_string(), json!("not an object")),
                ("bangSymbol".to_string(), json!("@")),
            ]))
            .unwrap();
        let store = BangStore::new();
        store.initialize_from(
            &[RemoteBang {
                t: Some("w".into()),
                u: Some("https://en.wikipedia.org/?search={{{s}}}".into()),
            }],
            &prefs,
        );
        assert!(store.is_initialized());
        assert_eq!(store.symbol(), "@");
        let entry = store.resolve("w").unwrap();
        assert_eq!(entry.template, "https://de.wikipedia.org/?search={{{s}}}");
        assert!(!entry.open_base_url);
        assert_eq!(store.len(), 1);
    }
}
