use anyhow::{bail, Context};
use bang_redirect::catalog::CatalogSources;
use bang_redirect::dispatch::SystemNavigator;
use bang_redirect::interceptor::RedirectDecision;
use bang_redirect::prefs::{self, BangForm, JsonPreferences, PreferenceStore};
use bang_redirect::settings::{Settings, CURRENT_SCHEMA_VERSION};
use bang_redirect::{logging, BangStore, Dispatcher, Interceptor, RequestDetails};
use clap::{ArgAction, Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "bang_redirect", version, about = "Turn !bang search queries into direct navigations")]
struct Cli {
    /// Settings file.
    #[arg(long, default_value = "settings.json")]
    settings: String,

    /// Do not fetch the default bang catalog; only custom bangs resolve.
    #[arg(long, action = ArgAction::SetTrue)]
    offline: bool,

    /// Enable debug logging regardless of the settings file.
    #[arg(long, action = ArgAction::SetTrue)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Intercept a single request and print where it would redirect.
    Intercept {
        /// Request URL.
        url: String,
        /// Originating tab.
        #[arg(long)]
        tab: Option<u32>,
        /// Form body field (repeatable).
        #[arg(long = "form", value_name = "KEY=VALUE")]
        form: Vec<String>,
        /// Open the redirect target in the system browser.
        #[arg(long, action = ArgAction::SetTrue)]
        open: bool,
    },
    /// Read JSON request descriptors from stdin, one per line, and redirect
    /// matching ones through the system browser. Bang edits made by other
    /// invocations are picked up every `preferences_reload_secs`.
    Serve,
    /// Add or edit a custom bang.
    Add {
        bang: String,
        url: String,
        #[arg(long)]
        name: Option<String>,
        /// Substitute the query without percent-encoding.
        #[arg(long, action = ArgAction::SetTrue)]
        no_encode: bool,
        /// Open the site's base URL when no query follows the bang.
        #[arg(long, action = ArgAction::SetTrue)]
        open_base: bool,
        /// Existing bang this one replaces.
        #[arg(long, value_name = "BANG")]
        replace: Option<String>,
    },
    /// Remove a custom bang.
    Remove { bang: String },
    /// List custom bangs.
    List,
    /// Set the bang symbol.
    Symbol { symbol: String },
}

fn parse_form(fields: &[String]) -> anyhow::Result<RequestDetails> {
    let mut request = RequestDetails::default();
    for field in fields {
        let Some((key, value)) = field.split_once('=') else {
            bail!("form field '{field}' is not KEY=VALUE");
        };
        request = request.with_form_field(key, value);
    }
    Ok(request)
}

fn migrate_if_needed(
    settings: &mut Settings,
    settings_path: &str,
    preferences: &dyn PreferenceStore,
) {
    if !settings.needs_migration() {
        return;
    }
    match prefs::migrate_schema(preferences) {
        Ok(outcome) => {
            tracing::debug!(?outcome, "preference migration finished");
            settings.schema_version = CURRENT_SCHEMA_VERSION;
            if let Err(e) = settings.save(settings_path) {
                tracing::warn!("failed to save settings: {e:#}");
            }
        }
        Err(e) => tracing::warn!("preference migration failed: {e:#}"),
    }
}

fn load_store(settings: &Settings, offline: bool, preferences: &dyn PreferenceStore) -> BangStore {
    let store = BangStore::new();
    if offline {
        store.initialize_from(&[], preferences);
    } else {
        store.initialize(&CatalogSources::from_settings(settings), preferences);
    }
    store
}

/// Re-read the preferences file periodically so edits from other processes
/// reach the change listener.
fn spawn_preferences_reload(preferences: Arc<JsonPreferences>, interval: Duration) {
    thread::spawn(move || loop {
        thread::sleep(interval);
        if let Err(e) = preferences.reload() {
            tracing::warn!("failed to reload preferences: {e:#}");
        }
    });
}

fn print_decision(decision: &RedirectDecision) {
    match decision {
        RedirectDecision::Redirect { url } => println!("{url}"),
        RedirectDecision::PassThrough(reason) => println!("pass-through ({reason:?})"),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.settings)
        .with_context(|| format!("load settings from {}", cli.settings))?;
    logging::init(
        settings.debug_logging || cli.debug,
        settings.log_file.as_ref().map(PathBuf::from),
    );

    let preferences = Arc::new(JsonPreferences::open(&settings.preferences_path)?);
    migrate_if_needed(&mut settings, &cli.settings, preferences.as_ref());

    match cli.command {
        Command::Intercept {
            url,
            tab,
            form,
            open,
        } => {
            let mut request = parse_form(&form)?;
            request.url = url;
            request.tab_id = tab;
            let store = load_store(&settings, cli.offline, preferences.as_ref());
            let dispatcher = Dispatcher::new(Arc::new(SystemNavigator));
            let interceptor = Interceptor::new(store, dispatcher.clone());
            let decision = interceptor.decide(&request);
            print_decision(&decision);
            if let (true, Some(url)) = (open, decision.redirect_url()) {
                dispatcher.redirect_now(request.tab_id, url);
            }
        }
        Command::Serve => {
            let store = BangStore::new();
            store.spawn_change_listener(preferences.subscribe());
            if let Some(interval) = settings.preferences_reload_interval() {
                spawn_preferences_reload(preferences.clone(), interval);
            }
            if cli.offline {
                store.initialize_from(&[], preferences.as_ref());
            } else {
                store.spawn_initialize(CatalogSources::from_settings(&settings), preferences.clone());
            }
            let interceptor = Interceptor::new(store, Dispatcher::new(Arc::new(SystemNavigator)));
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = line.context("read request")?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<RequestDetails>(&line) {
                    Ok(request) => print_decision(&interceptor.handle(&request)),
                    Err(e) => tracing::warn!("skipping malformed request: {e}"),
                }
            }
        }
        Command::Add {
            bang,
            url,
            name,
            no_encode,
            open_base,
            replace,
        } => {
            let form = BangForm {
                name: name.unwrap_or_else(|| bang.clone()),
                url,
                bang,
                url_encode_query: !no_encode,
                open_base_url: open_base,
            };
            let saved = prefs::save_custom_bang(preferences.as_ref(), &form, replace.as_deref())?;
            println!("saved {} -> {}", saved.bang, saved.url);
        }
        Command::Remove { bang } => {
            if !prefs::remove_custom_bang(preferences.as_ref(), &bang)? {
                bail!("no custom bang '{bang}'");
            }
        }
        Command::List => {
            let symbol = preferences
                .get(prefs::BANG_SYMBOL_KEY)?
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| bang_redirect::DEFAULT_BANG_SYMBOL.to_string());
            for bang in prefs::list_custom_bangs(preferences.as_ref())? {
                println!("{symbol}{}\t{}\t{}", bang.bang, bang.name, bang.url);
            }
        }
        Command::Symbol { symbol } => prefs::set_bang_symbol(preferences.as_ref(), &symbol)?,
    }
    Ok(())
}
