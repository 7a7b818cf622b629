use serde::{Deserialize, Serialize};

/// Version of the preference layout written by [`crate::prefs::migrate`].
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional file receiving log output instead of stderr.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Remote bang list fetched at startup.
    #[serde(default = "default_primary_catalog_url")]
    pub primary_catalog_url: String,
    /// Bang list fetched when the primary source fails.
    #[serde(default = "default_fallback_catalog_url")]
    pub fallback_catalog_url: String,
    /// Per-request timeout for the catalog fetch, in seconds.
    #[serde(default = "default_catalog_timeout_secs")]
    pub catalog_timeout_secs: u64,
    /// JSON file holding custom bangs and the bang symbol.
    #[serde(default = "default_preferences_path")]
    pub preferences_path: String,
    /// How often `serve` re-reads the preferences file for edits made by
    /// other processes, in seconds. `0` disables reloading.
    #[serde(default = "default_preferences_reload_secs")]
    pub preferences_reload_secs: u64,
    /// Preference layout version last migrated to.
    #[serde(default)]
    pub schema_version: u32,
}

fn default_primary_catalog_url() -> String {
    "https://raw.githubusercontent.com/kagisearch/bangs/main/data/bangs.json".into()
}

fn default_fallback_catalog_url() -> String {
    "https://duckduckgo.com/bang.js".into()
}

fn default_catalog_timeout_secs() -> u64 {
    10
}

fn default_preferences_reload_secs() -> u64 {
    2
}

fn default_preferences_path() -> String {
    "preferences.json".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            primary_catalog_url: default_primary_catalog_url(),
            fallback_catalog_url: default_fallback_catalog_url(),
            catalog_timeout_secs: default_catalog_timeout_secs(),
            preferences_path: default_preferences_path(),
            preferences_reload_secs: default_preferences_reload_secs(),
            schema_version: 0,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Whether stored preferences predate the current layout.
    pub fn needs_migration(&self) -> bool {
        self.schema_version < CURRENT_SCHEMA_VERSION
    }

    pub fn catalog_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.catalog_timeout_secs.max(1))
    }

    pub fn preferences_reload_interval(&self) -> Option<std::time::Duration> {
        (self.preferences_reload_secs > 0)
            .then(|| std::time::Duration::from_secs(self.preferences_reload_secs))
    }
}
