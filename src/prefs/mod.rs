//! Preference storage shared with the settings UI.
//!
//! Preferences are a flat key/value map. Keys are namespaced by prefix:
//! custom bangs live under [`BANG_PREFIX`], the active bang symbol under
//! [`BANG_SYMBOL_KEY`] and search-engine settings under
//! [`SEARCH_ENGINE_PREFIX`]. The redirect engine only reads the first two.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;

pub mod custom;
pub mod json_store;
pub mod migrate;

pub use custom::{list_custom_bangs, remove_custom_bang, save_custom_bang, set_bang_symbol, BangForm};
pub use json_store::JsonPreferences;
pub use migrate::{migrate_schema, WriteOutcome};

pub const BANG_PREFIX: &str = "bang_";
pub const BANG_SYMBOL_KEY: &str = "bangSymbol";
pub const SEARCH_ENGINE_PREFIX: &str = "searchEngine_";

pub type PrefMap = BTreeMap<String, Value>;

/// Namespace a preference key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefKey<'a> {
    /// Custom bang; carries the key suffix after [`BANG_PREFIX`].
    Bang(&'a str),
    BangSymbol,
    SearchEngine(&'a str),
    /// Keys written by older versions before namespacing.
    Legacy(&'a str),
}

pub fn classify_key(key: &str) -> PrefKey<'_> {
    if key.starts_with(BANG_SYMBOL_KEY) {
        PrefKey::BangSymbol
    } else if let Some(rest) = key.strip_prefix(BANG_PREFIX) {
        PrefKey::Bang(rest)
    } else if let Some(rest) = key.strip_prefix(SEARCH_ENGINE_PREFIX) {
        PrefKey::SearchEngine(rest)
    } else {
        PrefKey::Legacy(key)
    }
}

/// Storage key of a custom bang.
pub fn bang_key(bang: &str) -> String {
    format!("{BANG_PREFIX}{}", bang.trim().to_lowercase())
}

/// A user-defined bang as stored in preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomBang {
    #[serde(default)]
    pub name: String,
    pub url: String,
    pub bang: String,
    #[serde(default)]
    pub url_encode_query: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_base_url: Option<bool>,
    #[serde(default)]
    pub order: u32,
}

impl CustomBang {
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// One changed key, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Key/value preference storage with change notifications.
pub trait PreferenceStore: Send + Sync {
    fn get_all(&self) -> Result<PrefMap>;
    fn get(&self, key: &str) -> Result<Option<Value>>;
    /// Write all `items` as one batch.
    fn set(&self, items: PrefMap) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
    /// Receive one batch of changes per successful write.
    fn subscribe(&self) -> Receiver<Vec<PreferenceChange>>;
}
