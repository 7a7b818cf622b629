use crate::prefs::CustomBang;
use std::collections::HashMap;

pub mod source;

pub use source::{fetch_default_bangs, CatalogSources, RemoteBang};

/// Default bangs whose destination expects the query verbatim (the Wayback
/// Machine takes a raw URL after `/web/*/`).
pub const UNENCODED_TOKENS: [&str; 2] = ["wayback", "waybackmachine"];

/// Resolution rules for a single bang.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Lower-cased bang without the symbol.
    pub token: String,
    /// Destination URL containing the `{{{s}}}` placeholder.
    pub template: String,
    pub encode_query: bool,
    /// Open the template's origin when the query after the bang is empty.
    pub open_base_url: bool,
}

impl CatalogEntry {
    /// Entry for a bang published in the default catalog.
    pub fn from_default(token: &str, template: &str) -> Self {
        Self {
            token: token.to_lowercase(),
            template: template.to_string(),
            encode_query: true,
            open_base_url: true,
        }
    }

    /// Entry for a user-defined bang. Returns `None` when the bang has no
    /// usable token or URL.
    pub fn from_custom(bang: &CustomBang) -> Option<Self> {
        let token = bang.bang.trim().to_lowercase();
        let template = bang.url.trim();
        if token.is_empty() || template.is_empty() {
            return None;
        }
        Some(Self {
            token,
            template: template.to_string(),
            encode_query: bang.url_encode_query,
            open_base_url: bang.open_base_url.unwrap_or(false),
        })
    }
}

/// Token to entry mapping. Keys are always lower-cased.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the default catalog from a fetched bang list, applying the
    /// encoding exceptions in [`UNENCODED_TOKENS`].
    pub fn from_remote(bangs: &[RemoteBang]) -> Self {
        let mut catalog = Self::new();
        for bang in bangs {
            let (Some(token), Some(template)) = (bang.t.as_deref(), bang.u.as_deref()) else {
                continue;
            };
            if token.trim().is_empty() || template.trim().is_empty() {
                continue;
            }
            catalog.insert(CatalogEntry::from_default(token.trim(), template.trim()));
        }
        for token in UNENCODED_TOKENS {
            if let Some(entry) = catalog.entries.get_mut(token) {
                entry.encode_query = false;
            }
        }
        catalog
    }

    /// Insert or fully replace the entry for `entry.token`.
    pub fn insert(&mut self, mut entry: CatalogEntry) {
        entry.token = entry.token.to_lowercase();
        self.entries.insert(entry.token.clone(), entry);
    }

    pub fn remove(&mut self, token: &str) -> Option<CatalogEntry> {
        self.entries.remove(&token.to_lowercase())
    }

    /// Look up a bang. Callers pass the token already lower-cased, as
    /// produced by [`crate::detect::detect`].
    pub fn resolve(&self, token: &str) -> Option<&CatalogEntry> {
        self.entries.get(token)
    }

    /// Apply user-defined bangs on top of the current entries. Invalid
    /// custom bangs are skipped; the count of applied ones is returned.
    pub fn overlay<'a>(&mut self, bangs: impl IntoIterator<Item = &'a CustomBang>) -> usize {
        let mut applied = 0;
        for bang in bangs {
            match CatalogEntry::from_custom(bang) {
                Some(entry) => {
                    self.insert(entry);
                    applied += 1;
                }
                None => tracing::warn!(bang = %bang.bang, "skipping invalid custom bang"),
            }
        }
        applied
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
