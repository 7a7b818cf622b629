pub mod catalog;
pub mod detect;
pub mod dispatch;
pub mod extract;
pub mod interceptor;
pub mod logging;
pub mod prefs;
pub mod settings;
pub mod store;
pub mod synth;

pub use catalog::{Catalog, CatalogEntry};
pub use dispatch::{Dispatcher, Navigator, TabTarget};
pub use extract::RequestDetails;
pub use interceptor::{resolve_redirect, Disposition, Interceptor, RedirectDecision};
pub use store::BangStore;

/// Symbol used when no custom symbol preference is stored.
pub const DEFAULT_BANG_SYMBOL: &str = "!";

/// Placeholder replaced by the remaining query in destination templates.
pub const QUERY_PLACEHOLDER: &str = "{{{s}}}";
