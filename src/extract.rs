use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Query parameter names used by search engines, in lookup order
/// (`eingabe` for MetaGer, `wd` for Baidu).
pub const QUERY_PARAMS: [&str; 6] = ["q", "p", "query", "text", "eingabe", "wd"];

/// Path fragments of suggestion/autocomplete endpoints. Requests to them are
/// fired while the user is still typing and must never redirect.
pub const SUGGESTION_PATHS: [&str; 6] = [
    "/ac",
    "suggest",
    "/complete",
    "/autocompleter",
    "/autocomplete",
    "/sugrec",
];

/// An outgoing request as seen by the interception layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetails {
    pub url: String,
    /// Parsed form-encoded body, field name to values.
    #[serde(default)]
    pub form_data: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub tab_id: Option<u32>,
}

impl RequestDetails {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_tab(mut self, tab_id: u32) -> Self {
        self.tab_id = Some(tab_id);
        self
    }

    pub fn with_form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_data
            .get_or_insert_with(HashMap::new)
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// The user query carried by this request, if any.
    pub fn query(&self) -> Option<String> {
        extract_query(&self.url, self.form_data.as_ref())
    }
}

/// Whether `url` targets a suggestion endpoint. Baidu marks its suggestion
/// requests with `mod=1` instead of a distinct path.
pub fn is_suggestion_request(url: &Url) -> bool {
    let path = url.path();
    SUGGESTION_PATHS.iter().any(|p| path.contains(p))
        || url.query_pairs().any(|(k, v)| k == "mod" && v == "1")
}

fn url_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

fn form_field(form: Option<&HashMap<String, Vec<String>>>, name: &str) -> Option<String> {
    form?.get(name)?.first().cloned()
}

/// Extract the search query from a request URL, falling back to the form
/// body for engines that POST their queries.
///
/// For each name in [`QUERY_PARAMS`] the URL is consulted before the body;
/// the first non-empty value wins.
pub fn extract_query(
    request_url: &str,
    form: Option<&HashMap<String, Vec<String>>>,
) -> Option<String> {
    let url = Url::parse(request_url).ok()?;
    if is_suggestion_request(&url) {
        return None;
    }
    QUERY_PARAMS.iter().find_map(|name| {
        url_param(&url, name)
            .filter(|q| !q.is_empty())
            .or_else(|| form_field(form, name))
            .filter(|q| !q.is_empty())
    })
}
