use super::{bang_key, classify_key, CustomBang, PrefKey, PrefMap, PreferenceStore, BANG_SYMBOL_KEY};
use anyhow::{bail, Result};
use serde_json::Value;
use url::Url;

/// Values entered in the add/edit bang form.
#[derive(Debug, Clone, Default)]
pub struct BangForm {
    pub name: String,
    pub url: String,
    pub bang: String,
    pub url_encode_query: bool,
    pub open_base_url: bool,
}

/// Remove any leading or trailing `symbol` the user typed around a bang.
pub fn strip_symbol<'a>(bang: &'a str, symbol: &str) -> &'a str {
    let mut bang = bang.trim();
    if symbol.is_empty() {
        return bang;
    }
    while let Some(rest) = bang.strip_prefix(symbol) {
        bang = rest;
    }
    while let Some(rest) = bang.strip_suffix(symbol) {
        bang = rest;
    }
    bang
}

/// Strip the default `!` and the active symbol from a typed bang.
fn normalize_bang<'a>(bang: &'a str, symbol: &str) -> &'a str {
    let mut bang = bang.trim();
    loop {
        let next = strip_symbol(strip_symbol(bang, crate::DEFAULT_BANG_SYMBOL), symbol);
        if next == bang {
            return bang;
        }
        bang = next;
    }
}

fn validate_url(raw: &str) -> Result<String> {
    let Ok(url) = Url::parse(raw.trim()) else {
        bail!("invalid URL (don't forget to include the scheme, e.g. 'https://')");
    };
    // `Url` escapes the braces of the placeholder inside paths.
    Ok(urlencoding::decode(url.as_str())
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| url.to_string()))
}

fn current_symbol(prefs: &dyn PreferenceStore) -> Result<String> {
    Ok(prefs
        .get(BANG_SYMBOL_KEY)?
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| crate::DEFAULT_BANG_SYMBOL.to_string()))
}

/// Validate and store a custom bang.
///
/// `previous` names the bang being edited; renaming removes the old key.
/// New bangs are appended after the highest existing `order`.
pub fn save_custom_bang(
    prefs: &dyn PreferenceStore,
    form: &BangForm,
    previous: Option<&str>,
) -> Result<CustomBang> {
    let name = form.name.trim();
    if name.is_empty() {
        bail!("name cannot be empty");
    }
    if form.url.trim().is_empty() {
        bail!("URL cannot be empty");
    }
    let url = validate_url(&form.url)?;
    let symbol = current_symbol(prefs)?;
    let bang = normalize_bang(&form.bang, &symbol).to_lowercase();
    if bang.is_empty() {
        bail!("bang cannot be empty");
    }
    if bang.chars().any(char::is_whitespace) {
        bail!("bang cannot contain spaces");
    }

    let key = bang_key(&bang);
    let previous_key = previous.map(|p| bang_key(normalize_bang(p, &symbol)));
    let renamed = previous_key.as_deref() != Some(key.as_str());
    if renamed && prefs.get(&key)?.is_some() {
        bail!("bang already exists");
    }

    let existing = list_custom_bangs(prefs)?;
    let order = match previous_key
        .as_deref()
        .and_then(|k| existing.iter().find(|b| bang_key(&b.bang) == k))
    {
        Some(old) => old.order,
        None => existing.iter().map(|b| b.order.saturating_add(1)).max().unwrap_or(0),
    };

    if renamed {
        if let Some(old_key) = &previous_key {
            prefs.remove(old_key)?;
        }
    }

    let custom = CustomBang {
        name: name.to_string(),
        url,
        bang,
        url_encode_query: form.url_encode_query,
        open_base_url: Some(form.open_base_url),
        order,
    };
    prefs.set(PrefMap::from([(key, serde_json::to_value(&custom)?)]))?;
    tracing::info!(bang = %custom.bang, "saved custom bang");
    Ok(custom)
}

/// Remove a custom bang. Returns `false` when it did not exist.
pub fn remove_custom_bang(prefs: &dyn PreferenceStore, bang: &str) -> Result<bool> {
    let symbol = current_symbol(prefs)?;
    let key = bang_key(normalize_bang(bang, &symbol));
    if prefs.get(&key)?.is_none() {
        return Ok(false);
    }
    prefs.remove(&key)?;
    Ok(true)
}

/// All stored custom bangs in display order. Unreadable entries are skipped.
pub fn list_custom_bangs(prefs: &dyn PreferenceStore) -> Result<Vec<CustomBang>> {
    let mut bangs: Vec<CustomBang> = prefs
        .get_all()?
        .iter()
        .filter(|(key, _)| matches!(classify_key(key), PrefKey::Bang(_)))
        .filter_map(|(key, value)| {
            let bang = CustomBang::from_value(value);
            if bang.is_none() {
                tracing::warn!(%key, "ignoring unreadable custom bang");
            }
            bang
        })
        .collect();
    bangs.sort_by_key(|b| b.order);
    Ok(bangs)
}

/// Store a new bang symbol.
pub fn set_bang_symbol(prefs: &dyn PreferenceStore, symbol: &str) -> Result<()> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        bail!("bang symbol cannot be empty");
    }
    if symbol.chars().any(char::is_whitespace) {
        bail!("bang symbol cannot contain spaces");
    }
    prefs.set(PrefMap::from([(
        BANG_SYMBOL_KEY.to_string(),
        Value::String(symbol.to_string()),
    )]))
}
