use crate::settings::Settings;
use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

/// One bang as published by the remote catalogs. Both the Kagi and the
/// DuckDuckGo lists carry more fields (`s`, `d`, `c`, ...) which are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteBang {
    #[serde(default)]
    pub t: Option<String>,
    #[serde(default)]
    pub u: Option<String>,
}

/// Where the default catalog is fetched from.
#[derive(Debug, Clone)]
pub struct CatalogSources {
    pub primary: String,
    pub fallback: String,
    pub timeout: Duration,
}

impl CatalogSources {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            primary: settings.primary_catalog_url.clone(),
            fallback: settings.fallback_catalog_url.clone(),
            timeout: settings.catalog_timeout(),
        }
    }
}

/// Fetch and parse a single bang list.
pub fn fetch_bangs(client: &Client, url: &str) -> Result<Vec<RemoteBang>> {
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("request bang list from {url}"))?;
    if !resp.status().is_success() {
        bail!("http status {} from {url}", resp.status());
    }
    let body = resp.text().context("read bang list")?;
    let list: Vec<RemoteBang> = serde_json::from_str(&body).context("parse bang list")?;
    Ok(list)
}

/// Fetch the default bang list, trying the fallback source once when the
/// primary fails. Returns an empty list when both fail.
pub fn fetch_default_bangs(sources: &CatalogSources) -> Vec<RemoteBang> {
    let client = match Client::builder()
        .timeout(sources.timeout)
        .user_agent("bang_redirect catalog")
        .build()
    {
        Ok(c) => c,
        Err(err) => {
            tracing::error!("failed to build http client: {err}");
            return Vec::new();
        }
    };

    match fetch_bangs(&client, &sources.primary) {
        Ok(list) => {
            tracing::debug!(count = list.len(), url = %sources.primary, "fetched bangs");
            list
        }
        Err(err) => {
            tracing::warn!(
                "error fetching bangs ({err:#}); falling back to {}",
                sources.fallback
            );
            match fetch_bangs(&client, &sources.fallback) {
                Ok(list) => {
                    tracing::debug!(count = list.len(), url = %sources.fallback, "fetched bangs");
                    list
                }
                Err(err) => {
                    tracing::error!("error fetching fallback bangs ({err:#}); starting empty");
                    Vec::new()
                }
            }
        }
    }
}
