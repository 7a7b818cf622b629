use super::{bang_key, classify_key, PrefKey, PrefMap, PreferenceStore, BANG_SYMBOL_KEY};
use anyhow::{Context, Result};
use serde_json::Value;

/// Attempts made for a preference write, the first try included.
pub const MAX_WRITE_ATTEMPTS: u32 = 2;

/// Result of a preference write that may be retried once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing needed writing.
    Skipped,
    /// Written after `attempts` tries.
    Written { attempts: u32 },
}

/// Run `write`, retrying exactly once on failure.
pub fn write_with_retry(mut write: impl FnMut() -> Result<()>) -> Result<WriteOutcome> {
    let mut attempt = 1;
    loop {
        match write() {
            Ok(()) => return Ok(WriteOutcome::Written { attempts: attempt }),
            Err(err) if attempt < MAX_WRITE_ATTEMPTS => {
                tracing::warn!("preference write failed ({err:#}); retrying");
                attempt += 1;
            }
            Err(err) => return Err(err).context("preference write failed after retry"),
        }
    }
}

fn order_of(value: &Value) -> u64 {
    value.get("order").and_then(Value::as_u64).unwrap_or(u64::MAX)
}

/// Rewrite `items` into the current layout: legacy keys become `bang_<token>`,
/// bang `order` values become contiguous in their existing order, and the
/// symbol key is always present.
pub fn migrate_items(items: PrefMap) -> PrefMap {
    let mut entries: Vec<(String, Value)> = items.into_iter().collect();
    entries.sort_by_key(|(_, value)| order_of(value));

    let mut migrated = PrefMap::new();
    let mut next_order = 0u64;
    for (key, mut value) in entries {
        let key = match classify_key(&key) {
            PrefKey::BangSymbol | PrefKey::SearchEngine(_) => {
                migrated.insert(key, value);
                continue;
            }
            PrefKey::Bang(_) => key,
            PrefKey::Legacy(_) => match value.get("bang").and_then(Value::as_str) {
                Some(bang) if !bang.trim().is_empty() => bang_key(bang),
                _ => {
                    tracing::warn!(%key, "dropping legacy preference without a bang");
                    continue;
                }
            },
        };
        if let Some(obj) = value.as_object_mut() {
            obj.insert("order".into(), Value::from(next_order));
            next_order += 1;
        }
        migrated.insert(key, value);
    }
    migrated
        .entry(BANG_SYMBOL_KEY.to_string())
        .or_insert_with(|| Value::String(crate::DEFAULT_BANG_SYMBOL.to_string()));
    migrated
}

/// Migrate stored preferences to the current layout.
///
/// The store is cleared and rewritten; the rewrite is retried once.
pub fn migrate_schema(prefs: &dyn PreferenceStore) -> Result<WriteOutcome> {
    let items = prefs.get_all().context("read preferences for migration")?;
    if items.is_empty() {
        return Ok(WriteOutcome::Skipped);
    }
    let migrated = migrate_items(items);
    prefs.clear().context("clear preferences for migration")?;
    let outcome = write_with_retry(|| prefs.set(migrated.clone()))?;
    tracing::info!(keys = migrated.len(), ?outcome, "migrated preferences");
    Ok(outcome)
}
