use super::{PrefMap, PreferenceChange, PreferenceStore};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Preference store backed by a single JSON object file.
///
/// Without a path the store lives only in memory, which is what tests and the
/// `--offline` CLI mode use.
pub struct JsonPreferences {
    path: Option<PathBuf>,
    data: Mutex<PrefMap>,
    subscribers: Mutex<Vec<Sender<Vec<PreferenceChange>>>>,
}

fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

/// Missing or empty files read as an empty map.
fn read_prefs(path: &Path) -> Result<PrefMap> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(PrefMap::new()),
        Ok(content) => serde_json::from_str(&content)
            .with_context(|| format!("parse preferences {}", path.display())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(PrefMap::new()),
        Err(err) => Err(err).with_context(|| format!("read preferences {}", path.display())),
    }
}

impl JsonPreferences {
    /// Open the store at `path`. A missing or empty file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = read_prefs(&path)?;
        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(PrefMap::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn persist(&self, data: &PrefMap) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(data)?;
        atomic_write(path, &json).context("atomic write")?;
        Ok(())
    }

    fn notify(&self, changes: Vec<PreferenceChange>) {
        if changes.is_empty() {
            return;
        }
        let Ok(mut subscribers) = self.subscribers.lock() else {
            tracing::error!("preference subscriber list poisoned");
            return;
        };
        subscribers.retain(|tx| tx.send(changes.clone()).is_ok());
    }

    /// Replace the stored map with the result of `edit`, persisting before
    /// the in-memory copy is swapped so a failed write leaves no trace.
    ///
    /// Subscribers are notified before the data lock is released, so batches
    /// arrive in commit order. Lock order is data, then subscribers.
    fn update(&self, edit: impl FnOnce(&mut PrefMap)) -> Result<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| anyhow!("preferences lock poisoned"))?;
        let mut next = data.clone();
        edit(&mut next);
        let changes = diff(&data, &next);
        if changes.is_empty() {
            return Ok(());
        }
        self.persist(&next)?;
        *data = next;
        self.notify(changes);
        Ok(())
    }

    /// Re-read the backing file and broadcast whatever another process
    /// changed in it. In-memory stores have nothing to reload.
    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut data = self
            .data
            .lock()
            .map_err(|_| anyhow!("preferences lock poisoned"))?;
        let on_disk = read_prefs(path)?;
        let changes = diff(&data, &on_disk);
        if changes.is_empty() {
            return Ok(());
        }
        tracing::debug!(changed = changes.len(), "preferences changed on disk");
        *data = on_disk;
        self.notify(changes);
        Ok(())
    }
}

fn diff(old: &PrefMap, new: &PrefMap) -> Vec<PreferenceChange> {
    let mut changes = Vec::new();
    for (key, value) in new {
        let previous = old.get(key);
        if previous != Some(value) {
            changes.push(PreferenceChange {
                key: key.clone(),
                old_value: previous.cloned(),
                new_value: Some(value.clone()),
            });
        }
    }
    for (key, value) in old {
        if !new.contains_key(key) {
            changes.push(PreferenceChange {
                key: key.clone(),
                old_value: Some(value.clone()),
                new_value: None,
            });
        }
    }
    changes
}

impl PreferenceStore for JsonPreferences {
    fn get_all(&self) -> Result<PrefMap> {
        let data = self
            .data
            .lock()
            .map_err(|_| anyhow!("preferences lock poisoned"))?;
        Ok(data.clone())
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        let data = self
            .data
            .lock()
            .map_err(|_| anyhow!("preferences lock poisoned"))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, items: PrefMap) -> Result<()> {
        self.update(|data| data.extend(items))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|data| {
            data.remove(key);
        })
    }

    fn clear(&self) -> Result<()> {
        self.update(PrefMap::clear)
    }

    fn subscribe(&self) -> Receiver<Vec<PreferenceChange>> {
        let (tx, rx) = mpsc::channel();
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(tx),
            Err(_) => tracing::error!("preference subscriber list poisoned"),
        }
        rx
    }
}
