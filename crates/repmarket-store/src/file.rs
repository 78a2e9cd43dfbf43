//! JSON-file storage that survives process restarts.

use crate::backend::{StorageBackend, StorageEvent, TabId};
use crate::error::{Result, StoreError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Key/value storage persisted as a single pretty-printed JSON object.
///
/// Not shared between processes: [`StorageBackend::watch`] returns `None`.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Storage backed by the file at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Default location under the user's data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("repmarket").join("storage.json"))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> BTreeMap<String, String> {
        if !self.path.exists() {
            debug!(path = ?self.path, "Storage file not found, starting empty");
            return BTreeMap::new();
        }

        match fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(items) => items,
                Err(e) => {
                    warn!(path = ?self.path, error = %e, "Failed to parse storage file, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to read storage file, starting empty");
                BTreeMap::new()
            }
        }
    }

    fn save(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, contents).map_err(|e| {
            StoreError::Backend(format!("failed to write {}: {e}", self.path.display()))
        })?;
        debug!(path = ?self.path, keys = items.len(), "Saved storage file");
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.load().remove(key))
    }

    fn write(&self, key: &str, value: &str, _origin: &TabId) -> Result<()> {
        let _guard = self.lock.lock();
        let mut items = self.load();
        items.insert(key.to_string(), value.to_string());
        self.save(&items)
    }

    fn remove(&self, key: &str, _origin: &TabId) -> Result<()> {
        let _guard = self.lock.lock();
        let mut items = self.load();
        if items.remove(key).is_some() {
            self.save(&items)?;
        }
        Ok(())
    }

    fn watch(&self) -> Option<broadcast::Receiver<StorageEvent>> {
        None
    }
}
