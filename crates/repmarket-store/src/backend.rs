//! Storage backend abstraction.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Identifies one tab (one running shell) sharing a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(String);

impl TabId {
    /// Generates a fresh random tab id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Creates a tab id from a known value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A change made to shared storage, delivered to every other tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    /// Key that changed.
    pub key: String,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change; `None` when the key was removed.
    pub new_value: Option<String>,
    /// Tab that made the change.
    pub origin: TabId,
}

/// Durable key/value storage, the equivalent of a browser's `localStorage`.
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Read the value stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key` on behalf of tab `origin`.
    fn write(&self, key: &str, value: &str, origin: &TabId) -> Result<()>;

    /// Remove `key` on behalf of tab `origin`.
    fn remove(&self, key: &str, origin: &TabId) -> Result<()>;

    /// Subscribe to changes made by any tab. `None` if the backend is not
    /// shared between tabs.
    fn watch(&self) -> Option<broadcast::Receiver<StorageEvent>>;
}
