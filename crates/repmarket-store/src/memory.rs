//! Shared in-process storage.

use crate::backend::{StorageBackend, StorageEvent, TabId};
use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the storage event channel.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug)]
struct Inner {
    items: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

/// In-memory storage shared by every clone.
///
/// Each mutation is broadcast as a [`StorageEvent`], so stores opened over
/// clones of the same `MemoryStorage` behave like tabs of one origin.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Arc<Inner>,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                items: RwLock::new(HashMap::new()),
                events,
            }),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.items.read().len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.items.read().is_empty()
    }

    fn publish(&self, key: &str, old_value: Option<String>, new_value: Option<String>, origin: &TabId) {
        let event = StorageEvent {
            key: key.to_string(),
            old_value,
            new_value,
            origin: origin.clone(),
        };
        // No listeners is fine.
        let receivers = self.inner.events.send(event).unwrap_or(0);
        debug!(key = %key, origin = %origin, receivers, "Storage changed");
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.items.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str, origin: &TabId) -> Result<()> {
        let old = self
            .inner
            .items
            .write()
            .insert(key.to_string(), value.to_string());
        if old.as_deref() != Some(value) {
            self.publish(key, old, Some(value.to_string()), origin);
        }
        Ok(())
    }

    fn remove(&self, key: &str, origin: &TabId) -> Result<()> {
        let old = self.inner.items.write().remove(key);
        if old.is_some() {
            self.publish(key, old, None, origin);
        }
        Ok(())
    }

    fn watch(&self) -> Option<broadcast::Receiver<StorageEvent>> {
        Some(self.inner.events.subscribe())
    }
}
