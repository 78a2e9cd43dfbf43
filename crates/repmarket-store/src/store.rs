//! Application state store.

use crate::backend::{StorageBackend, StorageEvent, TabId};
use crate::error::{Result, StoreError};
use parking_lot::RwLock;
use repmarket_events::{EventBus, ShellEvent};
use repmarket_types::Session;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage key under which the whole state blob is persisted.
pub const STATE_KEY: &str = "repmarket:state";

/// Well-known slot names.
pub mod slots {
    /// Authentication session. Written only by the auth session manager.
    pub const AUTH: &str = "auth";
    /// Accounts registered in this browser profile.
    pub const USERS: &str = "users";
    /// Cached opportunity listings.
    pub const OPPORTUNITIES: &str = "opportunities";
    /// Cached contracts.
    pub const CONTRACTS: &str = "contracts";
    /// Cached message threads.
    pub const MESSAGES: &str = "messages";
}

/// The shell's single source of truth for application state.
#[derive(Debug)]
pub struct Store {
    tab: TabId,
    backend: Arc<dyn StorageBackend>,
    bus: Arc<EventBus>,
    state: RwLock<Map<String, Value>>,
}

impl Store {
    /// Open a store for tab `tab`, hydrating from `backend`.
    ///
    /// Missing or malformed persisted state falls back to defaults.
    pub fn open(backend: Arc<dyn StorageBackend>, bus: Arc<EventBus>, tab: TabId) -> Self {
        let state = Self::load_state(backend.as_ref());
        info!(tab = %tab, slots = state.len(), "Store hydrated");
        Self {
            tab,
            backend,
            bus,
            state: RwLock::new(state),
        }
    }

    fn load_state(backend: &dyn StorageBackend) -> Map<String, Value> {
        let raw = match backend.read(STATE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Map::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted state, using defaults");
                return Map::new();
            }
        };

        let mut state = match serde_json::from_str::<Map<String, Value>>(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Persisted state is corrupt, using defaults");
                return Map::new();
            }
        };

        if let Some(auth) = state.get(slots::AUTH) {
            if let Err(e) = serde_json::from_value::<Session>(auth.clone()) {
                warn!(error = %e, "Persisted session is corrupt, discarding it");
                state.remove(slots::AUTH);
            }
        }

        state
    }

    /// Tab this store belongs to.
    pub fn tab(&self) -> &TabId {
        &self.tab
    }

    /// Event bus this store publishes on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Current value of `slot`.
    ///
    /// Absent slots read as JSON `null`, except `auth`, which reads as the
    /// anonymous session.
    pub fn get(&self, slot: &str) -> Value {
        if slot == slots::AUTH {
            return serde_json::to_value(self.session()).unwrap_or(Value::Null);
        }
        self.state.read().get(slot).cloned().unwrap_or(Value::Null)
    }

    /// Current session. Anonymous if none is stored.
    pub fn session(&self) -> Session {
        self.state
            .read()
            .get(slots::AUTH)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Names of the slots currently holding a value.
    pub fn slots(&self) -> Vec<String> {
        self.state.read().keys().cloned().collect()
    }

    /// Replace `slot` and persist the entire state.
    ///
    /// Writing `auth` requires a valid session value and publishes
    /// [`ShellEvent::AuthChanged`]. A backend failure is returned after the
    /// in-memory state (and the notification) have been updated.
    pub fn set(&self, slot: &str, value: Value) -> Result<()> {
        let session = if slot == slots::AUTH {
            Some(serde_json::from_value::<Session>(value.clone())?)
        } else {
            None
        };

        let persisted = {
            let mut state = self.state.write();
            state.insert(slot.to_string(), value);
            self.persist(&state)
        };
        debug!(tab = %self.tab, slot = %slot, "Slot written");

        if let Some(session) = session {
            self.bus.emit(ShellEvent::AuthChanged { session });
        }

        persisted
    }

    /// Replace the session.
    pub fn set_session(&self, session: &Session) -> Result<()> {
        self.set(slots::AUTH, serde_json::to_value(session)?)
    }

    /// Reset the session to anonymous.
    pub fn clear_auth(&self) -> Result<()> {
        self.set_session(&Session::anonymous())
    }

    fn persist(&self, state: &Map<String, Value>) -> Result<()> {
        let blob = serde_json::to_string(state)?;
        self.backend.write(STATE_KEY, &blob, &self.tab).map_err(|e| {
            warn!(tab = %self.tab, error = %e, "Failed to persist state");
            e
        })
    }

    /// True if `event` is a change to this store's state made by another tab.
    pub fn concerns(&self, event: &StorageEvent) -> bool {
        event.key == STATE_KEY && event.origin != self.tab
    }

    /// Re-read the persisted state, replacing the in-memory copy.
    ///
    /// Publishes [`ShellEvent::AuthChanged`] if the session differs from the
    /// one held before.
    pub fn reload(&self) -> ReloadOutcome {
        let previous = self.session();
        let fresh = Self::load_state(self.backend.as_ref());
        *self.state.write() = fresh;
        let current = self.session();

        let auth_changed = previous != current;
        if auth_changed {
            info!(
                tab = %self.tab,
                authenticated = current.is_authenticated(),
                "Session changed in another tab"
            );
            self.bus.emit(ShellEvent::AuthChanged {
                session: current.clone(),
            });
        }

        ReloadOutcome {
            previous,
            current,
            auth_changed,
        }
    }

    /// Handle for feature code: reads every slot, writes all but `auth`.
    pub fn cache(self: &Arc<Self>) -> CacheSlots {
        CacheSlots {
            store: Arc::clone(self),
        }
    }
}

/// Result of [`Store::reload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadOutcome {
    /// Session before the reload.
    pub previous: Session,
    /// Session after the reload.
    pub current: Session,
    /// Whether the two differ.
    pub auth_changed: bool,
}

impl ReloadOutcome {
    /// True if another tab logged this tab's user out.
    pub fn session_removed(&self) -> bool {
        self.previous.is_authenticated() && !self.current.is_authenticated()
    }
}

/// Store access for feature modules.
#[derive(Debug, Clone)]
pub struct CacheSlots {
    store: Arc<Store>,
}

impl CacheSlots {
    /// Current value of `slot`.
    pub fn get(&self, slot: &str) -> Value {
        self.store.get(slot)
    }

    /// Current session, read-only.
    pub fn session(&self) -> Session {
        self.store.session()
    }

    /// Replace a cache slot. `auth` is refused.
    pub fn set(&self, slot: &str, value: Value) -> Result<()> {
        if slot == slots::AUTH {
            return Err(StoreError::ReservedSlot(slot.to_string()));
        }
        self.store.set(slot, value)
    }
}
