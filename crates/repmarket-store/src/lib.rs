//! # RepMarket Store
//!
//! Single source of truth for the shell's application state, mirrored in a
//! durable [`StorageBackend`] the way the browser app mirrors it in
//! `localStorage`.
//!
//! The state is a mapping of named slots to JSON values. Only the `auth` slot
//! has behavioral contracts: it always decodes to a valid [`Session`], and
//! writing it publishes [`ShellEvent::AuthChanged`] on the event bus.
//!
//! ## Backends
//!
//! - [`MemoryStorage`]: shared in-process storage. Clones share the same data,
//!   so several [`Store`]s over one `MemoryStorage` behave like several tabs of
//!   one origin and see each other's writes as [`StorageEvent`]s.
//! - [`FileStorage`]: a JSON file, for state that survives process restarts.
//!
//! ## Example
//!
//! ```rust
//! use repmarket_events::EventBus;
//! use repmarket_store::{slots, MemoryStorage, Store, TabId};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let store = Store::open(storage, Arc::new(EventBus::new()), TabId::generate());
//!
//! assert!(!store.session().is_authenticated());
//! store.set(slots::OPPORTUNITIES, serde_json::json!([{"id": 1}])).unwrap();
//! assert_eq!(store.get(slots::OPPORTUNITIES)[0]["id"], 1);
//! ```
//!
//! [`Session`]: repmarket_types::Session
//! [`ShellEvent::AuthChanged`]: repmarket_events::ShellEvent::AuthChanged

pub mod backend;
pub mod error;
pub mod file;
pub mod memory;
pub mod store;

pub use backend::{StorageBackend, StorageEvent, TabId};
pub use error::{Result, StoreError};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use store::{slots, CacheSlots, ReloadOutcome, Store, STATE_KEY};
