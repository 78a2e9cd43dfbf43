//! Authentication session management for the RepMarket shell.
//!
//! This crate provides:
//! - **Session manager**: the only component that transitions the session
//!   between anonymous and authenticated
//! - **User directory**: fixture accounts, with two built-in demo accounts as
//!   a fallback, plus accounts registered in this browser profile
//! - **Expiry timer**: a single-shot timer per tab that logs the user out when
//!   the session expires
//!
//! # Example
//!
//! ```
//! use repmarket_auth::{SessionManager, UserDirectory};
//! use repmarket_events::EventBus;
//! use repmarket_store::{MemoryStorage, Store, TabId};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = Arc::new(Store::open(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(EventBus::new()),
//!     TabId::generate(),
//! ));
//! let auth = SessionManager::new(store, UserDirectory::demo(), Duration::from_secs(3600));
//!
//! let user = auth.login(" REP@example.test ", "rep123").unwrap();
//! assert_eq!(user.email(), "rep@example.test");
//! assert!(auth.is_authenticated());
//!
//! auth.logout();
//! assert!(!auth.is_authenticated());
//! ```

mod directory;
mod error;
mod manager;
mod timer;
mod token;

pub use directory::{RegistrationProfile, UserDirectory, UserRecord};
pub use error::{AuthError, Result};
pub use manager::{SessionManager, SESSION_EXPIRED_MESSAGE};
pub use timer::ExpiryTimer;
pub use token::{generate_token, password_digest};
