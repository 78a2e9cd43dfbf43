//! # RepMarket Shell
//!
//! Bootstraps one tab of the marketplace front end: opens the persistent
//! store, wires the session manager, router and header to a shared event
//! bus, registers the default routes and renders documents.
//!
//! ```rust
//! use repmarket_shell::{Shell, ShellConfig};
//! use repmarket_store::MemoryStorage;
//! use std::sync::Arc;
//!
//! let shell = Shell::open(ShellConfig::default(), Arc::new(MemoryStorage::new())).unwrap();
//! let page = shell.start().unwrap();
//! assert_eq!(page.path(), "/");
//!
//! let page = shell.login("rep@example.test", "rep123", None).unwrap();
//! assert_eq!(page.path(), "/rep/dashboard");
//! assert!(shell.header_html().contains("Logout"));
//! ```

pub mod config;
pub mod error;
pub mod pages;
pub mod shell;

pub use config::{ConfigError, ShellConfig, DEFAULT_LOCATION, DEFAULT_SESSION_TTL_SECS};
pub use error::{Result, ShellError};
pub use shell::{Page, Shell};
