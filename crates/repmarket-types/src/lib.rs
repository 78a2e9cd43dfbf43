//! # RepMarket Types
//!
//! Domain types shared by every crate of the RepMarket client shell.
//!
//! ## Features
//!
//! - [`User`] and [`Role`]: marketplace accounts, either a sales rep or a business
//! - [`Session`]: the authentication record persisted in the `auth` slot
//! - [`Timestamp`]: millisecond Unix timestamps used for expiry
//!
//! ## Example
//!
//! ```rust
//! use repmarket_types::{Role, Session, Timestamp, User};
//!
//! let user = User::new("1", "Riley Rep", " Rep@Example.Test ", Role::Rep);
//! assert_eq!(user.email(), "rep@example.test");
//!
//! let session = Session::authenticated(user, "tok_123", Some(Timestamp::now()));
//! assert!(session.is_authenticated());
//! assert_eq!(session.role(), Some(Role::Rep));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod session;
pub mod timestamp;
pub mod user;

pub use error::{Result, TypesError};
pub use session::{Session, SessionRecord};
pub use timestamp::Timestamp;
pub use user::{normalize_email, Profile, Role, User, UserId};
