//! Error types for the auth crate.

use thiserror::Error;

/// Errors returned by authentication operations.
///
/// Each variant maps to the form field it concerns, see [`AuthError::field`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No account is registered under the email.
    #[error("no account found for '{0}'")]
    NoSuchUser(String),

    /// The account exists but the password does not match.
    #[error("incorrect password")]
    IncorrectPassword,

    /// A registration form is incomplete or conflicts with an existing account.
    #[error("invalid registration: {field} {reason}")]
    InvalidRegistration {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The session expired.
    #[error("session expired")]
    SessionExpired,

    /// The fixture file could not be loaded.
    #[error("failed to load fixtures from {path}: {reason}")]
    Fixtures {
        /// Fixture file path.
        path: String,
        /// Underlying error.
        reason: String,
    },
}

impl AuthError {
    /// Create an invalid registration error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRegistration {
            field,
            reason: reason.into(),
        }
    }

    /// Form field the error should be displayed next to.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            AuthError::NoSuchUser(_) => Some("email"),
            AuthError::IncorrectPassword => Some("password"),
            AuthError::InvalidRegistration { field, .. } => Some(*field),
            AuthError::SessionExpired | AuthError::Fixtures { .. } => None,
        }
    }
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
