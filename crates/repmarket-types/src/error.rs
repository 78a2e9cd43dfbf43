//! Error types for domain type validation.

use thiserror::Error;

/// Errors raised while constructing or decoding domain types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// A persisted session record mixes authenticated and anonymous fields.
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// An unknown role name was supplied.
    #[error("invalid role: '{0}' (expected 'rep' or 'business')")]
    InvalidRole(String),
}

/// A specialized Result type for domain type operations.
pub type Result<T> = std::result::Result<T, TypesError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_display() {
        assert_eq!(
            TypesError::InvalidRole("admin".into()).to_string(),
            "invalid role: 'admin' (expected 'rep' or 'business')"
        );
        assert_eq!(
            TypesError::InvalidSession("token without user".into()).to_string(),
            "invalid session: token without user"
        );
    }
}
