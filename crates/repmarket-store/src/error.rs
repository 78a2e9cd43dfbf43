//! Error types for the store crate.

use thiserror::Error;

/// Errors that can occur in store operations.
///
/// Corrupt persisted state is not among them: it is recovered by falling
/// back to defaults and only logged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend failed to read or write.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be serialized, or an `auth` value is not a valid session.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The slot may only be written by the auth session manager.
    #[error("slot '{0}' is reserved")]
    ReservedSlot(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
