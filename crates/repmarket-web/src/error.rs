//! Error types for rendering.

use thiserror::Error;

/// Rendering and link-building errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebError {
    /// Template rendering error.
    #[error("template error: {0}")]
    Template(String),

    /// A location or site-root override is not a usable URL.
    #[error("invalid URL '{input}': {reason}")]
    InvalidUrl {
        /// The rejected text.
        input: String,
        /// Parser error.
        reason: String,
    },
}

impl From<askama::Error> for WebError {
    fn from(err: askama::Error) -> Self {
        WebError::Template(err.to_string())
    }
}

/// Result type for rendering.
pub type Result<T> = std::result::Result<T, WebError>;
