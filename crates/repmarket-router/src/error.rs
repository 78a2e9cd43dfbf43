//! Error types for the router.

use thiserror::Error;

/// Errors raised while registering or dispatching routes.
///
/// Dispatch errors never escape [`Router::navigate`](crate::Router::navigate);
/// they are rendered with the error view and reported on the
/// [`Navigation`](crate::Navigation).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// No registered route matches the path.
    #[error("no route matches '{0}'")]
    RouteNotFound(String),

    /// A route pattern could not be parsed.
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Guards kept redirecting.
    #[error("too many redirects while navigating to '{path}' (limit {limit})")]
    RedirectLimit {
        /// Path first requested.
        path: String,
        /// The redirect limit.
        limit: usize,
    },

    /// A route handler returned an error or panicked.
    #[error("route handler for '{path}' failed: {message}")]
    Handler {
        /// Path being rendered.
        path: String,
        /// Error or panic message.
        message: String,
    },
}

impl RouterError {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
