//! Error types for the event bus.

use crate::event::EventKind;
use thiserror::Error;

/// A failure isolated while delivering an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The handler returned an error.
    #[error("handler {subscription} failed on {kind}: {message}")]
    HandlerFailed {
        /// Subscription that failed.
        subscription: u64,
        /// Event being delivered.
        kind: EventKind,
        /// Error message reported by the handler.
        message: String,
    },

    /// The handler panicked.
    #[error("handler {subscription} panicked on {kind}: {message}")]
    HandlerPanicked {
        /// Subscription that panicked.
        subscription: u64,
        /// Event being delivered.
        kind: EventKind,
        /// Panic payload, if it was a string.
        message: String,
    },
}
