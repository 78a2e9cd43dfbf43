//! Shell event types.

use repmarket_types::{Session, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An event published on the shell's [`EventBus`](crate::EventBus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShellEvent {
    /// The `auth` slot was written. Carries the new session.
    AuthChanged {
        /// Session now stored in the `auth` slot.
        session: Session,
    },
    /// A guarded navigation completed and its handler ran.
    RouteChanged {
        /// Path that was rendered.
        path: String,
    },
    /// The session expiry timer fired and the user was logged out.
    SessionExpired {
        /// User whose session expired.
        user_id: Option<UserId>,
    },
    /// A user-visible notice (toast) to display.
    Notice {
        /// Severity of the notice.
        level: NoticeLevel,
        /// Text shown to the user.
        message: String,
    },
}

impl ShellEvent {
    /// The kind of this event, used for subscription matching.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            ShellEvent::AuthChanged { .. } => EventKind::AuthChanged,
            ShellEvent::RouteChanged { .. } => EventKind::RouteChanged,
            ShellEvent::SessionExpired { .. } => EventKind::SessionExpired,
            ShellEvent::Notice { .. } => EventKind::Notice,
        }
    }
}

/// Event discriminant used when subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// See [`ShellEvent::AuthChanged`].
    AuthChanged,
    /// See [`ShellEvent::RouteChanged`].
    RouteChanged,
    /// See [`ShellEvent::SessionExpired`].
    SessionExpired,
    /// See [`ShellEvent::Notice`].
    Notice,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::AuthChanged => write!(f, "auth.changed"),
            EventKind::RouteChanged => write!(f, "route.changed"),
            EventKind::SessionExpired => write!(f, "session.expired"),
            EventKind::Notice => write!(f, "notice"),
        }
    }
}

/// Severity of a [`ShellEvent::Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something the user should act on.
    Warning,
    /// An operation failed.
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_kind() {
        let event = ShellEvent::RouteChanged { path: "/".into() };
        assert_eq!(event.kind(), EventKind::RouteChanged);
        assert_eq!(EventKind::AuthChanged.to_string(), "auth.changed");
        assert_eq!(EventKind::SessionExpired.to_string(), "session.expired");
    }

    #[test]
    fn test_event_serialization() {
        let event = ShellEvent::Notice {
            level: NoticeLevel::Warning,
            message: "Your session has expired.".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"notice\""));
        assert!(json.contains("\"level\":\"warning\""));

        let parsed: ShellEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
