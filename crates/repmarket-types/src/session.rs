//! Authentication session record.
//!
//! A [`Session`] is either anonymous or fully authenticated; the partially
//! populated states a loosely typed record allows (a token without a user, a
//! user with `isAuthenticated: false`, ...) cannot be constructed and are
//! rejected when decoding.

use crate::error::TypesError;
use crate::timestamp::Timestamp;
use crate::user::{Role, User};
use serde::{Deserialize, Serialize};

/// The authenticated half of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Active {
    user: User,
    token: String,
    expires_at: Option<Timestamp>,
}

/// Whether a user is logged in, and as whom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SessionRecord", into = "SessionRecord")]
pub struct Session {
    active: Option<Active>,
}

impl Session {
    /// The logged-out session.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { active: None }
    }

    /// An authenticated session for `user`, identified by an opaque `token`.
    pub fn authenticated(
        user: User,
        token: impl Into<String>,
        expires_at: Option<Timestamp>,
    ) -> Self {
        Self {
            active: Some(Active {
                user,
                token: token.into(),
                expires_at,
            }),
        }
    }

    /// Whether a user is logged in. Expiry is not considered; see [`Session::is_active_at`].
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.active.is_some()
    }

    /// The logged-in user.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.active.as_ref().map(|a| &a.user)
    }

    /// The opaque session token.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.token.as_str())
    }

    /// When the session expires, if it expires at all.
    #[must_use]
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.active.as_ref().and_then(|a| a.expires_at)
    }

    /// Role of the logged-in user.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user().map(User::role)
    }

    /// True if the session is authenticated but its expiry time has been reached.
    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at().is_some_and(|exp| now >= exp)
    }

    /// True if the session is authenticated and not expired at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.is_authenticated() && !self.is_expired_at(now)
    }
}

/// Wire form of a [`Session`] as it appears in local storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Whether the record claims to be logged in.
    #[serde(default)]
    pub is_authenticated: bool,
    /// Logged-in user.
    #[serde(default)]
    pub user: Option<User>,
    /// Opaque token.
    #[serde(default)]
    pub token: Option<String>,
    /// Expiry time in Unix milliseconds.
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

impl From<Session> for SessionRecord {
    fn from(session: Session) -> Self {
        match session.active {
            Some(active) => Self {
                is_authenticated: true,
                user: Some(active.user),
                token: Some(active.token),
                expires_at: active.expires_at,
            },
            None => Self::default(),
        }
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = TypesError;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        match (record.is_authenticated, record.user, record.token) {
            (true, Some(user), Some(token)) if !token.is_empty() => {
                Ok(Session::authenticated(user, token, record.expires_at))
            }
            (true, _, _) => Err(TypesError::InvalidSession(
                "authenticated record is missing its user or token".into(),
            )),
            (false, None, None) if record.expires_at.is_none() => Ok(Session::anonymous()),
            (false, _, _) => Err(TypesError::InvalidSession(
                "anonymous record carries session fields".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn rep() -> User {
        User::new("1", "Riley Rep", "rep@example.test", Role::Rep)
    }

    #[test]
    fn test_anonymous_default() {
        let session = Session::default();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert!(session.token().is_none());
        assert!(session.expires_at().is_none());
    }

    #[test]
    fn test_anonymous_wire_format() {
        let json = serde_json::to_value(Session::anonymous()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "isAuthenticated": false,
                "user": null,
                "token": null,
                "expiresAt": null
            })
        );
    }

    #[test]
    fn test_authenticated_round_trip() {
        let session = Session::authenticated(rep(), "tok", Some(Timestamp::from_millis(5)));
        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
        assert_eq!(restored.role(), Some(Role::Rep));
    }

    #[test]
    fn test_partial_records_rejected() {
        let token_only = r#"{"isAuthenticated": true, "token": "abc"}"#;
        assert!(serde_json::from_str::<Session>(token_only).is_err());

        let stale_user = r#"{"isAuthenticated": false,
            "user": {"id": 1, "name": "R", "email": "r@example.test", "role": "rep"}}"#;
        assert!(serde_json::from_str::<Session>(stale_user).is_err());

        let empty_token = r#"{"isAuthenticated": true, "token": "",
            "user": {"id": 1, "name": "R", "email": "r@example.test", "role": "rep"}}"#;
        assert!(serde_json::from_str::<Session>(empty_token).is_err());
    }

    #[test]
    fn test_expiry() {
        let session = Session::authenticated(rep(), "tok", Some(Timestamp::from_millis(100)));
        assert!(session.is_active_at(Timestamp::from_millis(99)));
        assert!(session.is_expired_at(Timestamp::from_millis(100)));
        assert!(!session.is_active_at(Timestamp::from_millis(100)));

        let forever = Session::authenticated(rep(), "tok", None);
        assert!(forever.is_active_at(Timestamp::from_millis(i64::MAX)));
        assert!(!Session::anonymous().is_expired_at(Timestamp::from_millis(0)));
    }

    fn arb_user() -> impl Strategy<Value = Option<User>> {
        proptest::option::of(("[a-z0-9]{1,6}", prop::bool::ANY).prop_map(|(id, business)| {
            let role = if business { Role::Business } else { Role::Rep };
            User::new(id.clone(), "Name", &format!("{id}@example.test"), role)
        }))
    }

    proptest! {
        #[test]
        fn decoded_sessions_are_never_partial(
            is_authenticated in prop::bool::ANY,
            user in arb_user(),
            token in proptest::option::of("[a-z]{0,4}"),
            expires_at in proptest::option::of(0i64..1_000),
        ) {
            let record = SessionRecord {
                is_authenticated,
                user,
                token,
                expires_at: expires_at.map(Timestamp::from_millis),
            };
            let json = serde_json::to_string(&record).unwrap();
            if let Ok(session) = serde_json::from_str::<Session>(&json) {
                prop_assert_eq!(
                    session.is_authenticated(),
                    session.user().is_some() && session.token().is_some()
                );
                if !session.is_authenticated() {
                    prop_assert!(session.expires_at().is_none());
                }
            }
        }
    }
}
