//! Route guards: decide whether the current session may view a route.

use crate::options::RouteOptions;
use repmarket_store::Store;
use repmarket_types::{Session, Timestamp};
use std::fmt;
use std::sync::Arc;

/// Path of the login view.
pub const LOGIN_PATH: &str = "/login";

/// Query parameter carrying the originally requested path.
pub const REDIRECT_PARAM: &str = "redirect";

/// Why a guard redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectReason {
    /// Nobody is logged in, or the session expired.
    Unauthenticated,
    /// The user's role may not view the route.
    WrongRole,
}

impl fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectReason::Unauthenticated => write!(f, "unauthenticated"),
            RedirectReason::WrongRole => write!(f, "wrong role"),
        }
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the route.
    Allow,
    /// Go to `to` instead.
    Redirect {
        /// Redirect target.
        to: String,
        /// Why.
        reason: RedirectReason,
    },
}

impl GuardDecision {
    /// Decide for `session` at time `now`.
    ///
    /// Unauthenticated requests go to the login view carrying the requested
    /// path. A role mismatch goes to the user's own landing page, which that
    /// role can always view.
    pub fn decide(
        session: &Session,
        now: Timestamp,
        options: &RouteOptions,
        requested: &str,
    ) -> Self {
        if !options.is_guarded() {
            return GuardDecision::Allow;
        }

        let Some(role) = session.role().filter(|_| session.is_active_at(now)) else {
            return GuardDecision::Redirect {
                to: login_redirect(requested),
                reason: RedirectReason::Unauthenticated,
            };
        };

        if !options.roles.is_empty() && !options.roles.contains(&role) {
            return GuardDecision::Redirect {
                to: role.landing_path().to_string(),
                reason: RedirectReason::WrongRole,
            };
        }

        GuardDecision::Allow
    }

    /// True for [`GuardDecision::Allow`].
    pub fn is_allow(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Login path that returns to `requested` afterwards.
pub fn login_redirect(requested: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(requested.as_bytes()).collect();
    format!("{LOGIN_PATH}?{REDIRECT_PARAM}={encoded}")
}

/// Reads the session from the store and applies [`GuardDecision::decide`].
#[derive(Debug, Clone)]
pub struct RouteGuard {
    store: Arc<Store>,
}

impl RouteGuard {
    /// Create a guard over `store`.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Check `options` for the current session.
    pub fn check(&self, options: &RouteOptions, requested: &str) -> GuardDecision {
        GuardDecision::decide(&self.store.session(), Timestamp::now(), options, requested)
    }
}
