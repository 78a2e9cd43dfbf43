//! Per-route options.

use repmarket_types::Role;

/// Access rules and metadata declared when a route is registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// A logged-in session is required.
    pub requires_auth: bool,
    /// If non-empty, the user's role must be one of these. Implies
    /// `requires_auth`.
    pub roles: Vec<Role>,
    /// Page title, shown as `"<title> | RepMarket"`.
    pub title: Option<String>,
}

impl RouteOptions {
    /// Anyone may view the route.
    pub fn public() -> Self {
        Self::default()
    }

    /// Any logged-in user may view the route.
    pub fn authenticated() -> Self {
        Self {
            requires_auth: true,
            ..Self::default()
        }
    }

    /// Only users with one of `roles` may view the route.
    pub fn for_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            requires_auth: true,
            roles: roles.into_iter().collect(),
            title: None,
        }
    }

    /// Set the page title.
    #[must_use]
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// True if the route is guarded at all.
    pub fn is_guarded(&self) -> bool {
        self.requires_auth || !self.roles.is_empty()
    }
}
