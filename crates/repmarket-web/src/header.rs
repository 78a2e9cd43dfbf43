//! Header renderer: the navigation chrome as a pure function of the session.

use crate::error::Result;
use crate::site::SiteRoot;
use askama::Template;
use repmarket_types::{Role, Session};

/// Header link to the home page.
const HOME: &str = "/";

/// A header navigation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    /// Link text.
    pub label: &'static str,
    /// Site path the entry points to.
    pub path: &'static str,
    /// Marks entries handled by the shell instead of plain navigation.
    pub action: Option<&'static str>,
}

impl NavItem {
    const fn link(label: &'static str, path: &'static str) -> Self {
        Self {
            label,
            path,
            action: None,
        }
    }
}

const ANONYMOUS_NAV: &[NavItem] = &[
    NavItem::link("Home", HOME),
    NavItem::link("Browse", "/browse"),
    NavItem::link("Log in", "/login"),
    NavItem::link("Sign up", "/signup"),
];

const LOGOUT: NavItem = NavItem {
    label: "Logout",
    path: "/logout",
    action: Some("logout"),
};

const REP_NAV: &[NavItem] = &[
    NavItem::link("Dashboard", "/rep/dashboard"),
    NavItem::link("Opportunities", "/rep/opportunities"),
    NavItem::link("Messages", "/messages"),
    LOGOUT,
];

const BUSINESS_NAV: &[NavItem] = &[
    NavItem::link("Dashboard", "/business/dashboard"),
    NavItem::link("Post opportunity", "/business/opportunities/new"),
    NavItem::link("Reps", "/business/reps"),
    NavItem::link("Messages", "/messages"),
    LOGOUT,
];

/// Navigation entries for `session`.
pub fn nav_items(session: &Session) -> &'static [NavItem] {
    match session.role() {
        None => ANONYMOUS_NAV,
        Some(Role::Rep) => REP_NAV,
        Some(Role::Business) => BUSINESS_NAV,
    }
}

struct LinkView<'a> {
    label: &'a str,
    href: String,
    active: bool,
    action: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "header.html")]
struct HeaderTemplate<'a> {
    home_href: String,
    items: Vec<LinkView<'a>>,
    user_name: Option<&'a str>,
}

/// Renders the header for a session.
///
/// Rendering is idempotent: the same session and path always produce the
/// same markup, so the header can be repainted after any state change.
#[derive(Debug, Clone)]
pub struct HeaderRenderer {
    site: SiteRoot,
}

impl HeaderRenderer {
    /// Create a renderer building links under `site`.
    pub fn new(site: SiteRoot) -> Self {
        Self { site }
    }

    /// Site root links are built under.
    pub fn site(&self) -> &SiteRoot {
        &self.site
    }

    /// Render the header for `session`.
    pub fn render(&self, session: &Session) -> Result<String> {
        self.render_at(session, None)
    }

    /// Render the header, marking the entry for `current_path` as active.
    pub fn render_at(&self, session: &Session, current_path: Option<&str>) -> Result<String> {
        let current = current_path.map(|p| p.split('?').next().unwrap_or(p));
        let items = nav_items(session)
            .iter()
            .map(|item| LinkView {
                label: item.label,
                href: self.site.link(item.path),
                active: current == Some(item.path),
                action: item.action,
            })
            .collect();

        let template = HeaderTemplate {
            home_href: self.site.link(HOME),
            items,
            user_name: session.user().map(|u| u.name()),
        };
        Ok(template.render()?)
    }
}
