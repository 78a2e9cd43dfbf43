//! # RepMarket Router
//!
//! Client-side routing for the shell: path patterns, route guards, and the
//! tab's back/forward history.
//!
//! Every dispatch picks the best matching route (exact routes first, then
//! patterns in registration order), asks the [`RouteGuard`] whether the
//! current session may see it, and either runs the handler or follows the
//! guard's redirect. Redirects replace the current history entry. Handler
//! errors and panics are caught and rendered with the error view.
//!
//! ## Example
//!
//! ```rust
//! use repmarket_events::EventBus;
//! use repmarket_router::{RouteOptions, Router, ViewKind};
//! use repmarket_store::{MemoryStorage, Store, TabId};
//! use repmarket_types::Role;
//! use std::sync::Arc;
//!
//! let store = Arc::new(Store::open(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(EventBus::new()),
//!     TabId::generate(),
//! ));
//! let router = Router::new(store);
//! router.add_route("/login", RouteOptions::public(), |_| Ok("login".into())).unwrap();
//! router
//!     .add_route("/rep/dashboard", RouteOptions::for_roles([Role::Rep]), |_| Ok("rep".into()))
//!     .unwrap();
//!
//! let nav = router.navigate("/rep/dashboard", None, false);
//! assert_eq!(nav.view, ViewKind::Route);
//! assert_eq!(nav.path, "/login?redirect=%2Frep%2Fdashboard");
//! ```

mod error;
mod guard;
mod history;
mod options;
mod pattern;
mod router;

pub use error::{Result, RouterError};
pub use guard::{login_redirect, GuardDecision, RedirectReason, RouteGuard, LOGIN_PATH, REDIRECT_PARAM};
pub use history::{History, HistoryEntry};
pub use options::RouteOptions;
pub use pattern::{normalize_path, Params, RoutePattern};
pub use router::{
    ErrorHandler, Navigation, NavigationToken, NotFoundHandler, Redirect, RouteHandler,
    RouteRequest, Router, ViewKind, APP_TITLE, MAX_REDIRECTS,
};
