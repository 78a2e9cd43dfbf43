//! The guarded router.

use crate::error::{Result, RouterError};
use crate::guard::{GuardDecision, RedirectReason, RouteGuard};
use crate::history::History;
use crate::options::RouteOptions;
use crate::pattern::{normalize_path, Params, RoutePattern};
use parking_lot::{Mutex, RwLock};
use repmarket_events::ShellEvent;
use repmarket_store::Store;
use repmarket_types::{Timestamp, User};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Longest chain of guard redirects followed before giving up.
pub const MAX_REDIRECTS: usize = 4;

/// Application name appended to every document title.
pub const APP_TITLE: &str = "RepMarket";

/// Renders a route. Returns the view's HTML.
pub type RouteHandler = Arc<dyn Fn(&RouteRequest) -> anyhow::Result<String> + Send + Sync>;

/// Renders the view for an unmatched path.
pub type NotFoundHandler = Arc<dyn Fn(&RouteRequest) -> String + Send + Sync>;

/// Renders the view for a failed dispatch.
pub type ErrorHandler = Arc<dyn Fn(&RouteRequest, &RouterError) -> String + Send + Sync>;

/// What a handler sees.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    /// Path without query.
    pub path: String,
    /// Parameters captured by the route pattern.
    pub params: Params,
    /// Decoded query parameters.
    pub query: BTreeMap<String, String>,
    /// State attached to the history entry.
    pub state: Value,
    /// Logged-in user, snapshotted before the handler runs.
    pub user: Option<User>,
}

impl RouteRequest {
    /// A captured path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// A query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// Which view a navigation ended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// A route handler rendered.
    Route,
    /// No route matched.
    NotFound,
    /// The handler failed or the redirect limit was hit.
    Error,
}

/// One guard redirect taken during a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Path the guard rejected.
    pub from: String,
    /// Where it sent the user.
    pub to: String,
    /// Why.
    pub reason: RedirectReason,
}

/// Identifies one navigation. Async feature code holds on to it and drops
/// late results once [`Router::is_current`] turns false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationToken {
    /// Monotonic navigation counter.
    pub generation: u64,
    /// Path that navigation ended on.
    pub path: String,
}

/// Result of a navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    /// Path originally asked for.
    pub requested: String,
    /// Path finally rendered, after redirects.
    pub path: String,
    /// Which view rendered.
    pub view: ViewKind,
    /// Rendered HTML.
    pub body: String,
    /// Document title.
    pub title: String,
    /// Guard redirects taken, in order.
    pub redirects: Vec<Redirect>,
    /// The error rendered, if any.
    pub error: Option<RouterError>,
    /// Token of this navigation.
    pub token: NavigationToken,
}

impl Navigation {
    /// True if a guard redirected this navigation.
    pub fn was_redirected(&self) -> bool {
        !self.redirects.is_empty()
    }
}

struct Route {
    pattern: RoutePattern,
    options: RouteOptions,
    handler: RouteHandler,
}

struct Rendered {
    path: String,
    view: ViewKind,
    body: String,
    title: Option<String>,
    error: Option<RouterError>,
}

struct Current {
    token: NavigationToken,
    title: String,
}

/// Maps paths to handlers, applies route guards and keeps the tab's history.
pub struct Router {
    store: Arc<Store>,
    guard: RouteGuard,
    /// Routes in registration order.
    routes: RwLock<Vec<Route>>,
    not_found: RwLock<NotFoundHandler>,
    on_error: RwLock<ErrorHandler>,
    history: Mutex<History>,
    generation: AtomicU64,
    current: RwLock<Current>,
}

impl Router {
    /// Create a router reading the session from `store` and publishing on
    /// its bus.
    pub fn new(store: Arc<Store>) -> Self {
        let not_found: NotFoundHandler =
            Arc::new(|request: &RouteRequest| format!("Page not found: {}", request.path));
        let on_error: ErrorHandler = Arc::new(|_: &RouteRequest, error: &RouterError| {
            format!("Something went wrong: {error}")
        });

        Self {
            guard: RouteGuard::new(store.clone()),
            store,
            routes: RwLock::new(Vec::new()),
            not_found: RwLock::new(not_found),
            on_error: RwLock::new(on_error),
            history: Mutex::new(History::new()),
            generation: AtomicU64::new(0),
            current: RwLock::new(Current {
                token: NavigationToken {
                    generation: 0,
                    path: String::new(),
                },
                title: APP_TITLE.to_string(),
            }),
        }
    }

    /// Register `handler` for `pattern`. Registering the same pattern again
    /// replaces the earlier route in place.
    pub fn add_route<F>(&self, pattern: &str, options: RouteOptions, handler: F) -> Result<()>
    where
        F: Fn(&RouteRequest) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        let pattern = RoutePattern::parse(pattern)?;
        let route = Route {
            pattern,
            options,
            handler: Arc::new(handler),
        };

        let mut routes = self.routes.write();
        match routes
            .iter_mut()
            .find(|r| r.pattern.as_str() == route.pattern.as_str())
        {
            Some(existing) => {
                debug!(pattern = %route.pattern, "Route replaced");
                *existing = route;
            }
            None => {
                debug!(
                    pattern = %route.pattern,
                    guarded = route.options.is_guarded(),
                    "Route added"
                );
                routes.push(route);
            }
        }
        Ok(())
    }

    /// Replace the not-found view.
    pub fn set_not_found<F>(&self, handler: F)
    where
        F: Fn(&RouteRequest) -> String + Send + Sync + 'static,
    {
        *self.not_found.write() = Arc::new(handler);
    }

    /// Replace the error view.
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&RouteRequest, &RouterError) -> String + Send + Sync + 'static,
    {
        *self.on_error.write() = Arc::new(handler);
    }

    /// Number of registered routes.
    pub fn route_count(&self) -> usize {
        self.routes.read().len()
    }

    /// Record `path` in history (push, or replace the current entry) and
    /// render it.
    pub fn navigate(&self, path: &str, state: Option<Value>, replace: bool) -> Navigation {
        let path = clean_target(path);
        let state = state.unwrap_or(Value::Null);
        {
            let mut history = self.history.lock();
            if replace {
                history.replace(path.clone(), state.clone());
            } else {
                history.push(path.clone(), state.clone());
            }
        }
        self.resolve(path, state)
    }

    /// Render `path` without adding a history entry.
    pub fn dispatch(&self, path: &str) -> Navigation {
        let path = clean_target(path);
        let state = self
            .history
            .lock()
            .current()
            .filter(|entry| entry.path == path)
            .map(|entry| entry.state.clone())
            .unwrap_or(Value::Null);
        self.resolve(path, state)
    }

    /// Go back one history entry and re-render it. `None` at the start of
    /// history.
    pub fn back(&self) -> Option<Navigation> {
        let entry = self.history.lock().back().cloned()?;
        debug!(path = %entry.path, "History back");
        Some(self.resolve(entry.path, entry.state))
    }

    /// Go forward one history entry and re-render it.
    pub fn forward(&self) -> Option<Navigation> {
        let entry = self.history.lock().forward().cloned()?;
        debug!(path = %entry.path, "History forward");
        Some(self.resolve(entry.path, entry.state))
    }

    /// Re-render the current history entry, e.g. after the session changed.
    pub fn reload(&self) -> Option<Navigation> {
        let entry = self.history.lock().current().cloned()?;
        Some(self.resolve(entry.path, entry.state))
    }

    /// Path of the current history entry.
    pub fn current_path(&self) -> Option<String> {
        self.history.lock().current().map(|e| e.path.clone())
    }

    /// Paths in history, oldest first.
    pub fn history_paths(&self) -> Vec<String> {
        self.history
            .lock()
            .paths()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Title of the last rendered view.
    pub fn document_title(&self) -> String {
        self.current.read().title.clone()
    }

    /// Token of the latest navigation.
    pub fn navigation_token(&self) -> NavigationToken {
        self.current.read().token.clone()
    }

    /// True if no navigation has started since `token` was issued.
    pub fn is_current(&self, token: &NavigationToken) -> bool {
        self.generation.load(Ordering::SeqCst) == token.generation
    }

    fn resolve(&self, requested: String, state: Value) -> Navigation {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut redirects = Vec::new();
        let rendered = self.render(&requested, state, &mut redirects);

        let title = match rendered.title.as_deref() {
            Some(title) => format!("{title} | {APP_TITLE}"),
            None => APP_TITLE.to_string(),
        };
        let token = NavigationToken {
            generation,
            path: rendered.path.clone(),
        };

        // A navigation started from inside a handler may have superseded this one.
        if self.is_current(&token) {
            let mut current = self.current.write();
            current.token = token.clone();
            current.title = title.clone();
        }

        if rendered.view == ViewKind::Route {
            info!(path = %rendered.path, redirects = redirects.len(), "Navigated");
            self.store.bus().emit(ShellEvent::RouteChanged {
                path: rendered.path.clone(),
            });
        }

        Navigation {
            requested,
            path: rendered.path,
            view: rendered.view,
            body: rendered.body,
            title,
            redirects,
            error: rendered.error,
            token,
        }
    }

    /// Follow guard redirects from `requested` and render the final view.
    fn render(&self, requested: &str, state: Value, redirects: &mut Vec<Redirect>) -> Rendered {
        let mut target = requested.to_string();
        let mut state = state;

        loop {
            let mut request = self.request_for(&target, state.clone());

            let Some((options, handler, params)) = self.find(&request.path) else {
                info!(path = %target, "No route matched");
                let error = RouterError::RouteNotFound(request.path.clone());
                return Rendered {
                    body: self.render_not_found(&request),
                    path: target,
                    view: ViewKind::NotFound,
                    title: Some("Not found".to_string()),
                    error: Some(error),
                };
            };
            request.params = params;

            if let GuardDecision::Redirect { to, reason } = self.guard.check(&options, &target) {
                info!(from = %target, to = %to, reason = %reason, "Route guard redirected");
                redirects.push(Redirect {
                    from: target.clone(),
                    to: to.clone(),
                    reason,
                });

                if redirects.len() > MAX_REDIRECTS {
                    warn!(path = %requested, "Redirect limit reached");
                    let error = RouterError::RedirectLimit {
                        path: requested.to_string(),
                        limit: MAX_REDIRECTS,
                    };
                    return self.error_view(target, &request, error);
                }

                // Replace, so back() does not return to the rejected path.
                // A dispatch outside history leaves history untouched.
                {
                    let mut history = self.history.lock();
                    if history.current().is_some_and(|entry| entry.path == target) {
                        history.replace(to.clone(), Value::Null);
                    }
                }
                target = to;
                state = Value::Null;
                continue;
            }

            return match run_handler(&handler, &request) {
                Ok(body) => Rendered {
                    path: target,
                    view: ViewKind::Route,
                    body,
                    title: options.title,
                    error: None,
                },
                Err(message) => {
                    warn!(path = %target, error = %message, "Route handler failed");
                    let error = RouterError::Handler {
                        path: target.clone(),
                        message,
                    };
                    self.error_view(target, &request, error)
                }
            };
        }
    }

    fn error_view(&self, path: String, request: &RouteRequest, error: RouterError) -> Rendered {
        Rendered {
            body: self.render_error(request, &error),
            path,
            view: ViewKind::Error,
            title: Some("Error".to_string()),
            error: Some(error),
        }
    }

    fn request_for(&self, target: &str, state: Value) -> RouteRequest {
        let (path, query) = split_target(target);
        let session = self.store.session();
        let user = session
            .user()
            .filter(|_| session.is_active_at(Timestamp::now()))
            .cloned();
        RouteRequest {
            path,
            params: Params::new(),
            query,
            state,
            user,
        }
    }

    /// Exact routes win; otherwise the first matching pattern.
    fn find(&self, path: &str) -> Option<(RouteOptions, RouteHandler, Params)> {
        let routes = self.routes.read();
        let exact = routes
            .iter()
            .filter(|r| r.pattern.is_exact())
            .find_map(|r| r.pattern.matches(path).map(|p| (r, p)));
        let found = exact.or_else(|| {
            routes
                .iter()
                .filter(|r| !r.pattern.is_exact())
                .find_map(|r| r.pattern.matches(path).map(|p| (r, p)))
        });
        found.map(|(route, params)| (route.options.clone(), route.handler.clone(), params))
    }

    fn render_not_found(&self, request: &RouteRequest) -> String {
        let handler = self.not_found.read().clone();
        catch_unwind(AssertUnwindSafe(|| handler(request)))
            .unwrap_or_else(|_| format!("Page not found: {}", request.path))
    }

    fn render_error(&self, request: &RouteRequest, error: &RouterError) -> String {
        let handler = self.on_error.read().clone();
        catch_unwind(AssertUnwindSafe(|| handler(request, error)))
            .unwrap_or_else(|_| format!("Something went wrong: {error}"))
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.route_count())
            .field("history", &self.history.lock().len())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn run_handler(
    handler: &RouteHandler,
    request: &RouteRequest,
) -> std::result::Result<String, String> {
    match catch_unwind(AssertUnwindSafe(|| handler(request))) {
        Ok(Ok(body)) => Ok(body),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Absolute path with normalized slashes; query kept, fragment dropped.
fn clean_target(target: &str) -> String {
    let target = target.split('#').next().unwrap_or_default().trim();
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };
    let path = normalize_path(path);
    match query {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path,
    }
}

fn split_target(target: &str) -> (String, BTreeMap<String, String>) {
    match target.split_once('?') {
        Some((path, query)) => (
            normalize_path(path),
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        ),
        None => (normalize_path(target), BTreeMap::new()),
    }
}
