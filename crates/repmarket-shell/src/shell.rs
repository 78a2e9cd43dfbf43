//! One tab of the application: store, event bus, auth, router and chrome
//! wired together.

use crate::config::ShellConfig;
use crate::error::Result;
use crate::pages;
use parking_lot::{Mutex, RwLock};
use repmarket_auth::{RegistrationProfile, SessionManager, UserDirectory};
use repmarket_events::{EventBus, EventKind, ShellEvent, SubscriptionId};
use repmarket_router::{Navigation, NavigationToken, Router};
use repmarket_store::{CacheSlots, StorageBackend, StorageEvent, Store, TabId};
use repmarket_types::{Session, User};
use repmarket_web::{HeaderRenderer, SiteRoot, Views};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

/// A rendered document.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// The navigation that produced it.
    pub navigation: Navigation,
    /// Header markup at render time.
    pub header: String,
    /// One-time notice shown with this page.
    pub notice: Option<String>,
    /// Full HTML document.
    pub html: String,
}

impl Page {
    /// Path finally rendered.
    pub fn path(&self) -> &str {
        &self.navigation.path
    }
}

/// State repainted by event handlers.
#[derive(Debug, Default)]
struct Chrome {
    header: String,
    path: Option<String>,
    notice: Option<String>,
    /// The session expired since the last render; the route must be guarded again.
    reguard: bool,
}

/// One browser tab.
///
/// Several shells over clones of one [`MemoryStorage`] behave like several
/// tabs of one origin; call [`Shell::sync_storage`] to deliver the other
/// tabs' writes.
///
/// [`MemoryStorage`]: repmarket_store::MemoryStorage
pub struct Shell {
    config: ShellConfig,
    store: Arc<Store>,
    auth: SessionManager,
    router: Router,
    header: HeaderRenderer,
    views: Views,
    chrome: Arc<RwLock<Chrome>>,
    storage_events: Mutex<Option<broadcast::Receiver<StorageEvent>>>,
    subscriptions: Vec<SubscriptionId>,
}

impl Shell {
    /// Open a tab over `backend`, using the directory configured by
    /// `config.fixtures_path` (demo accounts if unset or unreadable).
    pub fn open(config: ShellConfig, backend: Arc<dyn StorageBackend>) -> Result<Self> {
        let directory = UserDirectory::load_or_demo(config.fixtures_path.as_deref());
        Self::with_directory(config, backend, directory)
    }

    /// Open a tab authenticating against `directory`.
    pub fn with_directory(
        config: ShellConfig,
        backend: Arc<dyn StorageBackend>,
        directory: UserDirectory,
    ) -> Result<Self> {
        config.validate()?;
        let site: SiteRoot = config.site_root()?;

        // Subscribe before anything can write.
        let storage_events = backend.watch();

        let bus = Arc::new(EventBus::new());
        let tab = TabId::generate();
        let store = Arc::new(Store::open(backend, bus.clone(), tab.clone()));
        let auth = SessionManager::new(store.clone(), directory, config.session_ttl());

        let router = Router::new(store.clone());
        let views = Views::new(site.clone());
        pages::register(&router, &auth, &views)?;

        let header = HeaderRenderer::new(site.clone());
        let chrome = Arc::new(RwLock::new(Chrome {
            header: header.render(&store.session())?,
            ..Chrome::default()
        }));
        let subscriptions = subscribe_chrome(&bus, &store, &header, &views, &chrome);

        info!(tab = %tab, site = %site, "Shell opened");
        Ok(Self {
            config,
            store,
            auth,
            router,
            header,
            views,
            chrome,
            storage_events: Mutex::new(storage_events),
            subscriptions,
        })
    }

    /// Resume any persisted session and render the document's initial route.
    pub fn start(&self) -> Result<Page> {
        if let Some(user) = self.auth.restore() {
            debug!(user_id = %user.id(), "Resumed persisted session");
        }
        let path = self.initial_path();
        self.render(self.router.navigate(&path, None, true))
    }

    /// Route path the configured location maps to: the location relative to
    /// the site root, page directory and `.html` removed (`pages/login.html`
    /// is `/login`, `index.html` is `/`).
    pub fn initial_path(&self) -> String {
        let Ok(location) = url::Url::parse(&self.config.location) else {
            return "/".to_string();
        };
        let root = self.header.site().url().path();
        let mut relative = location.path().strip_prefix(root).unwrap_or("");

        for dir in &self.config.page_dirs {
            let dir = dir.trim_matches('/');
            if let Some(rest) = relative
                .strip_prefix(dir)
                .and_then(|r| r.strip_prefix('/'))
            {
                relative = rest;
                break;
            }
        }

        let relative = relative.strip_suffix(".html").unwrap_or(relative);
        let relative = match relative.rsplit_once('/') {
            Some((dir, "index")) => dir,
            None if relative == "index" => "",
            _ => relative,
        };
        let mut path = format!("/{}", relative.trim_end_matches('/'));
        if let Some(query) = location.query() {
            path.push('?');
            path.push_str(query);
        }
        path
    }

    /// Navigate to `path`, pushing a history entry.
    pub fn navigate(&self, path: &str) -> Result<Page> {
        self.auth.check_expiry();
        self.render(self.router.navigate(path, None, false))
    }

    /// Navigate with history state, optionally replacing the current entry.
    pub fn navigate_with(
        &self,
        path: &str,
        state: Option<serde_json::Value>,
        replace: bool,
    ) -> Result<Page> {
        self.auth.check_expiry();
        self.render(self.router.navigate(path, state, replace))
    }

    /// Go back one history entry.
    pub fn back(&self) -> Result<Option<Page>> {
        self.auth.check_expiry();
        self.router.back().map(|nav| self.render(nav)).transpose()
    }

    /// Go forward one history entry.
    pub fn forward(&self) -> Result<Option<Page>> {
        self.auth.check_expiry();
        self.router.forward().map(|nav| self.render(nav)).transpose()
    }

    /// Log in and continue to `redirect` (as carried by the login view) or
    /// the user's landing page.
    pub fn login(&self, email: &str, password: &str, redirect: Option<&str>) -> Result<Page> {
        self.auth.login(email, password)?;
        let destination = self.auth.post_login_destination(redirect);
        self.render(self.router.navigate(&destination, None, true))
    }

    /// Register an account and continue to its landing page.
    pub fn register(&self, profile: RegistrationProfile) -> Result<Page> {
        self.auth.register(profile)?;
        let destination = self.auth.post_login_destination(None);
        self.render(self.router.navigate(&destination, None, true))
    }

    /// Log out and go home.
    pub fn logout(&self) -> Result<Page> {
        self.auth.logout();
        self.render(self.router.navigate("/", None, false))
    }

    /// Apply storage changes made by other tabs since the last call, and
    /// any session expiry since the last render.
    ///
    /// If the session changed, the current route is rendered again so its
    /// guard re-applies. Returns the re-rendered page, if any.
    pub fn sync_storage(&self) -> Result<Option<Page>> {
        let mut changed = std::mem::take(&mut self.chrome.write().reguard);
        {
            let mut receiver = self.storage_events.lock();
            let Some(rx) = receiver.as_mut() else {
                return Ok(None);
            };
            let closed = loop {
                match rx.try_recv() {
                    Ok(event) => changed |= self.auth.handle_storage_event(&event),
                    Err(TryRecvError::Empty) => break false,
                    Err(TryRecvError::Lagged(missed)) => {
                        warn!(missed, "Storage notifications dropped, resyncing");
                        changed |= self.auth.resync();
                    }
                    Err(TryRecvError::Closed) => break true,
                }
            };
            if closed {
                debug!("Storage backend closed its notifications");
                *receiver = None;
            }
        }

        if !changed || self.router.current_path().is_none() {
            return Ok(None);
        }
        self.router.reload().map(|nav| self.render(nav)).transpose()
    }

    /// The tab became visible again: re-validate the session token.
    /// Returns true if the user is still logged in.
    pub fn on_visibility_regained(&self) -> bool {
        let session = self.store.session();
        match session.token() {
            Some(token) => self.auth.verify_token(token),
            None => false,
        }
    }

    fn render(&self, navigation: Navigation) -> Result<Page> {
        // The header is always painted from the latest session.
        let header = self
            .header
            .render_at(&self.store.session(), Some(navigation.path.as_str()))?;
        let notice = {
            let mut chrome = self.chrome.write();
            chrome.header = header.clone();
            chrome.path = Some(navigation.path.clone());
            chrome.reguard = false;
            chrome.notice.take()
        };
        let html = self.views.document(
            &navigation.title,
            &header,
            notice.as_deref(),
            &navigation.body,
        )?;
        Ok(Page {
            navigation,
            header,
            notice,
            html,
        })
    }

    /// Header markup as last painted.
    pub fn header_html(&self) -> String {
        self.chrome.read().header.clone()
    }

    /// Notice waiting to be shown with the next page.
    pub fn pending_notice(&self) -> Option<String> {
        self.chrome.read().notice.clone()
    }

    /// Title of the current document.
    pub fn document_title(&self) -> String {
        self.router.document_title()
    }

    /// Token of the latest navigation.
    pub fn navigation_token(&self) -> NavigationToken {
        self.router.navigation_token()
    }

    /// True if `token` still belongs to the latest navigation.
    pub fn is_current(&self, token: &NavigationToken) -> bool {
        self.router.is_current(token)
    }

    /// Current session.
    pub fn session(&self) -> Session {
        self.store.session()
    }

    /// The logged-in user.
    pub fn current_user(&self) -> Option<User> {
        self.auth.current_user()
    }

    /// Store handle for feature code; cannot write the session.
    pub fn cache(&self) -> CacheSlots {
        self.store.cache()
    }

    /// The event bus.
    pub fn bus(&self) -> &Arc<EventBus> {
        self.store.bus()
    }

    /// The session manager.
    pub fn auth(&self) -> &SessionManager {
        &self.auth
    }

    /// The router, for registering feature routes.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// This tab's id.
    pub fn tab(&self) -> &TabId {
        self.store.tab()
    }

    /// Configuration the shell was opened with.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }
}

impl Drop for Shell {
    fn drop(&mut self) {
        let bus = self.store.bus();
        for id in self.subscriptions.drain(..) {
            bus.off(id);
        }
    }
}

/// Repaint the header on every session or route change, queue notices and
/// flag expired sessions for re-guarding.
fn subscribe_chrome(
    bus: &EventBus,
    store: &Arc<Store>,
    header: &HeaderRenderer,
    views: &Views,
    chrome: &Arc<RwLock<Chrome>>,
) -> Vec<SubscriptionId> {
    let mut ids = Vec::new();

    let (renderer, target) = (header.clone(), chrome.clone());
    ids.push(bus.on(EventKind::AuthChanged, move |event| {
        if let ShellEvent::AuthChanged { session } = event {
            let path = target.read().path.clone();
            let html = renderer.render_at(session, path.as_deref())?;
            target.write().header = html;
        }
        Ok(())
    }));

    // Weak: the bus is owned by the store.
    let (renderer, target, weak_store): (_, _, Weak<Store>) =
        (header.clone(), chrome.clone(), Arc::downgrade(store));
    ids.push(bus.on(EventKind::RouteChanged, move |event| {
        if let (ShellEvent::RouteChanged { path }, Some(store)) = (event, weak_store.upgrade()) {
            let html = renderer.render_at(&store.session(), Some(path.as_str()))?;
            let mut chrome = target.write();
            chrome.header = html;
            chrome.path = Some(path.clone());
        }
        Ok(())
    }));

    let target = chrome.clone();
    ids.push(bus.on(EventKind::SessionExpired, move |_| {
        target.write().reguard = true;
        Ok(())
    }));

    let (views, target) = (views.clone(), chrome.clone());
    ids.push(bus.on(EventKind::Notice, move |event| {
        if let ShellEvent::Notice { level, message } = event {
            target.write().notice = Some(views.notice(*level, message)?);
        }
        Ok(())
    }));

    ids
}
