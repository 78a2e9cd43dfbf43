//! The authentication session manager.

use crate::directory::{RegistrationProfile, UserDirectory, UserRecord};
use crate::error::{AuthError, Result};
use crate::timer::ExpiryTimer;
use crate::token::generate_token;
use parking_lot::RwLock;
use repmarket_events::{NoticeLevel, ShellEvent};
use repmarket_store::{slots, StorageEvent, Store};
use repmarket_types::{normalize_email, Session, Timestamp, User};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Text of the notice shown when a session times out.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Path of the login view.
const LOGIN_PATH: &str = "/login";

struct Inner {
    store: Arc<Store>,
    directory: RwLock<UserDirectory>,
    ttl: Duration,
    timer: ExpiryTimer,
}

/// Owns every transition of the session:
/// `Anonymous --login/register--> Authenticated --logout/expiry/invalid token/other tab--> Anonymous`.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a manager over `store`, authenticating against `directory`.
    ///
    /// Accounts registered earlier in this profile (the `users` slot) are
    /// merged into the directory.
    pub fn new(store: Arc<Store>, mut directory: UserDirectory, ttl: Duration) -> Self {
        let registered: Vec<UserRecord> =
            serde_json::from_value(store.get(slots::USERS)).unwrap_or_default();
        let merged = directory.merge(registered);
        if merged > 0 {
            debug!(count = merged, "Merged locally registered accounts");
        }

        Self {
            inner: Arc::new(Inner {
                store,
                directory: RwLock::new(directory),
                ttl,
                timer: ExpiryTimer::new(),
            }),
        }
    }

    /// The store sessions are written to.
    pub fn store(&self) -> &Arc<Store> {
        &self.inner.store
    }

    /// Session lifetime applied at login.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Current session as stored.
    pub fn session(&self) -> Session {
        self.inner.store.session()
    }

    /// The logged-in user, if the session is active.
    pub fn current_user(&self) -> Option<User> {
        let session = self.session();
        if session.is_active_at(Timestamp::now()) {
            session.user().cloned()
        } else {
            None
        }
    }

    /// True if a user is logged in and the session has not expired.
    pub fn is_authenticated(&self) -> bool {
        self.session().is_active_at(Timestamp::now())
    }

    /// True while an expiry timer is pending.
    pub fn expiry_armed(&self) -> bool {
        self.inner.timer.is_armed()
    }

    /// Log in with email and password.
    ///
    /// On failure the current session is left untouched.
    pub fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let user = {
            let directory = self.inner.directory.read();
            let record = directory
                .find(&email)
                .ok_or_else(|| AuthError::NoSuchUser(email.clone()))?;
            if !record.verify(password) {
                warn!(email = %email, "Login rejected: incorrect password");
                return Err(AuthError::IncorrectPassword);
            }
            record.user.clone()
        };

        self.start_session(&user);
        info!(user_id = %user.id(), role = %user.role(), "User logged in");
        Ok(user)
    }

    /// Create an account from a sign-up form and log it in.
    pub fn register(&self, profile: RegistrationProfile) -> Result<User> {
        profile.validate()?;
        let role = profile
            .role
            .ok_or_else(|| AuthError::invalid("role", "is required"))?;

        let user = User::new(
            uuid::Uuid::new_v4().to_string(),
            profile.name.trim(),
            &profile.email,
            role,
        )
        .with_created_at(Timestamp::now())
        .with_profile(profile.profile);
        let record = UserRecord::with_digest(user.clone(), &profile.password);

        self.inner.directory.write().insert(record.clone())?;
        self.persist_registration(record);

        self.start_session(&user);
        info!(user_id = %user.id(), role = %user.role(), "User registered");
        Ok(user)
    }

    fn persist_registration(&self, record: UserRecord) {
        let store = &self.inner.store;
        let mut registered: Vec<UserRecord> =
            serde_json::from_value(store.get(slots::USERS)).unwrap_or_default();
        registered.push(record);
        match serde_json::to_value(&registered) {
            Ok(value) => {
                if let Err(e) = store.set(slots::USERS, value) {
                    warn!(error = %e, "Failed to persist registered account");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize registered accounts"),
        }
    }

    fn start_session(&self, user: &User) {
        let expires_at = Timestamp::now().saturating_add(self.inner.ttl);
        let session = Session::authenticated(user.clone(), generate_token(), Some(expires_at));
        if let Err(e) = self.inner.store.set_session(&session) {
            warn!(error = %e, "Session not persisted, continuing with in-memory session");
        }
        self.arm_expiry(self.inner.ttl);
    }

    fn arm_expiry(&self, delay: Duration) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.timer.arm(delay, move |generation| {
            if let Some(inner) = weak.upgrade() {
                SessionManager { inner }.expire(Some(generation));
            }
        });
    }

    /// Log out. Always succeeds; logging out while anonymous is a no-op.
    pub fn logout(&self) {
        self.inner.timer.cancel();
        let session = self.session();
        let Some(user) = session.user() else {
            debug!("Logout while anonymous ignored");
            return;
        };
        if let Err(e) = self.inner.store.clear_auth() {
            warn!(error = %e, "Logout not persisted");
        }
        info!(user_id = %user.id(), "User logged out");
    }

    /// End an expired session and publish the expiry notice.
    ///
    /// `generation` identifies a timer firing; `None` means expiry was
    /// detected lazily. Returns true if a session was ended.
    fn expire(&self, generation: Option<u64>) -> bool {
        if let Some(generation) = generation {
            if !self.inner.timer.claim(generation) {
                debug!(generation, "Stale expiry timer ignored");
                return false;
            }
        }

        let session = self.session();
        let Some(user) = session.user() else {
            return false;
        };
        let user_id = user.id().clone();

        self.inner.timer.cancel();
        if let Err(e) = self.inner.store.clear_auth() {
            warn!(error = %e, "Expired session not cleared from storage");
        }
        info!(user_id = %user_id, "Session expired");

        let bus = self.inner.store.bus();
        bus.emit(ShellEvent::SessionExpired {
            user_id: Some(user_id),
        });
        bus.emit(ShellEvent::Notice {
            level: NoticeLevel::Warning,
            message: SESSION_EXPIRED_MESSAGE.to_string(),
        });
        true
    }

    /// Re-validate `token` against the current session, e.g. when the tab
    /// becomes visible again. An invalid or expired token logs the user out.
    pub fn verify_token(&self, token: &str) -> bool {
        let session = self.session();
        let now = Timestamp::now();

        if session.token() == Some(token) && session.is_active_at(now) {
            return true;
        }

        if session.token() == Some(token) && session.is_expired_at(now) {
            self.expire(None);
        } else {
            warn!("Token verification failed");
            self.logout();
        }
        false
    }

    /// Resume a persisted session on page load: re-arm its timer, or end it
    /// if it already expired.
    pub fn restore(&self) -> Option<User> {
        let session = self.session();
        let user = session.user()?.clone();
        let now = Timestamp::now();

        if session.is_expired_at(now) {
            self.expire(None);
            return None;
        }

        if let Some(expires_at) = session.expires_at() {
            self.arm_expiry(now.until(expires_at));
        }
        info!(user_id = %user.id(), "Session restored");
        Some(user)
    }

    /// Apply a change another tab made to shared storage.
    ///
    /// A session removed elsewhere logs this tab out; a session created
    /// elsewhere is adopted with its own expiry timer. Returns true if this
    /// tab's session changed.
    pub fn handle_storage_event(&self, event: &StorageEvent) -> bool {
        if !self.inner.store.concerns(event) {
            return false;
        }
        self.resync()
    }

    /// Re-read shared storage and reconcile the session with it, e.g. after
    /// storage notifications were missed. Returns true if the session changed.
    pub fn resync(&self) -> bool {
        let outcome = self.inner.store.reload();
        if outcome.session_removed() {
            self.inner.timer.cancel();
            info!("Logged out by another tab");
        } else if outcome.auth_changed && outcome.current.is_authenticated() {
            let now = Timestamp::now();
            match outcome.current.expires_at() {
                Some(_) if outcome.current.is_expired_at(now) => {
                    self.expire(None);
                }
                Some(expires_at) => {
                    self.arm_expiry(now.until(expires_at));
                }
                None => self.inner.timer.cancel(),
            }
            info!("Session adopted from another tab");
        }
        outcome.auth_changed
    }

    /// End the session if it has expired but no timer caught it. Returns true
    /// if a session was ended.
    pub fn check_expiry(&self) -> bool {
        let session = self.session();
        if session.is_authenticated() && session.is_expired_at(Timestamp::now()) {
            return self.expire(None);
        }
        false
    }

    /// The logged-in user, for operations that need one. An expired session
    /// is ended first and reported as [`AuthError::SessionExpired`].
    pub fn active_user(&self) -> Result<Option<User>> {
        if self.check_expiry() {
            return Err(AuthError::SessionExpired);
        }
        Ok(self.current_user())
    }

    /// Where to continue after a successful login.
    ///
    /// The path the guard originally intercepted wins if it is a safe local
    /// path; otherwise the user's role landing page.
    pub fn post_login_destination(&self, requested: Option<&str>) -> String {
        if let Some(path) = requested {
            let local = path.starts_with('/') && !path.starts_with("//") && !path.contains('\\');
            let is_login = path == LOGIN_PATH || path.starts_with("/login?");
            if local && !is_login {
                return path.to_string();
            }
        }
        self.session()
            .role()
            .map_or_else(|| "/".to_string(), |role| role.landing_path().to_string())
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.inner.ttl)
            .field("users", &self.inner.directory.read().len())
            .field("expiry_armed", &self.inner.timer.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use repmarket_events::{EventBus, EventKind};
    use repmarket_store::{MemoryStorage, StorageBackend, TabId};
    use repmarket_types::{Profile, Role};

    const HOUR: Duration = Duration::from_secs(3600);

    fn store_on(storage: &MemoryStorage, tab: &str) -> Arc<Store> {
        Arc::new(Store::open(
            Arc::new(storage.clone()),
            Arc::new(EventBus::new()),
            TabId::new(tab),
        ))
    }

    fn manager(ttl: Duration) -> SessionManager {
        SessionManager::new(store_on(&MemoryStorage::new(), "t"), UserDirectory::demo(), ttl)
    }

    fn record_events(manager: &SessionManager) -> Arc<Mutex<Vec<EventKind>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        manager.store().bus().on_any(move |event| {
            sink.lock().push(event.kind());
            Ok(())
        });
        seen
    }

    fn signup(email: &str) -> RegistrationProfile {
        RegistrationProfile {
            name: "Jordan".into(),
            email: email.into(),
            password: "s3cret!".into(),
            role: Some(Role::Business),
            profile: Profile::default(),
        }
    }

    #[test]
    fn test_login_success() {
        let auth = manager(HOUR);
        let user = auth.login("  Rep@Example.TEST", "rep123").unwrap();
        assert_eq!(user.role(), Role::Rep);

        let session = auth.session();
        assert!(session.is_authenticated());
        assert_eq!(session.user(), Some(&user));
        assert!(session.token().unwrap().starts_with("rm_"));
        assert!(session.expires_at().unwrap() > Timestamp::now());
        assert_eq!(auth.current_user(), Some(user));
    }

    #[test]
    fn test_login_errors() {
        let auth = manager(HOUR);
        assert_eq!(
            auth.login("ghost@example.test", "x").unwrap_err(),
            AuthError::NoSuchUser("ghost@example.test".into())
        );
        assert_eq!(
            auth.login("rep@example.test", "wrong").unwrap_err(),
            AuthError::IncorrectPassword
        );
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_failed_login_keeps_prior_session() {
        let auth = manager(HOUR);
        auth.login("business@example.test", "business123").unwrap();
        let before = auth.session();

        assert!(auth.login("rep@example.test", "nope").is_err());
        assert_eq!(auth.session(), before);
    }

    #[test]
    fn test_fresh_token_per_login() {
        let auth = manager(HOUR);
        auth.login("rep@example.test", "rep123").unwrap();
        let first = auth.session().token().map(str::to_string);
        auth.login("rep@example.test", "rep123").unwrap();
        assert_ne!(auth.session().token().map(str::to_string), first);
    }

    #[test]
    fn test_logout_idempotent() {
        let auth = manager(HOUR);
        auth.login("rep@example.test", "rep123").unwrap();
        let seen = record_events(&auth);

        auth.logout();
        auth.logout();
        assert!(!auth.is_authenticated());
        assert_eq!(*seen.lock(), vec![EventKind::AuthChanged]);
    }

    #[test]
    fn test_register_logs_in_and_persists_account() {
        let storage = MemoryStorage::new();
        let auth = SessionManager::new(store_on(&storage, "a"), UserDirectory::demo(), HOUR);

        let user = auth.register(signup(" New@Biz.Example ")).unwrap();
        assert_eq!(user.email(), "new@biz.example");
        assert_eq!(user.role(), Role::Business);
        assert!(user.created_at().is_some());
        assert!(auth.is_authenticated());

        let stored = auth.store().get(slots::USERS).to_string();
        assert!(!stored.contains("s3cret!"));

        // A later page load can log the account in.
        let reloaded = SessionManager::new(store_on(&storage, "b"), UserDirectory::demo(), HOUR);
        reloaded.logout();
        assert_eq!(reloaded.login("new@biz.example", "s3cret!").unwrap().id(), user.id());
    }

    #[test]
    fn test_register_rejects_bad_forms() {
        let auth = manager(HOUR);
        let err = auth.register(signup("rep@example.test")).unwrap_err();
        assert_eq!(err.field(), Some("email"));

        let err = auth
            .register(RegistrationProfile { role: None, ..signup("x@example.test") })
            .unwrap_err();
        assert_eq!(err.field(), Some("role"));
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_verify_token() {
        let auth = manager(HOUR);
        auth.login("rep@example.test", "rep123").unwrap();
        let token = auth.session().token().unwrap().to_string();

        assert!(auth.verify_token(&token));
        assert!(!auth.verify_token("rm_forged"));
        assert!(!auth.is_authenticated());
        assert!(!auth.verify_token(&token));
    }

    #[test]
    fn test_verify_expired_token_publishes_expiry() {
        let auth = manager(Duration::ZERO);
        auth.login("rep@example.test", "rep123").unwrap();
        let token = auth.session().token().unwrap().to_string();
        let seen = record_events(&auth);

        assert!(!auth.verify_token(&token));
        assert_eq!(
            *seen.lock(),
            vec![EventKind::AuthChanged, EventKind::SessionExpired, EventKind::Notice]
        );
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_once() {
        let auth = manager(Duration::ZERO);
        let seen = record_events(&auth);
        auth.login("rep@example.test", "rep123").unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!auth.session().is_authenticated());
        let kinds = seen.lock().clone();
        assert_eq!(
            kinds.iter().filter(|k| **k == EventKind::SessionExpired).count(),
            1
        );
        assert_eq!(kinds.iter().filter(|k| **k == EventKind::Notice).count(), 1);

        auth.logout();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            seen.lock().iter().filter(|k| **k == EventKind::SessionExpired).count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_relogin_discards_old_timer() {
        let auth = manager(Duration::from_secs(10));
        let seen = record_events(&auth);

        auth.login("rep@example.test", "rep123").unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;
        auth.login("rep@example.test", "rep123").unwrap();

        // The first timer would have fired at t=10.
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!seen.lock().contains(&EventKind::SessionExpired));
        assert!(auth.expiry_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_cancels_timer() {
        let auth = manager(Duration::from_secs(1));
        let seen = record_events(&auth);
        auth.login("rep@example.test", "rep123").unwrap();
        auth.logout();
        assert!(!auth.expiry_armed());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!seen.lock().contains(&EventKind::SessionExpired));
    }

    #[test]
    fn test_restore() {
        let storage = MemoryStorage::new();
        let first = SessionManager::new(store_on(&storage, "a"), UserDirectory::demo(), HOUR);
        first.login("rep@example.test", "rep123").unwrap();

        let second = SessionManager::new(store_on(&storage, "b"), UserDirectory::demo(), HOUR);
        assert_eq!(second.restore().unwrap().email(), "rep@example.test");

        let expired_storage = MemoryStorage::new();
        let stale = SessionManager::new(
            store_on(&expired_storage, "a"),
            UserDirectory::demo(),
            Duration::ZERO,
        );
        stale.login("rep@example.test", "rep123").unwrap();
        let reopened = SessionManager::new(
            store_on(&expired_storage, "b"),
            UserDirectory::demo(),
            Duration::ZERO,
        );
        assert!(reopened.restore().is_none());
        assert!(!reopened.session().is_authenticated());
    }

    #[test]
    fn test_cross_tab_logout_and_login() {
        let storage = MemoryStorage::new();
        let tab_a = SessionManager::new(store_on(&storage, "a"), UserDirectory::demo(), HOUR);
        let tab_b = SessionManager::new(store_on(&storage, "b"), UserDirectory::demo(), HOUR);
        let mut b_events = storage.watch().unwrap();

        tab_a.login("rep@example.test", "rep123").unwrap();
        let event = b_events.try_recv().unwrap();
        assert!(tab_b.handle_storage_event(&event));
        assert!(tab_b.is_authenticated());

        tab_a.logout();
        let event = b_events.try_recv().unwrap();
        assert!(tab_b.handle_storage_event(&event));
        assert!(!tab_b.is_authenticated());

        // Own writes are ignored.
        tab_b.login("business@example.test", "business123").unwrap();
        let own = b_events.try_recv().unwrap();
        assert!(!tab_b.handle_storage_event(&own));
        assert!(tab_b.is_authenticated());
    }

    #[test]
    fn test_check_expiry() {
        let auth = manager(Duration::ZERO);
        assert!(!auth.check_expiry());

        auth.login("rep@example.test", "rep123").unwrap();
        let seen = record_events(&auth);
        assert!(auth.check_expiry());
        assert!(!auth.check_expiry());
        assert!(!auth.session().is_authenticated());
        assert_eq!(
            seen.lock().iter().filter(|k| **k == EventKind::SessionExpired).count(),
            1
        );
    }

    #[test]
    fn test_active_user() {
        let auth = manager(HOUR);
        assert_eq!(auth.active_user(), Ok(None));
        let user = auth.login("rep@example.test", "rep123").unwrap();
        assert_eq!(auth.active_user(), Ok(Some(user)));

        let short = manager(Duration::ZERO);
        short.login("rep@example.test", "rep123").unwrap();
        assert_eq!(short.active_user(), Err(AuthError::SessionExpired));
        assert_eq!(short.active_user(), Ok(None));
    }

    #[test]
    fn test_post_login_destination() {
        let auth = manager(HOUR);
        assert_eq!(auth.post_login_destination(None), "/");

        auth.login("business@example.test", "business123").unwrap();
        assert_eq!(auth.post_login_destination(None), "/business/dashboard");
        assert_eq!(
            auth.post_login_destination(Some("/contracts/7")),
            "/contracts/7"
        );
        assert_eq!(
            auth.post_login_destination(Some("//evil.example/")),
            "/business/dashboard"
        );
        assert_eq!(
            auth.post_login_destination(Some("https://evil.example/")),
            "/business/dashboard"
        );
        assert_eq!(
            auth.post_login_destination(Some("/login?redirect=/x")),
            "/business/dashboard"
        );
    }

    #[test]
    fn test_storage_backend_write_visible() {
        let storage = MemoryStorage::new();
        let auth = SessionManager::new(store_on(&storage, "a"), UserDirectory::demo(), HOUR);
        auth.login("rep@example.test", "rep123").unwrap();
        let blob = storage.read(repmarket_store::STATE_KEY).unwrap().unwrap();
        assert!(blob.contains("\"isAuthenticated\":true"));
        assert!(!blob.contains("rep123"));
    }
}
