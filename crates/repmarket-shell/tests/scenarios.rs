//! End-to-end tab scenarios over in-memory storage.

use pretty_assertions::assert_eq;
use repmarket_auth::{RegistrationProfile, SESSION_EXPIRED_MESSAGE};
use repmarket_events::{EventKind, ShellEvent};
use repmarket_router::{RedirectReason, RouteOptions, ViewKind};
use repmarket_shell::{Shell, ShellConfig, ShellError};
use repmarket_store::{slots, MemoryStorage, StorageBackend, TabId, STATE_KEY};
use repmarket_types::Role;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn open_tab(storage: &MemoryStorage) -> Shell {
    Shell::open(ShellConfig::default(), Arc::new(storage.clone())).unwrap()
}

#[test]
fn test_rep_login_repaints_header() {
    let storage = MemoryStorage::new();
    let shell = open_tab(&storage);
    let page = shell.start().unwrap();
    assert_eq!(page.path(), "/");
    assert!(shell.header_html().contains("Log in"));

    let page = shell.login("rep@example.test", "rep123", None).unwrap();

    assert_eq!(page.path(), "/rep/dashboard");
    assert_eq!(page.navigation.view, ViewKind::Route);
    let header = shell.header_html();
    assert!(header.contains("Dashboard"));
    assert!(header.contains("Logout"));
    assert!(!header.contains("Log in"));
    assert!(page.html.contains("Rep dashboard"));
    assert_eq!(shell.document_title(), "Rep dashboard | RepMarket");
}

#[test]
fn test_guarded_route_round_trips_through_login() {
    let shell = open_tab(&MemoryStorage::new());
    shell.start().unwrap();

    let page = shell.navigate("/rep/opportunities").unwrap();
    assert_eq!(page.path(), "/login?redirect=%2Frep%2Fopportunities");
    assert_eq!(page.navigation.redirects[0].reason, RedirectReason::Unauthenticated);
    assert!(page.html.contains("Log in to continue to"));

    let page = shell
        .login("rep@example.test", "rep123", Some("/rep/opportunities"))
        .unwrap();
    assert_eq!(page.path(), "/rep/opportunities");
}

#[test]
fn test_failed_login_keeps_anonymous_header() {
    let shell = open_tab(&MemoryStorage::new());
    shell.start().unwrap();

    let err = shell.login("rep@example.test", "wrong", None).unwrap_err();
    assert!(matches!(err, ShellError::Auth(_)));
    assert!(!shell.session().is_authenticated());
    assert!(shell.header_html().contains("Log in"));
}

#[test]
fn test_logout_in_another_tab_reguards_current_route() {
    let storage = MemoryStorage::new();
    let first = open_tab(&storage);
    let second = open_tab(&storage);
    first.start().unwrap();
    second.start().unwrap();

    first.login("rep@example.test", "rep123", None).unwrap();
    let adopted = second.sync_storage().unwrap();
    assert!(adopted.is_some());
    assert!(second.session().is_authenticated());
    assert!(second.header_html().contains("Logout"));

    let page = second.navigate("/rep/dashboard").unwrap();
    assert_eq!(page.navigation.view, ViewKind::Route);

    first.logout().unwrap();
    let page = second.sync_storage().unwrap().unwrap();
    assert_eq!(page.path(), "/login?redirect=%2Frep%2Fdashboard");
    assert!(!second.session().is_authenticated());
    assert!(second.header_html().contains("Log in"));

    // Nothing further to apply.
    assert!(second.sync_storage().unwrap().is_none());
}

#[test]
fn test_storage_removed_by_another_tab_reguards_current_route() {
    let storage = MemoryStorage::new();
    let shell = open_tab(&storage);
    shell.start().unwrap();
    shell.login("rep@example.test", "rep123", None).unwrap();
    assert_eq!(shell.navigate("/rep/dashboard").unwrap().navigation.view, ViewKind::Route);

    storage.remove(STATE_KEY, &TabId::new("other")).unwrap();

    let page = shell.sync_storage().unwrap().unwrap();
    assert_eq!(page.path(), "/login?redirect=%2Frep%2Fdashboard");
    assert!(!shell.session().is_authenticated());
    assert!(shell.header_html().contains("Log in"));
}

#[test]
fn test_wrong_role_never_runs_handler() {
    let shell = open_tab(&MemoryStorage::new());
    shell.start().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    shell
        .router()
        .add_route(
            "/business/reports",
            RouteOptions::for_roles([Role::Business]).titled("Reports"),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("reports".to_string())
            },
        )
        .unwrap();

    shell.login("rep@example.test", "rep123", None).unwrap();
    let page = shell.navigate("/business/reports").unwrap();

    assert_eq!(page.path(), "/rep/dashboard");
    assert_eq!(page.navigation.redirects[0].reason, RedirectReason::WrongRole);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_not_found_then_back() {
    let shell = open_tab(&MemoryStorage::new());
    shell.start().unwrap();
    shell.navigate("/browse").unwrap();

    let page = shell.navigate("/no/such/page").unwrap();
    assert_eq!(page.navigation.view, ViewKind::NotFound);
    assert!(page.html.contains("Page not found"));

    let page = shell.back().unwrap().unwrap();
    assert_eq!(page.path(), "/browse");
    assert_eq!(page.navigation.view, ViewKind::Route);

    let page = shell.forward().unwrap().unwrap();
    assert_eq!(page.path(), "/no/such/page");
}

#[test]
fn test_register_persists_account_for_other_tabs() {
    let storage = MemoryStorage::new();
    let shell = open_tab(&storage);
    shell.start().unwrap();

    let page = shell
        .register(RegistrationProfile {
            name: "Acme Tools".into(),
            email: "sales@acme.test".into(),
            password: "hunter22".into(),
            role: Some(Role::Business),
            ..RegistrationProfile::default()
        })
        .unwrap();
    assert_eq!(page.path(), "/business/dashboard");
    assert!(shell.cache().get(slots::USERS).is_array());

    shell.logout().unwrap();
    let later = open_tab(&storage);
    later.start().unwrap();
    let page = later.login("sales@acme.test", "hunter22", None).unwrap();
    assert_eq!(page.path(), "/business/dashboard");
}

#[test]
fn test_persisted_session_is_resumed_on_start() {
    let storage = MemoryStorage::new();
    let first = open_tab(&storage);
    first.start().unwrap();
    first.login("business@example.test", "business123", None).unwrap();
    drop(first);

    let reopened = open_tab(&storage);
    let page = reopened.start().unwrap();
    assert_eq!(page.path(), "/");
    assert!(reopened.session().is_authenticated());
    assert!(reopened.header_html().contains("Post opportunity"));
}

#[test]
fn test_initial_path_follows_location() {
    let config = ShellConfig {
        location: "https://demo.example/app/pages/login.html?redirect=%2Fmessages".into(),
        ..ShellConfig::default()
    };
    let shell = Shell::open(config, Arc::new(MemoryStorage::new())).unwrap();
    assert_eq!(shell.initial_path(), "/login?redirect=%2Fmessages");

    let page = shell.start().unwrap();
    assert_eq!(page.path(), "/login?redirect=%2Fmessages");
    assert!(page.header.contains("demo.example"));
}

#[test]
fn test_index_only_stripped_as_whole_segment() {
    let at = |location: &str| {
        let config = ShellConfig {
            location: location.into(),
            ..ShellConfig::default()
        };
        Shell::open(config, Arc::new(MemoryStorage::new()))
            .unwrap()
            .initial_path()
    };
    assert_eq!(at("http://localhost:8080/index.html"), "/");
    assert_eq!(at("http://localhost:8080/pages/index.html"), "/");
    assert_eq!(at("http://localhost:8080/pages/reindex.html"), "/reindex");
    assert_eq!(at("http://localhost:8080/pages/rep/index.html"), "/rep");
}

#[tokio::test(start_paused = true)]
async fn test_timer_expiry_reguards_idle_page() {
    let config = ShellConfig {
        session_ttl_secs: 1,
        ..ShellConfig::default()
    };
    let shell = Shell::open(config, Arc::new(MemoryStorage::new())).unwrap();
    shell.start().unwrap();
    let page = shell.login("rep@example.test", "rep123", None).unwrap();
    assert_eq!(page.path(), "/rep/dashboard");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!shell.session().is_authenticated());

    let page = shell.sync_storage().unwrap().unwrap();
    assert_eq!(page.path(), "/login?redirect=%2Frep%2Fdashboard");
    assert!(page.notice.unwrap().contains(SESSION_EXPIRED_MESSAGE));
    assert!(shell.header_html().contains("Log in"));

    // Notice and redirect happen once.
    assert!(shell.sync_storage().unwrap().is_none());
    assert!(shell.navigate("/").unwrap().notice.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_zero_ttl_session_expires_once_with_notice() {
    let config = ShellConfig {
        session_ttl_secs: 0,
        ..ShellConfig::default()
    };
    let shell = Shell::open(config, Arc::new(MemoryStorage::new())).unwrap();
    let expired = Arc::new(AtomicUsize::new(0));
    let counter = expired.clone();
    shell.bus().on(EventKind::SessionExpired, move |event| {
        assert!(matches!(event, ShellEvent::SessionExpired { user_id: Some(_) }));
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    shell.start().unwrap();

    shell.login("rep@example.test", "rep123", None).unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert_eq!(expired.load(Ordering::SeqCst), 1);
    assert!(!shell.session().is_authenticated());

    let page = shell.navigate("/rep/dashboard").unwrap();
    assert!(page.path().starts_with("/login?redirect="));
    let notice = page.notice.unwrap();
    assert!(notice.contains(SESSION_EXPIRED_MESSAGE));
    assert!(page.html.contains(SESSION_EXPIRED_MESSAGE));

    // Shown once.
    let page = shell.navigate("/").unwrap();
    assert!(page.notice.is_none());
    assert_eq!(expired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_expiry_without_runtime_is_detected_on_navigation() {
    let config = ShellConfig {
        session_ttl_secs: 0,
        ..ShellConfig::default()
    };
    let shell = Shell::open(config, Arc::new(MemoryStorage::new())).unwrap();
    shell.start().unwrap();
    shell.login("rep@example.test", "rep123", None).unwrap();
    std::thread::sleep(Duration::from_millis(2));

    let page = shell.navigate("/messages").unwrap();
    assert!(page.path().starts_with("/login"));
    assert!(page.notice.is_some());
    assert!(!shell.on_visibility_regained());
}

#[test]
fn test_visibility_check_keeps_live_session() {
    let shell = open_tab(&MemoryStorage::new());
    shell.start().unwrap();
    assert!(!shell.on_visibility_regained());

    shell.login("rep@example.test", "rep123", None).unwrap();
    assert!(shell.on_visibility_regained());
    assert!(shell.session().is_authenticated());
}

#[test]
fn test_stale_navigation_token() {
    let shell = open_tab(&MemoryStorage::new());
    shell.start().unwrap();
    let token = shell.navigate("/browse").unwrap().navigation.token;
    assert!(shell.is_current(&token));

    shell.navigate("/signup").unwrap();
    assert!(!shell.is_current(&token));
}
