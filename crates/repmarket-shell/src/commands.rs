//! CLI command implementations.

use anyhow::{Context, Result};
use repmarket_auth::{AuthError, RegistrationProfile, SESSION_EXPIRED_MESSAGE};
use repmarket_events::{EventKind, ShellEvent};
use repmarket_shell::{Page, Shell, ShellConfig};
use repmarket_store::{FileStorage, MemoryStorage, StorageBackend};
use repmarket_types::{Profile, Role};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Arguments of `repmarket register`.
#[derive(Debug)]
pub struct RegisterArgs {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub territory: Option<String>,
}

fn load_config(path: Option<&Path>) -> Result<ShellConfig> {
    ShellConfig::load(path).context("failed to load configuration")
}

/// Open a shell over the on-disk storage file.
fn open_shell(config_path: Option<&Path>) -> Result<Shell> {
    let config = load_config(config_path)?;
    let storage_path = match config.storage_path.clone() {
        Some(path) => path,
        None => FileStorage::default_path().context("no data directory for the storage file")?,
    };
    tracing::debug!(path = %storage_path.display(), "Using storage file");

    let backend: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(storage_path));
    let shell = Shell::open(config, backend)?;
    shell.start()?;
    Ok(shell)
}

fn print_summary(page: &Page) {
    println!("{} ({})", page.navigation.title, page.path());
    for redirect in &page.navigation.redirects {
        println!("  redirected {} -> {} ({})", redirect.from, redirect.to, redirect.reason);
    }
    if let Some(error) = &page.navigation.error {
        println!("  error: {error}");
    }
}

/// Log in and persist the session.
pub fn login(config: Option<&Path>, email: &str, password: &str, redirect: Option<&str>) -> Result<()> {
    let shell = open_shell(config)?;
    let page = shell.login(email, password, redirect)?;
    if let Some(user) = shell.current_user() {
        println!("Logged in as {} <{}> ({})", user.name(), user.email(), user.role());
    }
    print_summary(&page);
    Ok(())
}

/// End the persisted session.
pub fn logout(config: Option<&Path>) -> Result<()> {
    let shell = open_shell(config)?;
    if shell.current_user().is_none() {
        println!("Not logged in.");
        return Ok(());
    }
    shell.logout()?;
    println!("Logged out.");
    Ok(())
}

/// Show the logged-in user.
pub fn whoami(config: Option<&Path>) -> Result<()> {
    let shell = open_shell(config)?;
    let user = match shell.auth().active_user() {
        Ok(Some(user)) => user,
        Ok(None) => {
            println!("Not logged in. Use 'repmarket login' to start a session.");
            return Ok(());
        }
        Err(AuthError::SessionExpired) => {
            println!("{SESSION_EXPIRED_MESSAGE}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{} <{}>", user.name(), user.email());
    println!("  role:    {}", user.role());
    println!("  id:      {}", user.id());
    if let Some(expires_at) = shell.session().expires_at() {
        println!("  expires: {expires_at}");
    }
    Ok(())
}

/// Create an account and log in.
pub fn register(config: Option<&Path>, args: RegisterArgs) -> Result<()> {
    let role: Role = args.role.parse()?;
    let shell = open_shell(config)?;
    let page = shell.register(RegistrationProfile {
        name: args.name,
        email: args.email,
        password: args.password,
        role: Some(role),
        profile: Profile {
            company: args.company,
            industry: args.industry,
            territory: args.territory,
            ..Profile::default()
        },
    })?;
    if let Some(user) = shell.current_user() {
        println!("Registered {} ({})", user.email(), user.id());
    }
    print_summary(&page);
    Ok(())
}

/// Render a route.
pub fn navigate(config: Option<&Path>, path: &str, html: bool) -> Result<()> {
    let shell = open_shell(config)?;
    let page = shell.navigate(path)?;
    if html {
        println!("{}", page.html);
    } else {
        print_summary(&page);
    }
    Ok(())
}

/// Print the header for the current session.
pub fn header(config: Option<&Path>) -> Result<()> {
    let shell = open_shell(config)?;
    println!("{}", shell.header_html());
    Ok(())
}

/// Two tabs sharing in-memory storage: log in, sync, log out elsewhere,
/// then watch a zero-length session expire.
pub fn demo(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(async move {
        let storage = MemoryStorage::new();
        let first = Shell::open(config.clone(), Arc::new(storage.clone()))?;
        let second = Shell::open(config.clone(), Arc::new(storage))?;
        first.start()?;
        second.start()?;
        println!("Tab {} and tab {} opened", first.tab(), second.tab());

        let page = first.login("rep@example.test", "rep123", Some("/rep/opportunities"))?;
        println!("[tab 1] logged in, now at {}", page.path());

        second.navigate("/rep/dashboard")?;
        if let Some(page) = second.sync_storage()? {
            println!("[tab 2] picked up the session, now at {}", page.path());
        }

        second.logout()?;
        println!("[tab 2] logged out");
        match first.sync_storage()? {
            Some(page) => println!("[tab 1] session ended elsewhere, now at {}", page.path()),
            None => println!("[tab 1] no change"),
        }

        let short = ShellConfig {
            session_ttl_secs: 0,
            ..config
        };
        let third = Shell::open(short, Arc::new(MemoryStorage::new()))?;
        let expired = Arc::new(AtomicUsize::new(0));
        let counter = expired.clone();
        third.bus().on(EventKind::SessionExpired, move |event| {
            if let ShellEvent::SessionExpired { user_id } = event {
                counter.fetch_add(1, Ordering::SeqCst);
                tracing::info!(user_id = ?user_id, "Expiry observed");
            }
            Ok(())
        });
        third.start()?;
        third.login("business@example.test", "business123", None)?;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let page = third.navigate("/business/dashboard")?;
        println!(
            "[tab 3] session expired {} time(s), now at {}",
            expired.load(Ordering::SeqCst),
            page.path()
        );
        if let Some(notice) = page.notice {
            println!("[tab 3] notice: {notice}");
        }
        anyhow::Ok(())
    })
}
