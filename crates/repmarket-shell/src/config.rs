//! Shell configuration.
//!
//! Loaded in layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `repmarket.toml` in the working directory, or the file passed with
//!    `--config` (required when given)
//! 3. Environment variables with the `REPMARKET` prefix and `__` separator,
//!    e.g. `REPMARKET__SESSION_TTL_SECS=60`. `REPMARKET__PAGE_DIRS` takes a
//!    comma-separated list.

use repmarket_web::{SiteRoot, DEFAULT_PAGE_DIRS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Default document location.
pub const DEFAULT_LOCATION: &str = "http://localhost:8080/index.html";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),

    /// A value is present but unusable.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending setting.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Settings for one shell instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Site root override. Absolute, or relative to the location's origin.
    pub site_root: Option<String>,
    /// URL of the document the shell runs in.
    pub location: String,
    /// Session lifetime in seconds. 0 expires sessions immediately.
    pub session_ttl_secs: u64,
    /// JSON file with fixture user records.
    pub fixtures_path: Option<PathBuf>,
    /// Storage file used by the CLI.
    pub storage_path: Option<PathBuf>,
    /// Page directories stripped when deriving the site root.
    pub page_dirs: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            site_root: None,
            location: DEFAULT_LOCATION.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            fixtures_path: None,
            storage_path: None,
            page_dirs: DEFAULT_PAGE_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl ShellConfig {
    /// Load from defaults, the config file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("repmarket").required(false),
        };

        let config = config::Config::builder()
            .add_source(config::Config::try_from(&ShellConfig::default())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("REPMARKET")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("page_dirs"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Check that the location and site root resolve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.location).map_err(|e| ConfigError::Invalid {
            field: "location",
            reason: e.to_string(),
        })?;
        self.site_root()?;
        Ok(())
    }

    /// Resolved site root.
    pub fn site_root(&self) -> Result<SiteRoot, ConfigError> {
        SiteRoot::resolve(self.site_root.as_deref(), &self.location, &self.page_dirs).map_err(
            |e| ConfigError::Invalid {
                field: "site_root",
                reason: e.to_string(),
            },
        )
    }

    /// Session lifetime.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use std::sync::Mutex;

    // Environment variables are process-global.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = ShellConfig::default();
        assert_eq!(config.session_ttl(), Duration::from_secs(3600));
        assert_eq!(config.page_dirs, vec!["pages".to_string()]);
        assert!(config.validate().is_ok());
        assert_eq!(config.site_root().unwrap().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_load_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repmarket.toml");
        std::fs::write(
            &path,
            r#"
location = "https://demo.example/app/pages/login.html"
session_ttl_secs = 0
fixtures_path = "fixtures/users.json"
"#,
        )
        .unwrap();

        let config = ShellConfig::load(Some(&path)).unwrap();
        assert_eq!(config.location, "https://demo.example/app/pages/login.html");
        assert_eq!(config.session_ttl(), Duration::ZERO);
        assert_eq!(config.fixtures_path, Some(PathBuf::from("fixtures/users.json")));
        assert_eq!(config.page_dirs, vec!["pages".to_string()]);
        assert_eq!(config.site_root().unwrap().as_str(), "https://demo.example/app/");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = ShellConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_environment_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("REPMARKET__SESSION_TTL_SECS", "90");
        env::set_var("REPMARKET__SITE_ROOT", "/shop");
        let result = ShellConfig::load(None);
        env::remove_var("REPMARKET__SESSION_TTL_SECS");
        env::remove_var("REPMARKET__SITE_ROOT");

        let config = result.unwrap();
        assert_eq!(config.session_ttl_secs, 90);
        assert_eq!(config.site_root().unwrap().as_str(), "http://localhost:8080/shop/");
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let config = ShellConfig {
            location: "nowhere".into(),
            ..ShellConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "location", .. })
        ));

        let config = ShellConfig {
            site_root: Some("http://[broken".into()),
            ..ShellConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "site_root", .. })
        ));
    }
}
