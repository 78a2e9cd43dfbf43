//! Account lookup: fixture users, demo accounts and local registrations.

use crate::error::{AuthError, Result};
use crate::token::password_digest;
use repmarket_types::{normalize_email, Profile, Role, User};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Minimum password length accepted at registration.
const MIN_PASSWORD_LEN: usize = 6;

/// An account together with the secret it logs in with.
///
/// Fixture records carry a plain `password`; accounts registered locally
/// carry only `passwordSha256`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// The account.
    #[serde(flatten)]
    pub user: User,
    /// Plain-text demo password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Hex SHA-256 of the password.
    #[serde(default, rename = "passwordSha256", skip_serializing_if = "Option::is_none")]
    pub password_sha256: Option<String>,
}

impl UserRecord {
    /// A record with a plain-text password.
    pub fn with_password(user: User, password: impl Into<String>) -> Self {
        Self {
            user,
            password: Some(password.into()),
            password_sha256: None,
        }
    }

    /// A record storing only the password digest.
    pub fn with_digest(user: User, password: &str) -> Self {
        Self {
            user,
            password: None,
            password_sha256: Some(password_digest(password)),
        }
    }

    /// Check `password` against the stored secret.
    pub fn verify(&self, password: &str) -> bool {
        if let Some(digest) = &self.password_sha256 {
            return *digest == password_digest(password);
        }
        self.password.as_deref() == Some(password)
    }
}

/// Accounts known to the shell, indexed by normalized email.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    records: Vec<UserRecord>,
    by_email: HashMap<String, usize>,
}

impl UserDirectory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The two built-in demo accounts used when fixtures are unavailable.
    pub fn demo() -> Self {
        let mut directory = Self::new();
        let rep = User::new("1", "Riley Rep", "rep@example.test", Role::Rep).with_profile(Profile {
            industry: Some("SaaS".into()),
            territory: Some("Pacific Northwest".into()),
            ..Profile::default()
        });
        let business = User::new("2", "Bay Area Widgets", "business@example.test", Role::Business)
            .with_profile(Profile {
                company: Some("Bay Area Widgets Inc.".into()),
                industry: Some("Manufacturing".into()),
                ..Profile::default()
            });
        directory.add(UserRecord::with_password(rep, "rep123"));
        directory.add(UserRecord::with_password(business, "business123"));
        directory
    }

    /// Parse a JSON array of fixture records.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let records: Vec<UserRecord> = serde_json::from_str(json)?;
        let mut directory = Self::new();
        for record in records {
            directory.add(record);
        }
        Ok(directory)
    }

    /// Load fixture records from a JSON file.
    pub fn from_fixture_file(path: &Path) -> Result<Self> {
        let fixture_error = |reason: String| AuthError::Fixtures {
            path: path.display().to_string(),
            reason,
        };
        let contents = fs::read_to_string(path).map_err(|e| fixture_error(e.to_string()))?;
        Self::from_json(&contents).map_err(|e| fixture_error(e.to_string()))
    }

    /// Load fixtures from `path`, falling back to [`UserDirectory::demo`] when
    /// no path is given, the file is unavailable, or it holds no accounts.
    pub fn load_or_demo(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("No fixture file configured, using demo accounts");
            return Self::demo();
        };

        match Self::from_fixture_file(path) {
            Ok(directory) if !directory.is_empty() => {
                info!(path = ?path, users = directory.len(), "Loaded user fixtures");
                directory
            }
            Ok(_) => {
                warn!(path = ?path, "Fixture file has no users, using demo accounts");
                Self::demo()
            }
            Err(e) => {
                warn!(error = %e, "Using demo accounts");
                Self::demo()
            }
        }
    }

    /// Add a record, normalizing its email. Later duplicates are ignored.
    fn add(&mut self, mut record: UserRecord) -> bool {
        record.user = record.user.normalized();
        let email = record.user.email().to_string();
        if self.by_email.contains_key(&email) {
            warn!(email = %email, "Duplicate account email ignored");
            return false;
        }
        self.by_email.insert(email, self.records.len());
        self.records.push(record);
        true
    }

    /// Register a new record. Fails if the email is taken.
    pub fn insert(&mut self, record: UserRecord) -> Result<()> {
        if self.find(record.user.email()).is_some() {
            return Err(AuthError::invalid("email", "is already registered"));
        }
        self.add(record);
        Ok(())
    }

    /// Merge records (e.g. persisted registrations), skipping known emails.
    pub fn merge(&mut self, records: impl IntoIterator<Item = UserRecord>) -> usize {
        records
            .into_iter()
            .map(|record| self.add(record))
            .filter(|added| *added)
            .count()
    }

    /// Find an account by email (normalized before lookup).
    pub fn find(&self, email: &str) -> Option<&UserRecord> {
        self.by_email
            .get(&normalize_email(email))
            .and_then(|&idx| self.records.get(idx))
    }

    /// Every known account.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.records.iter().map(|r| &r.user)
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if there are no accounts.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A sign-up form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationProfile {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Chosen password.
    #[serde(default)]
    pub password: String,
    /// Account role.
    #[serde(default)]
    pub role: Option<Role>,
    /// Optional profile details.
    #[serde(flatten)]
    pub profile: Profile,
}

impl RegistrationProfile {
    /// Check that every required field is present and well formed.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AuthError::invalid("name", "is required"));
        }
        let email = normalize_email(&self.email);
        if email.is_empty() {
            return Err(AuthError::invalid("email", "is required"));
        }
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AuthError::invalid("email", "is not a valid address"));
        }
        if self.password.is_empty() {
            return Err(AuthError::invalid("password", "is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::invalid(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        if self.role.is_none() {
            return Err(AuthError::invalid("role", "is required"));
        }
        Ok(())
    }
}
