//! Marketplace accounts and roles.

use crate::error::TypesError;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable, unique identifier of a user.
///
/// Fixture files use either numeric or string ids; both decode into the same
/// string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

/// Marketplace role of an account. Fixed when the account is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Independent sales representative looking for opportunities.
    #[serde(alias = "sales_rep", alias = "salesrep")]
    Rep,
    /// Business posting opportunities for reps.
    #[serde(alias = "company")]
    Business,
}

impl Role {
    /// Landing page an authenticated user of this role is sent to.
    #[must_use]
    pub const fn landing_path(self) -> &'static str {
        match self {
            Role::Rep => "/rep/dashboard",
            Role::Business => "/business/dashboard",
        }
    }

    /// Both roles, in display order.
    #[must_use]
    pub const fn all() -> [Role; 2] {
        [Role::Rep, Role::Business]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Rep => write!(f, "rep"),
            Role::Business => write!(f, "business"),
        }
    }
}

impl FromStr for Role {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rep" | "sales_rep" | "salesrep" => Ok(Role::Rep),
            "business" | "company" => Ok(Role::Business),
            other => Err(TypesError::InvalidRole(other.to_string())),
        }
    }
}

/// Role-specific profile details. Displayed by feature pages, ignored by the shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Company name (business accounts, or a rep's current agency).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Industry the account sells into or operates in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Sales territory or region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub territory: Option<String>,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Free-form biography.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Normalizes an email address for identity comparisons (trim + lowercase).
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A marketplace account as seen by the shell.
///
/// Never carries a password or any other secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: UserId,
    name: String,
    email: String,
    role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<Timestamp>,
    #[serde(flatten)]
    profile: Profile,
}

impl User {
    /// Creates a user. The email is normalized.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: &str,
        role: Role,
    ) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            email: normalize_email(email),
            role,
            created_at: None,
            profile: Profile::default(),
        }
    }

    /// Stamps the creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Attaches profile details.
    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Returns a copy whose email is normalized. Used for records read from fixtures.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }

    /// Stable user id.
    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Marketplace role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// When the account was created, if known.
    #[must_use]
    pub fn created_at(&self) -> Option<Timestamp> {
        self.created_at
    }

    /// Role-specific profile details.
    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }
}
