//! Roles and authentication.
//!
//! A [`Principal`] is who is calling; their [`Role`] grants a fixed set of
//! [`Capability`] values. Identity comes from an [`Authenticator`], keeping
//! user lists out of the code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Caller role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Configures fairs and views reports
    Admin,
    /// Records sales at the terminal
    Seller,
}

/// Something a role may do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Activate, edit, close and archive fairs
    ManageFairs,
    /// Read sales listings, reports and fair history
    ViewReports,
    /// Record sales and request quotes
    RecordSales,
}

impl Role {
    /// Whether this role grants the capability
    #[must_use]
    pub const fn can(&self, capability: Capability) -> bool {
        match self {
            Self::Admin => matches!(
                capability,
                Capability::ManageFairs | Capability::ViewReports
            ),
            Self::Seller => matches!(capability, Capability::RecordSales),
        }
    }

    /// Configuration representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Seller => "seller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "seller" => Ok(Self::Seller),
            _ => Err(AuthConfigError::UnknownRole(s.to_string())),
        }
    }
}

/// An authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Display name, recorded as the seller on sales
    pub name: String,
    /// Granted role
    pub role: Role,
}

impl Principal {
    /// Whether this principal may perform the capability
    #[must_use]
    pub const fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }
}

/// Resolves a bearer token to a principal.
pub trait Authenticator: Send + Sync {
    /// Return the principal owning `token`, or `None` if the token is unknown
    fn authenticate(&self, token: &str) -> Option<Principal>;
}

/// Errors parsing an authenticator configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthConfigError {
    /// Entry is not `name:role:token`
    #[error("malformed user entry {0:?}, expected name:role:token")]
    MalformedEntry(String),

    /// Role is neither admin nor seller
    #[error("unknown role {0:?}")]
    UnknownRole(String),

    /// Two entries share a token
    #[error("duplicate token for user {0:?}")]
    DuplicateToken(String),
}

/// Token table loaded from configuration.
#[derive(Clone, Debug, Default)]
pub struct StaticAuthenticator {
    by_token: HashMap<String, Principal>,
}

impl StaticAuthenticator {
    /// Empty table; every token is rejected
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user
    #[must_use]
    pub fn with_user(mut self, name: impl Into<String>, role: Role, token: impl Into<String>) -> Self {
        self.by_token.insert(
            token.into(),
            Principal {
                name: name.into(),
                role,
            },
        );
        self
    }

    /// Parse a comma-separated list of `name:role:token` entries.
    ///
    /// Blank entries are ignored. Tokens may themselves contain `:`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthConfigError`] for a malformed entry, an unknown role or a
    /// token used twice.
    pub fn parse(users: &str) -> Result<Self, AuthConfigError> {
        let mut by_token = HashMap::new();
        for entry in users.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let mut parts = entry.splitn(3, ':');
            let (Some(name), Some(role), Some(token)) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(AuthConfigError::MalformedEntry(entry.to_string()));
            };
            let name = name.trim();
            let token = token.trim();
            if name.is_empty() || token.is_empty() {
                return Err(AuthConfigError::MalformedEntry(entry.to_string()));
            }
            let principal = Principal {
                name: name.to_string(),
                role: role.parse()?,
            };
            if by_token.insert(token.to_string(), principal).is_some() {
                return Err(AuthConfigError::DuplicateToken(name.to_string()));
            }
        }
        Ok(Self { by_token })
    }

    /// Number of configured users
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    /// Whether no users are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, token: &str) -> Option<Principal> {
        self.by_token.get(token).cloned()
    }
}
