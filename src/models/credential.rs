use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Precedence tier a credential was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Personal,
    Project,
    Plaintext,
}

impl Scope {
    /// Resolution order, highest precedence first.
    pub const ORDER: [Scope; 3] = [Scope::Personal, Scope::Project, Scope::Plaintext];

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Personal => "personal",
            Scope::Project => "project",
            Scope::Plaintext => "plaintext",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A username/password pair. The password is wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: Zeroizing<String>,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Payload sealed inside `auth.enc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub scope: Scope,
    #[serde(flatten)]
    pub credential: Credential,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredCredential {
    pub fn new(scope: Scope, credential: Credential, host: Option<String>) -> Self {
        Self {
            scope,
            credential,
            host,
            created_at: Utc::now(),
        }
    }
}
