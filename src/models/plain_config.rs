//! Plaintext `config.yaml` model.
//!
//! The file is shared with other tools, so unknown keys are ignored.

use crate::models::credential::Credential;
use serde::Deserialize;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlainConfig {
    #[serde(default)]
    pub basic: BasicSection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Clone, Default, Deserialize)]
pub struct BasicSection {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for BasicSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicSection")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSection {
    /// Default tracing filter (e.g. `info`, `credscope=debug`).
    #[serde(default)]
    pub level: Option<String>,
}

impl PlainConfig {
    /// The plaintext credential, if both fields are present and non-empty.
    pub fn credential(&self) -> Option<Credential> {
        let username = self.basic.username.as_deref()?.trim();
        let password = self.basic.password.as_ref()?;
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Credential {
            username: username.to_string(),
            password: password.clone(),
        })
    }

    /// Whether the file mentions credentials at all (complete or not).
    pub fn has_credential_fields(&self) -> bool {
        self.basic.username.is_some() || self.basic.password.is_some()
    }
}
