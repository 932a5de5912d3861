//! Host identifiers used to namespace personal credential stores.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostIdError {
    #[error("host identifier cannot be empty")]
    Empty,
    #[error("host identifier '{0}' contains a path traversal")]
    Traversal(String),
    #[error("host identifier '{0}' may only contain [a-zA-Z0-9._-]")]
    InvalidChars(String),
}

/// A validated machine identifier. Safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HostId(String);

impl HostId {
    pub fn parse(s: &str) -> Result<Self, HostIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(HostIdError::Empty);
        }
        if s == "." || s.contains("..") {
            return Err(HostIdError::Traversal(s.to_string()));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
        {
            return Err(HostIdError::InvalidChars(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for HostId {
    type Err = HostIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
