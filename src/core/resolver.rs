//! Credential resolution: personal → project → plaintext config.
//!
//! The first tier that yields a usable credential wins. A tier whose files
//! exist but cannot be used (missing key, failed decryption, wrong scope tag,
//! unreadable config) is skipped with a warning rather than treated as fatal.
//! Only when every tier comes up empty does resolution fail.

use crate::constants;
use crate::core::config_file;
use crate::core::file_lock::FileLock;
use crate::core::paths::ProjectPaths;
use crate::core::store::CredentialStore;
use crate::models::credential::{Credential, Scope, StoredCredential};
use crate::models::host::HostId;
use crate::util::fs as cred_fs;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(
        "no credentials found for host '{host}' under {}; run `credscope set-personal` \
         for this machine or `credscope set-project` for the shared account",
        .root.display()
    )]
    NotFound {
        host: HostId,
        root: PathBuf,
        skipped: Vec<SkippedScope>,
    },
}

/// A tier that had something on disk but could not be used.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedScope {
    pub scope: Scope,
    pub location: PathBuf,
    pub reason: String,
}

/// Outcome of a successful [`CredentialResolver::resolve`].
#[derive(Debug, Clone)]
pub struct Resolution {
    pub host: HostId,
    pub scope: Scope,
    pub credential: Credential,
    pub source: PathBuf,
    pub created_at: Option<DateTime<Utc>>,
    pub skipped: Vec<SkippedScope>,
}

impl Resolution {
    /// Warning callers should surface when the credential came from plaintext config.
    pub fn insecure_warning(&self) -> Option<String> {
        (self.scope == Scope::Plaintext).then(|| {
            format!(
                "using plaintext password from {} (not recommended); \
                 run `credscope set-personal` to store it encrypted",
                self.source.display()
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierState {
    Absent,
    Usable,
    Unusable,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierStatus {
    pub scope: Scope,
    pub location: PathBuf,
    pub state: TierState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveScope {
    pub scope: Scope,
    pub username: String,
    pub source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub insecure: bool,
}

/// What `show` reports. Never contains a password.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeReport {
    pub host: HostId,
    pub root: PathBuf,
    pub active: Option<ActiveScope>,
    pub tiers: Vec<TierStatus>,
}

struct Found {
    credential: Credential,
    source: PathBuf,
    created_at: Option<DateTime<Utc>>,
}

enum TierOutcome {
    Absent(PathBuf),
    Found(Found),
    Unusable(PathBuf, String),
}

#[derive(Debug, Clone)]
pub struct CredentialResolver {
    paths: ProjectPaths,
}

impl CredentialResolver {
    pub fn new(paths: ProjectPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn project_store(&self) -> CredentialStore {
        CredentialStore::new(Scope::Project, self.paths.config_dir.clone())
    }

    pub fn personal_store(&self, host: &HostId) -> Result<CredentialStore> {
        Ok(CredentialStore::new(Scope::Personal, self.paths.host_dir(host)?))
    }

    /// Resolve the credential `host` should use.
    pub fn resolve(&self, host: &HostId) -> Result<Resolution, ResolveError> {
        let mut skipped = Vec::new();
        for scope in Scope::ORDER {
            match self.inspect(scope, host) {
                TierOutcome::Found(found) => {
                    tracing::debug!(%scope, source = %found.source.display(), "resolved credentials");
                    if scope == Scope::Plaintext {
                        tracing::warn!(
                            source = %found.source.display(),
                            "using plaintext credentials from config (not recommended)"
                        );
                    }
                    return Ok(Resolution {
                        host: host.clone(),
                        scope,
                        credential: found.credential,
                        source: found.source,
                        created_at: found.created_at,
                        skipped,
                    });
                }
                TierOutcome::Unusable(location, reason) => {
                    tracing::warn!(%scope, location = %location.display(), %reason, "skipping credential store");
                    skipped.push(SkippedScope {
                        scope,
                        location,
                        reason,
                    });
                }
                TierOutcome::Absent(location) => {
                    tracing::trace!(%scope, location = %location.display(), "no credentials");
                }
            }
        }
        Err(ResolveError::NotFound {
            host: host.clone(),
            root: self.paths.root.clone(),
            skipped,
        })
    }

    /// Report which tier `host` would use, and the state of every tier.
    pub fn show(&self, host: &HostId) -> ScopeReport {
        let mut active = None;
        let mut tiers = Vec::with_capacity(Scope::ORDER.len());
        for scope in Scope::ORDER {
            let status = match self.inspect(scope, host) {
                TierOutcome::Absent(location) => TierStatus {
                    scope,
                    location,
                    state: TierState::Absent,
                    detail: None,
                },
                TierOutcome::Unusable(location, reason) => TierStatus {
                    scope,
                    location,
                    state: TierState::Unusable,
                    detail: Some(reason),
                },
                TierOutcome::Found(found) => {
                    let detail = if active.is_some() {
                        Some("shadowed by a higher-precedence scope".to_string())
                    } else {
                        active = Some(ActiveScope {
                            scope,
                            username: found.credential.username.clone(),
                            source: found.source.clone(),
                            created_at: found.created_at,
                            insecure: scope == Scope::Plaintext,
                        });
                        None
                    };
                    TierStatus {
                        scope,
                        location: found.source,
                        state: TierState::Usable,
                        detail,
                    }
                }
            };
            tiers.push(status);
        }
        ScopeReport {
            host: host.clone(),
            root: self.paths.root.clone(),
            active,
            tiers,
        }
    }

    /// Encrypt `credential` into the host's personal store, replacing any existing one.
    pub fn set_personal(&self, host: &HostId, credential: &Credential) -> Result<PathBuf> {
        validate_credential(credential)?;
        let store = self.personal_store(host)?;
        let _lock = FileLock::exclusive(&self.paths.store_lock)?;
        cred_fs::ensure_dir(store.dir(), constants::HOST_DIR_MODE)?;
        let stored = StoredCredential::new(
            Scope::Personal,
            credential.clone(),
            Some(host.to_string()),
        );
        store.save(&stored, constants::PERSONAL_FILE_MODE)?;
        tracing::info!(%host, path = %store.blob_path().display(), "saved personal credentials");
        Ok(store.blob_path().to_path_buf())
    }

    /// Encrypt `credential` into the shared project store. Affects every consumer
    /// of this project that has no personal store.
    pub fn set_project(&self, credential: &Credential) -> Result<PathBuf> {
        validate_credential(credential)?;
        let store = self.project_store();
        let _lock = FileLock::exclusive(&self.paths.store_lock)?;
        fs::create_dir_all(store.dir())
            .with_context(|| format!("create directory {}", store.dir().display()))?;
        let stored = StoredCredential::new(Scope::Project, credential.clone(), None);
        store.save(&stored, constants::PROJECT_FILE_MODE)?;
        tracing::warn!(
            path = %store.blob_path().display(),
            "project credentials replaced; all consumers without personal credentials are affected"
        );
        Ok(store.blob_path().to_path_buf())
    }

    /// Delete the host's personal store. Returns whether anything was removed.
    pub fn remove_personal(&self, host: &HostId) -> Result<bool> {
        let store = self.personal_store(host)?;
        if !store.dir().exists() {
            return Ok(false);
        }
        let _lock = FileLock::exclusive(&self.paths.store_lock)?;
        let removed = store.remove()?;
        // Only succeeds when empty; leftovers are someone else's files.
        let _ = fs::remove_dir(store.dir());
        if removed {
            tracing::info!(%host, "removed personal credentials");
        }
        Ok(removed)
    }

    /// Delete the shared project store. Returns whether anything was removed.
    pub fn remove_project(&self) -> Result<bool> {
        let store = self.project_store();
        if !store.dir().exists() {
            return Ok(false);
        }
        let _lock = FileLock::exclusive(&self.paths.store_lock)?;
        let removed = store.remove()?;
        if removed {
            tracing::warn!("removed project credentials");
        }
        Ok(removed)
    }

    fn inspect(&self, scope: Scope, host: &HostId) -> TierOutcome {
        match scope {
            Scope::Personal => match self.personal_store(host) {
                Ok(store) => inspect_store(&store),
                Err(e) => TierOutcome::Unusable(self.paths.hosts_dir.clone(), format!("{:#}", e)),
            },
            Scope::Project => inspect_store(&self.project_store()),
            Scope::Plaintext => self.inspect_plain_config(),
        }
    }

    fn inspect_plain_config(&self) -> TierOutcome {
        let path = self.paths.plain_config.clone();
        match config_file::load(&path) {
            Ok(None) => TierOutcome::Absent(path),
            Ok(Some(config)) => match config.credential() {
                Some(credential) => TierOutcome::Found(Found {
                    credential,
                    source: path,
                    created_at: None,
                }),
                None if config.has_credential_fields() => TierOutcome::Unusable(
                    path,
                    "basic.username and basic.password must both be set".to_string(),
                ),
                None => TierOutcome::Absent(path),
            },
            Err(e) => TierOutcome::Unusable(path, format!("{:#}", e)),
        }
    }
}

fn inspect_store(store: &CredentialStore) -> TierOutcome {
    let location = store.dir().to_path_buf();
    match store.load() {
        Ok(None) => TierOutcome::Absent(location),
        Ok(Some(stored)) => {
            if stored.credential.username.is_empty() || stored.credential.password.is_empty() {
                return TierOutcome::Unusable(location, "stored credential is empty".to_string());
            }
            TierOutcome::Found(Found {
                credential: stored.credential,
                source: store.blob_path().to_path_buf(),
                created_at: Some(stored.created_at),
            })
        }
        Err(e) => TierOutcome::Unusable(location, e.to_string()),
    }
}

fn validate_credential(credential: &Credential) -> Result<()> {
    if credential.username.trim().is_empty() {
        bail!("username cannot be empty");
    }
    if credential.password.is_empty() {
        bail!("password cannot be empty");
    }
    if credential.password.len() > constants::MAX_SECRET_SIZE {
        bail!(
            "password exceeds maximum size ({} bytes, max {} bytes)",
            credential.password.len(),
            constants::MAX_SECRET_SIZE
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolver() -> (TempDir, CredentialResolver) {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::from_root(dir.path().to_path_buf());
        (dir, CredentialResolver::new(paths))
    }

    fn host() -> HostId {
        HostId::parse("box").unwrap()
    }

    #[test]
    fn test_set_rejects_empty_fields() {
        let (_dir, r) = resolver();
        assert!(r.set_personal(&host(), &Credential::new("", "pw")).is_err());
        assert!(r.set_project(&Credential::new("svc", "")).is_err());
        assert!(!r.paths().config_dir.join(constants::BLOB_FILE).exists());
    }

    #[test]
    fn test_set_rejects_oversized_password() {
        let (_dir, r) = resolver();
        let big = "x".repeat(constants::MAX_SECRET_SIZE + 1);
        assert!(r.set_project(&Credential::new("svc", big)).is_err());
    }

    #[test]
    fn test_remove_personal_drops_empty_host_dir() {
        let (_dir, r) = resolver();
        let path = r.set_personal(&host(), &Credential::new("me", "pw")).unwrap();
        let host_dir = path.parent().unwrap().to_path_buf();
        assert!(r.remove_personal(&host()).unwrap());
        assert!(!host_dir.exists());
    }

    #[test]
    fn test_remove_absent_is_not_an_error() {
        let (_dir, r) = resolver();
        assert!(!r.remove_personal(&host()).unwrap());
        assert!(!r.remove_project().unwrap());
    }

    #[test]
    fn test_not_found_reports_skipped_tiers() {
        let (_dir, r) = resolver();
        r.set_project(&Credential::new("svc", "pw")).unwrap();
        fs::remove_file(r.project_store().key_path()).unwrap();
        match r.resolve(&host()) {
            Err(ResolveError::NotFound { skipped, .. }) => {
                assert_eq!(skipped.len(), 1);
                assert_eq!(skipped[0].scope, Scope::Project);
            }
            Ok(res) => panic!("unexpected resolution from {:?}", res.scope),
        }
    }

    #[test]
    fn test_show_marks_shadowed_tier() {
        let (_dir, r) = resolver();
        r.set_project(&Credential::new("svc", "pw")).unwrap();
        r.set_personal(&host(), &Credential::new("me", "pw2")).unwrap();
        let report = r.show(&host());
        let active = report.active.unwrap();
        assert_eq!(active.scope, Scope::Personal);
        assert_eq!(active.username, "me");
        assert_eq!(report.tiers[1].state, TierState::Usable);
        assert!(report.tiers[1].detail.as_deref().unwrap().contains("shadowed"));
        assert_eq!(report.tiers[2].state, TierState::Absent);
    }
}
