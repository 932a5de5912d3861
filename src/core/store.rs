//! One encrypted credential store: `auth.enc` + `auth.key` in a directory.

use crate::constants;
use crate::core::cipher::{self, CipherError, SecretKey};
use crate::models::credential::{Scope, StoredCredential};
use crate::util::fs as cred_fs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::error;
use zeroize::Zeroizing;

/// Why a store that exists on disk could not be used.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key file missing: {}", .0.display())]
    MissingKey(PathBuf),
    #[error("encrypted blob missing: {}", .0.display())]
    MissingBlob(PathBuf),
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot decrypt {}: {source}", .path.display())]
    Cipher {
        path: PathBuf,
        #[source]
        source: CipherError,
    },
    #[error("invalid payload in {}: {source}", .path.display())]
    Payload {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} holds {found} credentials, expected {expected}", .path.display())]
    ScopeMismatch {
        path: PathBuf,
        expected: Scope,
        found: Scope,
    },
}

/// On-disk state of a store, without decrypting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    Absent,
    Present,
    MissingKey,
    MissingBlob,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    scope: Scope,
    dir: PathBuf,
    blob: PathBuf,
    key: PathBuf,
}

impl CredentialStore {
    pub fn new(scope: Scope, dir: PathBuf) -> Self {
        let blob = dir.join(constants::BLOB_FILE);
        let key = dir.join(constants::KEY_FILE);
        Self {
            scope,
            dir,
            blob,
            key,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn blob_path(&self) -> &Path {
        &self.blob
    }

    pub fn key_path(&self) -> &Path {
        &self.key
    }

    pub fn state(&self) -> StoreState {
        match (self.blob.is_file(), self.key.is_file()) {
            (true, true) => StoreState::Present,
            (true, false) => StoreState::MissingKey,
            (false, true) => StoreState::MissingBlob,
            (false, false) => StoreState::Absent,
        }
    }

    /// Decrypt the store. `Ok(None)` when neither file exists.
    pub fn load(&self) -> Result<Option<StoredCredential>, StoreError> {
        match self.state() {
            StoreState::Absent => return Ok(None),
            StoreState::MissingKey => return Err(StoreError::MissingKey(self.key.clone())),
            StoreState::MissingBlob => return Err(StoreError::MissingBlob(self.blob.clone())),
            StoreState::Present => {}
        }

        let key_text = Zeroizing::new(read_text(&self.key)?);
        let key = SecretKey::decode(&key_text).map_err(|source| StoreError::Cipher {
            path: self.key.clone(),
            source,
        })?;
        let blob_text = read_text(&self.blob)?;
        let plain = cipher::open(&key, &blob_text).map_err(|source| StoreError::Cipher {
            path: self.blob.clone(),
            source,
        })?;
        let stored: StoredCredential =
            serde_json::from_slice(&plain).map_err(|source| StoreError::Payload {
                path: self.blob.clone(),
                source,
            })?;
        if stored.scope != self.scope {
            return Err(StoreError::ScopeMismatch {
                path: self.blob.clone(),
                expected: self.scope,
                found: stored.scope,
            });
        }
        Ok(Some(stored))
    }

    /// Seal `stored` under a freshly generated key, replacing any previous store.
    ///
    /// Both files are written and synced before either is renamed into place.
    /// If the blob rename fails the previous key is put back, so the old pair
    /// still loads.
    pub fn save(&self, stored: &StoredCredential, file_mode: u32) -> Result<()> {
        let key = SecretKey::generate();
        let payload = Zeroizing::new(
            serde_json::to_vec(stored).context("serialize credential payload")?,
        );
        let blob = cipher::seal(&key, &payload)
            .with_context(|| format!("encrypt {}", self.blob.display()))?;

        let key_tmp = cred_fs::stage(&self.key, key.encode().as_bytes(), file_mode)?;
        let blob_tmp = cred_fs::stage(&self.blob, blob.as_bytes(), file_mode)?;
        self.commit(key_tmp, blob_tmp, file_mode)
    }

    fn commit(
        &self,
        key_tmp: NamedTempFile,
        blob_tmp: NamedTempFile,
        file_mode: u32,
    ) -> Result<()> {
        let previous_key = match fs::read(&self.key) {
            Ok(bytes) => Some(Zeroizing::new(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e).with_context(|| format!("read {}", self.key.display())),
        };

        cred_fs::commit(key_tmp, &self.key)?;
        if let Err(err) = cred_fs::commit(blob_tmp, &self.blob) {
            let restored = match &previous_key {
                Some(bytes) => cred_fs::write_atomic(&self.key, bytes, file_mode),
                None => cred_fs::remove_if_exists(&self.key).map(|_| ()),
            };
            if let Err(restore_err) = restored {
                error!(
                    "failed to restore {} after aborted save: {:#}",
                    self.key.display(),
                    restore_err
                );
            }
            return Err(err);
        }
        Ok(())
    }

    /// Delete both artifacts. Returns whether anything was removed.
    pub fn remove(&self) -> Result<bool> {
        let blob = cred_fs::remove_if_exists(&self.blob)?;
        let key = cred_fs::remove_if_exists(&self.key)?;
        Ok(blob || key)
    }
}

fn read_text(path: &Path) -> Result<String, StoreError> {
    fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
