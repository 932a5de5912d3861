//! Authenticated encryption for credential blobs.
//!
//! Key file: URL-safe base64 of a 32-byte XChaCha20-Poly1305 key.
//! Blob file: URL-safe base64 of `version || nonce (24) || ciphertext+tag`.

use crate::constants;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use zeroize::Zeroizing;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 24;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("malformed key: {0}")]
    MalformedKey(String),
    #[error("malformed blob: {0}")]
    MalformedBlob(String),
    #[error("unsupported blob version {0}")]
    UnsupportedVersion(u8),
    #[error("authentication failed (wrong key or corrupted blob)")]
    Authentication,
    #[error("encryption failed")]
    Encrypt,
}

/// Symmetric key material. Wiped on drop.
pub struct SecretKey(Zeroizing<[u8; KEY_LEN]>);

impl SecretKey {
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut bytes[..]);
        Self(bytes)
    }

    /// Text form written to `auth.key`.
    pub fn encode(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("{}\n", URL_SAFE.encode(&self.0[..])))
    }

    pub fn decode(text: &str) -> Result<Self, CipherError> {
        let raw = Zeroizing::new(
            URL_SAFE
                .decode(text.trim())
                .map_err(|e| CipherError::MalformedKey(e.to_string()))?,
        );
        if raw.len() != KEY_LEN {
            return Err(CipherError::MalformedKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                raw.len()
            )));
        }
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.0[..]))
    }
}

/// Encrypt `plaintext` and return the text form written to `auth.enc`.
pub fn seal(key: &SecretKey, plaintext: &[u8]) -> Result<String, CipherError> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = key
        .cipher()
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: constants::BLOB_AAD,
            },
        )
        .map_err(|_| CipherError::Encrypt)?;

    let mut blob = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
    blob.push(constants::BLOB_VERSION);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(format!("{}\n", URL_SAFE.encode(blob)))
}

/// Decrypt the text form of `auth.enc`.
pub fn open(key: &SecretKey, blob_text: &str) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    let blob = URL_SAFE
        .decode(blob_text.trim())
        .map_err(|e| CipherError::MalformedBlob(e.to_string()))?;
    let (&version, rest) = blob
        .split_first()
        .ok_or_else(|| CipherError::MalformedBlob("empty".into()))?;
    if version != constants::BLOB_VERSION {
        return Err(CipherError::UnsupportedVersion(version));
    }
    if rest.len() < NONCE_LEN {
        return Err(CipherError::MalformedBlob("truncated nonce".into()));
    }
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    key.cipher()
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: constants::BLOB_AAD,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| CipherError::Authentication)
}
