//! Centralized constants for file names, permissions, and limits.

/// Directory (relative to the project root) holding all credential stores.
pub const CONFIG_DIR: &str = "config";

/// Directory (relative to `CONFIG_DIR`) holding one store per host.
pub const HOSTS_DIR: &str = "hosts";

/// Encrypted credential blob.
pub const BLOB_FILE: &str = "auth.enc";

/// Symmetric key stored next to the blob.
pub const KEY_FILE: &str = "auth.key";

/// Plaintext fallback configuration (relative to the project root).
pub const PLAIN_CONFIG_FILE: &str = "config.yaml";

/// Audit log (relative to `CONFIG_DIR`).
pub const AUDIT_LOG_FILE: &str = "audit.log";

/// Lock taken for every store mutation.
pub const STORE_LOCK_FILE: &str = ".credscope.lock";

/// Lock taken while appending to the audit log.
pub const AUDIT_LOCK_FILE: &str = ".audit.lock";

/// Environment variable overriding the project root.
pub const ROOT_ENV: &str = "CREDSCOPE_ROOT";

/// Environment variable overriding the local host identifier.
pub const HOST_ENV: &str = "CREDSCOPE_HOST";

/// Permission mode for a per-host store directory.
pub const HOST_DIR_MODE: u32 = 0o700;

/// Permission mode for personal key and blob files.
pub const PERSONAL_FILE_MODE: u32 = 0o600;

/// Permission mode for project key and blob files (shared with the team group).
pub const PROJECT_FILE_MODE: u32 = 0o640;

/// Permission mode for the audit log.
pub const AUDIT_LOG_MODE: u32 = 0o640;

/// Maximum password size in bytes (64 KiB).
pub const MAX_SECRET_SIZE: usize = 65_536;

/// Current on-disk blob format version.
pub const BLOB_VERSION: u8 = 1;

/// Associated data bound into every ciphertext.
pub const BLOB_AAD: &[u8] = b"credscope-store-v1";
