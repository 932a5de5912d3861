//! Scoped credential management.
//!
//! Resolves login credentials for a machine from three tiers, in order:
//! an encrypted per-host ("personal") store, an encrypted shared project
//! store, and plaintext fields in `config.yaml`.
//!
//! ## Modules
//! - `cli`: Command-line handlers
//! - `core`: Business logic (cipher, stores, resolver, audit)
//! - `models`: Data structures
//! - `util`: Filesystem and host helpers

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod util;

pub use crate::core::paths::ProjectPaths;
pub use crate::core::resolver::{CredentialResolver, Resolution, ResolveError, ScopeReport};
pub use crate::models::credential::{Credential, Scope};
pub use crate::models::host::HostId;
