//! Core business logic modules.

pub mod audit_log;
pub mod cipher;
pub mod config_file;
pub mod file_lock;
pub mod paths;
pub mod resolver;
pub mod store;
