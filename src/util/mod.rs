//! Utility modules for filesystem and host operations.

pub mod fs;
pub mod host;
pub mod path;
