//! Data structures shared by the core and CLI layers.

pub mod credential;
pub mod host;
pub mod plain_config;
