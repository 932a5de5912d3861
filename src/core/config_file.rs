use crate::models::plain_config::PlainConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Load `config.yaml`. `Ok(None)` when the file does not exist.
pub fn load(path: &Path) -> Result<Option<PlainConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Some(PlainConfig::default()));
    }
    let config: PlainConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(Some(config))
}
