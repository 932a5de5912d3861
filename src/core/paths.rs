//! Project root resolution and store locations.

use crate::constants;
use crate::models::host::HostId;
use crate::util::path;
use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    /// Project store directory (`config/`).
    pub config_dir: PathBuf,
    /// Parent of all per-host store directories (`config/hosts/`).
    pub hosts_dir: PathBuf,
    pub plain_config: PathBuf,
    pub audit_log: PathBuf,
    pub store_lock: PathBuf,
    pub audit_lock: PathBuf,
}

impl ProjectPaths {
    /// Resolve the project root from CLI arg, env var, or auto-detection.
    pub fn resolve(root_arg: Option<PathBuf>) -> Result<Self> {
        if let Some(root) = root_arg {
            return Ok(Self::from_root(root));
        }
        if let Ok(root) = env::var(constants::ROOT_ENV) {
            if !root.trim().is_empty() {
                return Ok(Self::from_root(PathBuf::from(root)));
            }
        }
        let cwd = env::current_dir().context("resolve current directory")?;
        if let Some(found) = find_project_root(&cwd) {
            return Ok(Self::from_root(found));
        }
        Ok(Self::from_root(cwd))
    }

    /// Create project paths from a root directory.
    pub fn from_root(root: PathBuf) -> Self {
        let config_dir = root.join(constants::CONFIG_DIR);
        let hosts_dir = config_dir.join(constants::HOSTS_DIR);
        let plain_config = root.join(constants::PLAIN_CONFIG_FILE);
        let audit_log = config_dir.join(constants::AUDIT_LOG_FILE);
        let store_lock = config_dir.join(constants::STORE_LOCK_FILE);
        let audit_lock = config_dir.join(constants::AUDIT_LOCK_FILE);
        Self {
            root,
            config_dir,
            hosts_dir,
            plain_config,
            audit_log,
            store_lock,
            audit_lock,
        }
    }

    /// Store directory for a host's personal credentials.
    pub fn host_dir(&self, host: &HostId) -> Result<PathBuf> {
        let dir = self.hosts_dir.join(host.as_str());
        if !path::is_within(&dir, &self.hosts_dir) || dir == self.hosts_dir {
            bail!("host '{}' escapes {}", host, self.hosts_dir.display());
        }
        Ok(dir)
    }
}

fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|ancestor| looks_like_root(ancestor))
        .map(Path::to_path_buf)
}

fn looks_like_root(path: &Path) -> bool {
    path.join(constants::CONFIG_DIR).is_dir() || path.join(constants::PLAIN_CONFIG_FILE).is_file()
}
