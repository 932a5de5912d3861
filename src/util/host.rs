//! Local machine identification.

use crate::models::host::HostId;
use anyhow::{Context, Result};

/// Hostname of the current machine as a validated host identifier.
pub fn local_host_id() -> Result<HostId> {
    let raw = nix::unistd::gethostname().context("read hostname")?;
    let name = raw
        .into_string()
        .map_err(|_| anyhow::anyhow!("hostname is not valid UTF-8"))?;
    HostId::parse(&name).with_context(|| format!("hostname '{}' cannot be used as host id", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_host_id_is_valid_path_component() {
        // Container hostnames are always plain labels; just check the invariant.
        if let Ok(host) = local_host_id() {
            assert!(!host.as_str().contains('/'));
            assert!(!host.as_str().is_empty());
        }
    }
}
