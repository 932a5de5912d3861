//! CLI routing and command dispatch.

use crate::core::config_file;
use crate::core::paths::ProjectPaths;
use crate::core::resolver::CredentialResolver;
use crate::models::credential::Scope;
use crate::models::host::HostId;
use crate::util::host;
use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub mod audit;
pub mod credential;
pub mod show;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub resolver: CredentialResolver,
    pub host: HostId,
    pub non_interactive: bool,
}

impl CliContext {
    pub fn paths(&self) -> &ProjectPaths {
        self.resolver.paths()
    }

    /// Record a mutation in the audit log. Failures are reported, not fatal.
    pub fn audit(&self, action: &str, scope: Scope) {
        let host = (scope == Scope::Personal).then(|| self.host.as_str());
        if let Err(e) = crate::core::audit_log::log(self.paths(), action, scope, host) {
            tracing::warn!(error = %format!("{:#}", e), "audit log failed");
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "credscope",
    version,
    about = "Manage personal and project credentials for test tooling"
)]
pub struct Cli {
    /// Project root containing config/ and config.yaml
    #[arg(long, global = true, value_name = "PATH", env = "CREDSCOPE_ROOT")]
    pub root: Option<PathBuf>,

    /// Host identifier for personal credentials (default: this machine's hostname)
    #[arg(
        long,
        global = true,
        value_name = "HOST",
        env = "CREDSCOPE_HOST",
        value_parser = clap::value_parser!(HostId)
    )]
    pub host: Option<HostId>,

    /// Run in non-interactive mode (no prompts, suitable for automation)
    #[arg(long, global = true, env = "CREDSCOPE_NON_INTERACTIVE")]
    pub non_interactive: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let paths = ProjectPaths::resolve(self.root)?;
        init_tracing(self.verbose, &paths);

        let host = match self.host {
            Some(host) => host,
            None => host::local_host_id()?,
        };
        tracing::debug!(%host, root = %paths.root.display(), "starting");

        let ctx = CliContext {
            resolver: CredentialResolver::new(paths),
            host,
            non_interactive: self.non_interactive,
        };

        match self.command {
            Commands::Show(args) => show::run(&ctx, args),
            Commands::SetProject(args) => credential::run_set_project(&ctx, args),
            Commands::SetPersonal(args) => credential::run_set_personal(&ctx, args),
            Commands::RemovePersonal => credential::run_remove_personal(&ctx),
            Commands::RemoveProject(args) => credential::run_remove_project(&ctx, args),
            Commands::Audit { command } => audit::run(&ctx, command),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show which credential scope is active for this host
    Show(show::ShowArgs),
    /// Write or overwrite the shared project credentials
    SetProject(credential::SetProjectArgs),
    /// Write or overwrite personal credentials for this host
    SetPersonal(credential::SetPersonalArgs),
    /// Delete personal credentials for this host
    RemovePersonal,
    /// Delete the shared project credentials
    RemoveProject(credential::RemoveProjectArgs),
    /// View or verify the audit trail
    Audit {
        #[command(subcommand)]
        command: audit::AuditCommand,
    },
}

/// Logs go to stderr; stdout carries command output.
///
/// Precedence: `RUST_LOG`, then `-v`, then `log.level` in config.yaml, then `warn`.
fn init_tracing(verbose: u8, paths: &ProjectPaths) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default_level(verbose, paths)),
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .try_init();
}

fn default_level(verbose: u8, paths: &ProjectPaths) -> String {
    match verbose {
        0 => {}
        1 => return "info".to_string(),
        2 => return "debug".to_string(),
        _ => return "trace".to_string(),
    }
    config_file::load(&paths.plain_config)
        .ok()
        .flatten()
        .and_then(|config| config.log.level)
        .unwrap_or_else(|| "warn".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_host_flag_is_validated() {
        assert!(Cli::try_parse_from(["credscope", "--host", "../etc", "show"]).is_err());
        assert!(Cli::try_parse_from(["credscope", "--host", "a/b", "show"]).is_err());

        let cli = Cli::try_parse_from(["credscope", "--host", "box-1", "show"]).unwrap();
        assert_eq!(cli.host.unwrap().as_str(), "box-1");
    }

    #[test]
    fn test_default_level_from_verbosity() {
        let paths = ProjectPaths::from_root(PathBuf::from("/nonexistent"));
        assert_eq!(default_level(0, &paths), "warn");
        assert_eq!(default_level(1, &paths), "info");
        assert_eq!(default_level(3, &paths), "trace");
    }

    #[test]
    fn test_default_level_from_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "log:\n  level: debug\n").unwrap();
        let paths = ProjectPaths::from_root(dir.path().to_path_buf());
        assert_eq!(default_level(0, &paths), "debug");
        assert_eq!(default_level(1, &paths), "info");
    }
}
