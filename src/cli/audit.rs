use crate::cli::CliContext;
use crate::core::audit_log;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Show recent audit entries
    Log(AuditLogArgs),
    /// Verify the hash chain of the audit log
    Verify,
}

#[derive(Args, Debug)]
pub struct AuditLogArgs {
    /// Show only the last N entries
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output format: table|json
    #[arg(long, default_value = "table")]
    pub format: String,
}

pub fn run(ctx: &CliContext, cmd: AuditCommand) -> Result<()> {
    match cmd {
        AuditCommand::Log(args) => run_log(ctx, args),
        AuditCommand::Verify => run_verify(ctx),
    }
}

fn run_log(ctx: &CliContext, args: AuditLogArgs) -> Result<()> {
    if args.format != "table" && args.format != "json" {
        bail!("invalid format: {} (use table|json)", args.format);
    }
    let entries = audit_log::read_log(ctx.paths(), args.limit)?;

    if args.format == "json" {
        let json = serde_json::to_string_pretty(&entries).context("serialize audit entries")?;
        println!("{}", json);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No audit entries in {}", ctx.paths().audit_log.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Timestamp").add_attribute(Attribute::Bold),
        Cell::new("Action").add_attribute(Attribute::Bold),
        Cell::new("Scope").add_attribute(Attribute::Bold),
        Cell::new("Host").add_attribute(Attribute::Bold),
        Cell::new("Actor").add_attribute(Attribute::Bold),
    ]);
    for entry in entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.action,
            entry.scope.to_string(),
            entry.host.unwrap_or_else(|| "-".to_string()),
            entry.actor,
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn run_verify(ctx: &CliContext) -> Result<()> {
    let (total, errors) = audit_log::verify_chain(ctx.paths())?;
    if errors.is_empty() {
        println!("Audit chain ok ({} entries)", total);
        return Ok(());
    }
    for error in &errors {
        println!("  [FAIL] {}", error);
    }
    bail!("audit chain broken: {} problem(s) in {} entries", errors.len(), total);
}
