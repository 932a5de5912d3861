use crate::cli::CliContext;
use crate::core::resolver::{ScopeReport, TierState};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Output format: table|json
    #[arg(long, default_value = "table")]
    pub format: String,
}

pub fn run(ctx: &CliContext, args: ShowArgs) -> Result<()> {
    if args.format != "table" && args.format != "json" {
        bail!("invalid format: {} (use table|json)", args.format);
    }
    let report = ctx.resolver.show(&ctx.host);

    if args.format == "json" {
        let json = serde_json::to_string_pretty(&report).context("serialize report")?;
        println!("{}", json);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

/// Human-readable report, also printed after every mutating command.
pub fn print_report(report: &ScopeReport) {
    match &report.active {
        Some(active) => {
            println!(
                "Active: {} credentials (host: {}, user: {}, location: {})",
                active.scope,
                report.host,
                active.username,
                active.source.display()
            );
            if let Some(created) = active.created_at {
                let local: DateTime<Local> = created.into();
                println!("Stored: {}", local.format("%Y-%m-%d %H:%M:%S"));
            }
            if active.insecure {
                println!("warning: plaintext password in config (not recommended); run `credscope set-personal`");
            }
        }
        None => {
            println!(
                "No usable credentials for host {} under {}",
                report.host,
                report.root.display()
            );
            println!("Run `credscope set-personal` or `credscope set-project` to configure them.");
        }
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Scope").add_attribute(Attribute::Bold),
        Cell::new("State").add_attribute(Attribute::Bold),
        Cell::new("Location").add_attribute(Attribute::Bold),
        Cell::new("Detail").add_attribute(Attribute::Bold),
    ]);
    for tier in &report.tiers {
        let state = match tier.state {
            TierState::Absent => "absent",
            TierState::Usable => "usable",
            TierState::Unusable => "unusable",
        };
        table.add_row(vec![
            tier.scope.to_string(),
            state.to_string(),
            tier.location.display().to_string(),
            tier.detail.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    println!("{}", table);
}
