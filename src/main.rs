use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = credscope::cli::Cli::parse();
    cli.run()
}
