//! HavenLoader CLI - Command-line interface for the Space Haven mod installer

pub mod commands;
pub mod progress;

use clap::Parser;
use commands::Commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "havenloader")]
#[command(about = "HavenLoader: Space Haven mod installer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Run the HavenLoader CLI
pub fn run_cli() -> anyhow::Result<()> {
    // Setup logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    cli.command.execute()?;

    Ok(())
}
