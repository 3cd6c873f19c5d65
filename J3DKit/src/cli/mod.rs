//! J3DKit CLI - Command-line interface for J3D animation and archive tools

pub mod commands;
pub mod progress;

use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "j3dkit")]
#[command(about = "J3DKit: J3D animation, RARC archive and Yaz0 tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Run the J3DKit CLI
pub fn run_cli() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    cli.command.execute()?;

    Ok(())
}
