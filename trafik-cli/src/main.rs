//! ## trafik-cli
//! **Unified operational interface**
//! Trafik main entrypoint with the live traffic simulation and the
//! deterministic replay mode.
//!
//! ### Expectations:
//! - POSIX-compliant argument parsing
//! - Fatal on invalid configuration
//! - Structured logging for all commands
//!
//! ### Future:
//! - Route file scaffolding subcommand

use clap::Parser;
use trafik_telemetry::EventLogger;

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    EventLogger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run_live_mode(args).await,
        Commands::Simulate(args) => commands::run_simulation_mode(args).await,
    }
}
