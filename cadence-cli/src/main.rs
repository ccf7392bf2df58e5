//! ## cadence-cli
//! **Command line entrypoint**
//! Deterministic scenario simulation with hash validation, and a real-time
//! mode that runs the same scenario on tokio timers.

use clap::Parser;
use cadence_telemetry::logging::EventLogger;

mod commands;
mod error;

use commands::{Cli, Commands};
use error::CliError;

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config = commands::load_config(&cli)?;
    EventLogger::init(&config.telemetry.log_filter);

    match cli.command {
        Commands::Simulate(args) => commands::run_simulation_mode(&config, args),
        Commands::Run(args) => commands::run_host_mode(args).await,
    }
}
