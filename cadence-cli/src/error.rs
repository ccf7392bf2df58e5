use thiserror::Error;

use cadence_config::ConfigError;
use cadence_core::TimingError;
use cadence_simulator::SimulationError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Timing(#[from] TimingError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
