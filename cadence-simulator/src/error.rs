use thiserror::Error;

use cadence_config::ConfigError;
use cadence_core::TimingError;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Scenario parsing error: {0}")]
    Parsing(#[from] serde_yaml::Error),

    #[error("State hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("Timing error: {0}")]
    Timing(#[from] TimingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
