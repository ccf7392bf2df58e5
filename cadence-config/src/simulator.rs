//! Fixed-step loop driver configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct SimulatorConfig {
    /// Nominal frame length (ms).
    #[serde(default = "default_step_ms")]
    #[validate(range(min = 1, max = 60_000))]
    pub step_ms: i64,

    /// Number of frames to run.
    #[serde(default = "default_steps")]
    #[validate(range(min = 1))]
    pub steps: usize,

    /// Extra random frame time in `0..=jitter_ms`.
    #[serde(default)]
    #[validate(range(min = 0, max = 1_000))]
    pub jitter_ms: i64,

    /// Seed for the jitter generator.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_step_ms() -> i64 {
    16
}

fn default_steps() -> usize {
    600
}

fn default_seed() -> u64 {
    42
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            step_ms: default_step_ms(),
            steps: default_steps(),
            jitter_ms: 0,
            seed: default_seed(),
        }
    }
}
