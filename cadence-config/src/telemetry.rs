//! Observability configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TelemetryConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    #[validate(custom(function = validation::validate_filter))]
    pub log_filter: String,

    /// Print prometheus metrics after a run.
    #[serde(default)]
    pub metrics: bool,
}

fn default_filter() -> String {
    "info".into()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_filter(),
            metrics: false,
        }
    }
}
