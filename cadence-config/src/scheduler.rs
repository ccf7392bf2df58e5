//! Scheduler selection and deterministic clock parameters.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use cadence_core::deterministic::TickPolicy;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct SchedulerConfig {
    /// Logical start time of the deterministic clock (ms).
    #[serde(default)]
    #[validate(range(min = 0))]
    pub start_time_ms: i64,

    /// How an advance treats elapsed periods: `step` or `catch_up`.
    #[serde(default = "default_policy")]
    #[validate(custom(function = validation::validate_policy))]
    pub policy: String,
}

fn default_policy() -> String {
    "step".into()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            start_time_ms: 0,
            policy: default_policy(),
        }
    }
}

impl SchedulerConfig {
    /// Unknown names fall back to `Step`; validation rejects them earlier.
    pub fn tick_policy(&self) -> TickPolicy {
        match self.policy.as_str() {
            "catch_up" => TickPolicy::CatchUp,
            _ => TickPolicy::Step,
        }
    }
}
