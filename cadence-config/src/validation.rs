//! Custom validation functions for configuration.

use validator::ValidationError;

pub const TICK_POLICIES: [&str; 2] = ["step", "catch_up"];

/// Validate the deterministic scheduler's catch-up policy name.
pub fn validate_policy(policy: &str) -> Result<(), ValidationError> {
    if TICK_POLICIES.contains(&policy) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_tick_policy"))
    }
}

/// Validate that a tracing filter directive is not blank.
pub fn validate_filter(filter: &str) -> Result<(), ValidationError> {
    if filter.trim().is_empty() {
        Err(ValidationError::new("empty_log_filter"))
    } else {
        Ok(())
    }
}
