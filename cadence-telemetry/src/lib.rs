//! # Cadence Telemetry
//!
//! Logging setup and prometheus metrics for scheduler activity.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
