//! ## cadence-telemetry::logging
//! **Structured logging with tracing**
//!
//! `RUST_LOG` takes precedence over the filter passed in from configuration.

use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, EnvFilter};

use cadence_core::scheduler::Millis;

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber; does nothing if one is already set.
    pub fn init(default_filter: &str) {
        let _ = Self::try_init(default_filter);
    }

    pub fn try_init(default_filter: &str) -> Result<(), TryInitError> {
        use tracing_subscriber::util::SubscriberInitExt;

        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_filter)),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::ENTER)
            .finish()
            .try_init()
    }

    /// Records a timer lifecycle event (tick, fulfilled, rejected, ...).
    #[inline]
    pub fn log_timer_event(timer: &str, kind: &str, at: Millis) {
        let span = info_span!("timer_event", timer = timer, kind = kind);
        let _entered = span.enter();
        tracing::info!(at, "Timer event occurred");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_logging() {
        EventLogger::log_timer_event("heartbeat", "tick", 500);
        assert!(logs_contain("Timer event occurred"));
        assert!(logs_contain("heartbeat"));
    }
}
