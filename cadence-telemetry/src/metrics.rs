//! ## cadence-telemetry::metrics
//! **Prometheus exporter for scheduler activity**
//!
//! `observe` is called after each loop step with the scheduler's counters;
//! cumulative firings are turned into counter increments.

use std::sync::Arc;

use parking_lot::Mutex;
use prometheus::{IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};

use cadence_core::deterministic::SchedulerStats;

#[derive(Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub fired: IntCounterVec,
    pub pending: IntGaugeVec,
    pub clock: IntGauge,
    last: Arc<Mutex<SchedulerStats>>,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let fired = IntCounterVec::new(
            Opts::new("cadence_timers_fired_total", "Total timer firings"),
            &["kind"],
        )?;
        let pending = IntGaugeVec::new(
            Opts::new("cadence_timers_pending", "Timers waiting to fire"),
            &["kind"],
        )?;
        let clock = IntGauge::new("cadence_clock_ms", "Logical scheduler time")?;

        registry.register(Box::new(fired.clone()))?;
        registry.register(Box::new(pending.clone()))?;
        registry.register(Box::new(clock.clone()))?;

        Ok(Self {
            registry,
            fired,
            pending,
            clock,
            last: Default::default(),
        })
    }

    pub fn observe(&self, stats: &SchedulerStats) {
        let mut last = self.last.lock();
        self.fired
            .with_label_values(&["repeating"])
            .inc_by(stats.fired_repeating.saturating_sub(last.fired_repeating));
        self.fired
            .with_label_values(&["once"])
            .inc_by(stats.fired_once.saturating_sub(last.fired_once));
        self.pending
            .with_label_values(&["repeating"])
            .set(stats.pending_repeating as i64);
        self.pending
            .with_label_values(&["once"])
            .set(stats.pending_once as i64);
        self.clock.set(stats.now);
        *last = *stats;
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_turns_totals_into_increments() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.observe(&SchedulerStats {
            now: 100,
            pending_repeating: 2,
            pending_once: 1,
            fired_repeating: 4,
            fired_once: 1,
        });
        metrics.observe(&SchedulerStats {
            now: 200,
            pending_repeating: 2,
            pending_once: 0,
            fired_repeating: 6,
            fired_once: 2,
        });

        assert_eq!(metrics.fired.with_label_values(&["repeating"]).get(), 6);
        assert_eq!(metrics.fired.with_label_values(&["once"]).get(), 2);
        assert_eq!(metrics.pending.with_label_values(&["once"]).get(), 0);
        assert_eq!(metrics.clock.get(), 200);
    }

    #[test]
    fn renders_text_exposition() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.observe(&SchedulerStats::default());
        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("cadence_clock_ms"));
        assert!(text.contains("cadence_timers_pending"));
    }
}
