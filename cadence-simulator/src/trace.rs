//! Ordered record of everything a scenario did, and its state hash.

use std::fmt;
use std::sync::Arc;

use blake3::Hasher;
use parking_lot::Mutex;
use serde::Serialize;

use cadence_core::scheduler::Millis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Tick,
    Fulfilled,
    Rejected,
    Cancelled,
}

impl TraceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TraceKind::Tick => "tick",
            TraceKind::Fulfilled => "fulfilled",
            TraceKind::Rejected => "rejected",
            TraceKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    pub at: Millis,
    pub timer: String,
    pub kind: TraceKind,
}

/// Shared, append-only event log. Clones record into the same log.
#[derive(Clone, Default)]
pub struct Trace {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, at: Millis, timer: &str, kind: TraceKind) {
        tracing::debug!(at, timer, %kind, "trace event");
        self.events.lock().push(TraceEvent {
            at,
            timer: timer.to_string(),
            kind,
        });
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// BLAKE3 digest over the ordered events, hex encoded.
    pub fn state_hash(&self) -> String {
        let mut hasher = Hasher::new();
        for event in self.events.lock().iter() {
            hasher.update(&event.at.to_le_bytes());
            hasher.update(event.timer.as_bytes());
            hasher.update(&[0]);
            hasher.update(event.kind.as_str().as_bytes());
        }
        hex::encode(hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_depends_on_order_and_content() {
        let a = Trace::new();
        a.record(10, "x", TraceKind::Tick);
        a.record(20, "y", TraceKind::Fulfilled);

        let b = Trace::new();
        b.record(20, "y", TraceKind::Fulfilled);
        b.record(10, "x", TraceKind::Tick);

        let c = Trace::new();
        c.record(10, "x", TraceKind::Tick);
        c.record(20, "y", TraceKind::Fulfilled);

        assert_ne!(a.state_hash(), b.state_hash());
        assert_eq!(a.state_hash(), c.state_hash());
        assert_eq!(a.state_hash().len(), 64);
    }

    #[test]
    fn clones_share_the_log() {
        let trace = Trace::new();
        let writer = trace.clone();
        writer.record(5, "t", TraceKind::Cancelled);
        assert_eq!(trace.len(), 1);
        assert_eq!(trace.events()[0].kind, TraceKind::Cancelled);
    }
}
