//! ## cadence-core::scheduler
//! **Contract shared by every clock implementation**
//!
//! Primitives only ever talk to a `dyn Scheduler`; they never know whether time
//! comes from tokio or from a caller-driven loop.

use std::fmt;
use std::sync::Arc;

/// Logical time and durations, in milliseconds.
pub type Millis = i64;

/// Work item invoked by a scheduler when it becomes due.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Opaque identifier of a pending work item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(i64);

impl TimerHandle {
    pub fn raw(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

pub trait Scheduler: Send + Sync {
    /// Current logical time in milliseconds.
    fn now(&self) -> Millis;

    /// Registers `callback` to fire every `period` ms. Negative periods are
    /// clamped to 0, which means "on every scheduler pass".
    fn schedule_repeating(&self, callback: Callback, period: Millis) -> TimerHandle;

    /// No-op for unknown or already cancelled handles.
    fn cancel_repeating(&self, handle: TimerHandle);

    /// Registers `callback` to fire once after `delay` ms (clamped to 0).
    fn schedule_once(&self, callback: Callback, delay: Millis) -> TimerHandle;

    /// No-op for unknown, fired or already cancelled handles.
    fn cancel_once(&self, handle: TimerHandle);
}

/// Negative periods and delays are treated as zero.
#[inline]
pub fn clamp(ms: Millis) -> Millis {
    ms.max(0)
}

/// Wrapping handle generator, starting at `i64::MIN`.
#[derive(Debug)]
pub(crate) struct HandleGenerator {
    next: i64,
}

impl HandleGenerator {
    pub(crate) fn new() -> Self {
        Self { next: i64::MIN }
    }

    pub(crate) fn next_handle(&mut self) -> TimerHandle {
        let handle = TimerHandle(self.next);
        self.next = if self.next == i64::MAX {
            i64::MIN
        } else {
            self.next + 1
        };
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_negative_to_zero() {
        assert_eq!(clamp(-5), 0);
        assert_eq!(clamp(0), 0);
        assert_eq!(clamp(250), 250);
    }

    #[test]
    fn generator_starts_at_min() {
        let mut ids = HandleGenerator::new();
        assert_eq!(ids.next_handle().raw(), i64::MIN);
        assert_eq!(ids.next_handle().raw(), i64::MIN + 1);
    }

    #[test]
    fn generator_wraps_after_max() {
        let mut ids = HandleGenerator { next: i64::MAX };
        assert_eq!(ids.next_handle().raw(), i64::MAX);
        assert_eq!(ids.next_handle().raw(), i64::MIN);
    }
}
