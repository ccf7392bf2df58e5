//! ## cadence-core::timing
//! **Facade holding the active scheduler**
//!
//! An explicit context rather than a process global: build one per
//! application, test or simulation run. Primitives bind to the scheduler
//! that is active when they are constructed.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::delay::Delay;
use crate::deterministic::{DeterministicScheduler, TickPolicy};
use crate::error::TimingError;
use crate::host::TokioScheduler;
use crate::interval::Interval;
use crate::scheduler::{Millis, Scheduler};
use crate::until::Until;

pub struct Timing {
    default: Arc<dyn Scheduler>,
    active: RwLock<Arc<dyn Scheduler>>,
}

impl Timing {
    /// `default` is what [`Timing::reset_scheduler`] restores.
    pub fn new(default: Arc<dyn Scheduler>) -> Self {
        Self {
            active: RwLock::new(Arc::clone(&default)),
            default,
        }
    }

    /// Facade over the tokio runtime of the calling context.
    pub fn host() -> Result<Self, TimingError> {
        Ok(Self::new(Arc::new(TokioScheduler::new()?)))
    }

    /// Facade over a fresh deterministic scheduler, returned alongside so the
    /// caller can drive it.
    pub fn deterministic(start_time: Millis) -> (Self, Arc<DeterministicScheduler>) {
        Self::deterministic_with_policy(start_time, TickPolicy::default())
    }

    pub fn deterministic_with_policy(
        start_time: Millis,
        policy: TickPolicy,
    ) -> (Self, Arc<DeterministicScheduler>) {
        let clock = Arc::new(DeterministicScheduler::with_policy(start_time, policy));
        (Self::new(clock.clone()), clock)
    }

    pub fn scheduler(&self) -> Arc<dyn Scheduler> {
        Arc::clone(&self.active.read())
    }

    /// Already constructed primitives keep the scheduler they were built with.
    pub fn set_scheduler(&self, scheduler: Arc<dyn Scheduler>) {
        *self.active.write() = scheduler;
    }

    pub fn reset_scheduler(&self) {
        *self.active.write() = Arc::clone(&self.default);
    }

    pub fn now(&self) -> Millis {
        self.active.read().now()
    }

    pub fn interval(&self, period: Millis, auto_start: bool) -> Interval {
        let interval = Interval::new(self.scheduler(), period);
        if auto_start {
            interval.start();
        }
        interval
    }

    pub fn delay(&self, duration: Millis, reject_on_cancel: bool, auto_start: bool) -> Delay {
        let delay = Delay::new(self.scheduler(), duration, reject_on_cancel);
        if auto_start {
            delay.start();
        }
        delay
    }

    pub fn until<F>(&self, predicate: F, auto_start: bool) -> Until
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let until = Until::new(self.scheduler(), predicate);
        if auto_start {
            until.start();
        }
        until
    }

    /// Settles once `predicate` stops holding.
    pub fn while_<F>(&self, predicate: F, auto_start: bool) -> Until
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let until = Until::new_while(self.scheduler(), predicate);
        if auto_start {
            until.start();
        }
        until
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::Settlement;
    use parking_lot::Mutex;

    #[test]
    fn primitives_bind_active_scheduler() {
        let (timing, first) = Timing::deterministic(0);
        let early = timing.delay(100, true, true);

        let second = Arc::new(DeterministicScheduler::new(0));
        timing.set_scheduler(second.clone());
        let late = timing.delay(100, true, true);

        first.advance(100);
        assert_eq!(early.completion().state(), Settlement::Fulfilled);
        assert_eq!(late.completion().state(), Settlement::Pending);

        second.advance(100);
        assert_eq!(late.completion().state(), Settlement::Fulfilled);
    }

    #[test]
    fn reset_restores_default() {
        let (timing, clock) = Timing::deterministic(42);
        timing.set_scheduler(Arc::new(DeterministicScheduler::new(7)));
        assert_eq!(timing.now(), 7);

        timing.reset_scheduler();
        assert_eq!(timing.now(), 42);
        clock.advance(8);
        assert_eq!(timing.now(), 50);
    }

    #[test]
    fn auto_start_flags_are_honoured() {
        let (timing, clock) = Timing::deterministic(0);
        let idle = timing.interval(10, false);
        let running = timing.interval(10, true);
        let waiting = timing.delay(10, true, false);
        let gate = timing.until(|| true, false);

        assert!(!idle.is_running());
        assert!(running.is_running());
        assert!(!waiting.is_running());
        assert!(!gate.is_running());
        assert_eq!(clock.pending_repeating(), 1);
        assert_eq!(clock.pending_once(), 0);
    }

    #[test]
    fn concrete_interval_scenario() {
        let (timing, clock) = Timing::deterministic_with_policy(0, TickPolicy::CatchUp);
        let interval = timing.interval(500, true);
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&ticks);
        interval.on_tick(move |now| sink.lock().push(*now));

        clock.advance(1_100);
        assert_eq!(*ticks.lock(), vec![500, 1_000]);
    }

    #[test]
    fn while_and_until_settle_together() {
        let (timing, clock) = Timing::deterministic(0);
        let mut a = 0;
        let mut b = 0;
        let until = timing.until(
            move || {
                a += 1;
                a >= 4
            },
            true,
        );
        let during = timing.while_(
            move || {
                b += 1;
                b < 4
            },
            true,
        );

        for _ in 0..3 {
            clock.advance(1);
            assert_eq!(until.is_settled(), during.is_settled());
        }
        clock.advance(1);
        assert!(until.is_settled());
        assert!(during.is_settled());
    }

    #[tokio::test]
    async fn host_facade_uses_tokio() {
        let timing = Timing::host().unwrap();
        let delay = timing.delay(0, true, true);
        assert_eq!((&delay).await, Ok(()));
    }
}
