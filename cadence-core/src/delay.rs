//! ## cadence-core::delay
//! **Resettable one-shot timer with an awaitable result**
//!
//! ### Lifecycle
//! `Idle -> Running -> Fulfilled | Rejected -> Idle`
//!
//! - `start` schedules the timer and returns the [`Completion`] awaiters use.
//! - The timer firing fulfils the completion.
//! - `cancel` rejects it with [`TimingError::Cancelled`] when configured to,
//!   otherwise leaves it pending forever.
//! - Starting again after a finished cycle hands out a fresh completion, so a
//!   single `Delay` can be awaited across many cycles.

use std::future::IntoFuture;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::deferred::{Completion, Deferred};
use crate::error::TimingError;
use crate::scheduler::{clamp, Millis, Scheduler, TimerHandle};

struct State {
    duration: Millis,
    reject_on_cancel: bool,
    running: bool,
    /// The current deferred has not been settled by a finished cycle.
    initialized: bool,
    /// Bumped on every start so callbacks of earlier cycles are ignored.
    cycle: u64,
    handle: Option<TimerHandle>,
    deferred: Deferred,
}

struct Inner {
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<State>,
}

#[derive(Clone)]
pub struct Delay {
    inner: Arc<Inner>,
}

impl Delay {
    pub fn new(scheduler: Arc<dyn Scheduler>, duration: Millis, reject_on_cancel: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                scheduler,
                state: Mutex::new(State {
                    duration: clamp(duration),
                    reject_on_cancel,
                    running: false,
                    initialized: true,
                    cycle: 0,
                    handle: None,
                    deferred: Deferred::new(),
                }),
            }),
        }
    }

    /// Starts the timer, or returns the pending completion if already running.
    pub fn start(&self) -> Completion {
        let mut state = self.inner.state.lock();
        if state.running {
            return state.deferred.completion();
        }
        if !state.initialized {
            state.deferred = Deferred::new();
            state.initialized = true;
        }
        state.running = true;
        state.cycle += 1;

        let inner = Arc::clone(&self.inner);
        let cycle = state.cycle;
        let handle = self
            .inner
            .scheduler
            .schedule_once(Arc::new(move || inner.complete(cycle)), state.duration);
        debug!(%handle, duration = state.duration, "delay started");
        state.handle = Some(handle);
        state.deferred.completion()
    }

    /// Stops a running timer. Rejects the current completion when
    /// `reject_on_cancel` is set; a completion that already settled is
    /// left untouched.
    pub fn cancel(&self) {
        let (handle, deferred, reject) = {
            let mut state = self.inner.state.lock();
            state.running = false;
            state.initialized = false;
            (
                state.handle.take(),
                state.deferred.clone(),
                state.reject_on_cancel,
            )
        };
        if let Some(handle) = handle {
            self.inner.scheduler.cancel_once(handle);
            debug!(%handle, "delay cancelled");
        }
        if reject {
            deferred.reject(TimingError::Cancelled);
        }
    }

    /// Cancels, then stores the new duration. Call [`Delay::start`] again to
    /// run with it.
    pub fn reset(&self, duration: Millis) {
        self.cancel();
        self.inner.state.lock().duration = clamp(duration);
    }

    /// Completion of the current (or next) cycle.
    pub fn completion(&self) -> Completion {
        self.inner.state.lock().deferred.completion()
    }

    pub fn duration(&self) -> Millis {
        self.inner.state.lock().duration
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    pub fn rejects_on_cancel(&self) -> bool {
        self.inner.state.lock().reject_on_cancel
    }
}

impl Inner {
    fn complete(&self, cycle: u64) {
        let deferred = {
            let mut state = self.state.lock();
            if !state.running || state.cycle != cycle {
                return;
            }
            state.running = false;
            state.initialized = false;
            state.handle = None;
            state.deferred.clone()
        };
        debug!(cycle, "delay elapsed");
        deferred.fulfill();
    }
}

impl IntoFuture for &Delay {
    type Output = Result<(), TimingError>;
    type IntoFuture = Completion;

    fn into_future(self) -> Self::IntoFuture {
        self.completion()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::Settlement;
    use crate::deterministic::DeterministicScheduler;

    fn setup() -> (Arc<DeterministicScheduler>, Arc<dyn Scheduler>) {
        let clock = Arc::new(DeterministicScheduler::new(0));
        let scheduler: Arc<dyn Scheduler> = clock.clone();
        (clock, scheduler)
    }

    #[test]
    fn fulfils_no_earlier_than_duration() {
        let (clock, scheduler) = setup();
        let delay = Delay::new(scheduler, 1_000, true);
        let completion = delay.start();

        clock.advance(999);
        assert_eq!(completion.state(), Settlement::Pending);
        assert!(delay.is_running());

        clock.advance(1);
        assert_eq!(completion.state(), Settlement::Fulfilled);
        assert!(!delay.is_running());
        assert_eq!(clock.pending_once(), 0);
    }

    #[test]
    fn cancel_rejects_before_time_moves() {
        let (clock, scheduler) = setup();
        let delay = Delay::new(scheduler, 1_000, true);
        let completion = delay.start();

        delay.cancel();
        assert_eq!(
            completion.state(),
            Settlement::Rejected(TimingError::Cancelled)
        );
        assert_eq!(clock.pending_once(), 0);

        clock.advance(5_000);
        assert_eq!(
            completion.state(),
            Settlement::Rejected(TimingError::Cancelled)
        );
    }

    #[test]
    fn cancel_without_reject_leaves_pending() {
        let (clock, scheduler) = setup();
        let delay = Delay::new(scheduler, 100, false);
        let completion = delay.start();

        delay.cancel();
        clock.advance(1_000);
        assert_eq!(completion.state(), Settlement::Pending);
        assert!(!delay.is_running());
    }

    #[test]
    fn start_while_running_returns_same_completion() {
        let (clock, scheduler) = setup();
        let delay = Delay::new(scheduler, 100, true);
        let first = delay.start();
        clock.advance(50);
        let second = delay.start();

        assert!(first.same_as(&second));
        assert_eq!(clock.pending_once(), 1);
        clock.advance(50);
        assert_eq!(second.state(), Settlement::Fulfilled);
    }

    #[test]
    fn restart_after_completion_creates_fresh_result() {
        let (clock, scheduler) = setup();
        let delay = Delay::new(scheduler, 100, true);
        let first = delay.start();
        clock.advance(100);

        let second = delay.start();
        assert!(!first.same_as(&second));
        assert_eq!(first.state(), Settlement::Fulfilled);
        assert_eq!(second.state(), Settlement::Pending);

        clock.advance(100);
        assert_eq!(second.state(), Settlement::Fulfilled);
    }

    #[test]
    fn cancel_after_fulfilment_keeps_fulfilled() {
        let (clock, scheduler) = setup();
        let delay = Delay::new(scheduler, 10, true);
        let completion = delay.start();
        clock.advance(10);

        delay.cancel();
        assert_eq!(completion.state(), Settlement::Fulfilled);
    }

    #[test]
    fn reset_does_not_restart() {
        let (clock, scheduler) = setup();
        let delay = Delay::new(scheduler, 100, false);
        delay.start();

        delay.reset(-40);
        assert_eq!(delay.duration(), 0);
        assert!(!delay.is_running());
        assert_eq!(clock.pending_once(), 0);

        let completion = delay.start();
        assert_eq!(completion.state(), Settlement::Pending);
        clock.advance(0);
        assert_eq!(completion.state(), Settlement::Fulfilled);
    }

    #[test]
    fn stale_callback_is_ignored_after_restart() {
        let clock = Arc::new(DeterministicScheduler::new(0));
        let scheduler: Arc<dyn Scheduler> = clock.clone();
        let delay = Delay::new(scheduler, 100, false);
        delay.start();
        let inner = Arc::clone(&delay.inner);

        delay.cancel();
        let completion = delay.start();
        // A late callback from the first cycle must not settle the second.
        inner.complete(1);
        assert_eq!(completion.state(), Settlement::Pending);

        clock.advance(100);
        assert_eq!(completion.state(), Settlement::Fulfilled);
    }

    #[tokio::test]
    async fn awaiting_the_delay_resolves_after_advance() {
        let (clock, scheduler) = setup();
        let delay = Delay::new(scheduler, 250, true);
        delay.start();

        let waiter = {
            let delay = delay.clone();
            tokio::spawn(async move { (&delay).await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        clock.advance(250);
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn awaiters_observe_cancellation() {
        let (_clock, scheduler) = setup();
        let delay = Delay::new(scheduler, 1_000, true);
        let completion = delay.start();

        delay.cancel();
        assert_eq!(completion.await, Err(TimingError::Cancelled));
    }
}
