//! ## cadence-core::interval
//! **Repeating tick source**
//!
//! Each tick broadcasts the scheduler time to the registered listeners.
//! A running interval is kept alive by its scheduler registration, so an
//! interval that is never cancelled keeps ticking after its last handle is
//! dropped.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::scheduler::{clamp, Millis, Scheduler, TimerHandle};
use crate::signal::{ListenerId, Signal};

struct State {
    period: Millis,
    handle: Option<TimerHandle>,
}

struct Inner {
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<State>,
    ticks: Signal<Millis>,
}

#[derive(Clone)]
pub struct Interval {
    inner: Arc<Inner>,
}

impl Interval {
    /// Creates a stopped interval; call [`Interval::start`] to begin ticking.
    pub fn new(scheduler: Arc<dyn Scheduler>, period: Millis) -> Self {
        Self {
            inner: Arc::new(Inner {
                scheduler,
                state: Mutex::new(State {
                    period: clamp(period),
                    handle: None,
                }),
                ticks: Signal::new(),
            }),
        }
    }

    /// No-op while already running.
    pub fn start(&self) {
        let mut state = self.inner.state.lock();
        if state.handle.is_some() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let handle = self.inner.scheduler.schedule_repeating(
            Arc::new(move || inner.ticks.emit(&inner.scheduler.now())),
            state.period,
        );
        debug!(%handle, period = state.period, "interval started");
        state.handle = Some(handle);
    }

    /// Safe to call repeatedly. A broadcast already in flight completes.
    pub fn cancel(&self) {
        let handle = self.inner.state.lock().handle.take();
        if let Some(handle) = handle {
            self.inner.scheduler.cancel_repeating(handle);
            debug!(%handle, "interval cancelled");
        }
    }

    /// Cancels and stores the new period; does not restart.
    pub fn reset(&self, period: Millis) {
        self.cancel();
        self.inner.state.lock().period = clamp(period);
    }

    pub fn on_tick<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Millis) + Send + Sync + 'static,
    {
        self.inner.ticks.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.ticks.remove(id)
    }

    pub fn period(&self) -> Millis {
        self.inner.state.lock().period
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().handle.is_some()
    }
}
