//! ## cadence-core::until
//! **Condition polling**
//!
//! Polls a predicate on every scheduler pass and fulfils once it holds.
//! "While" is the same primitive over the negated predicate. There is no
//! cancellation: the only way out is the predicate becoming true.

use std::future::IntoFuture;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::deferred::{Completion, Deferred};
use crate::error::TimingError;
use crate::scheduler::{Scheduler, TimerHandle};

type Predicate = Box<dyn FnMut() -> bool + Send>;

struct State {
    /// Dropped once satisfied so captured state can be freed.
    predicate: Option<Predicate>,
    /// Out on loan while a poll is evaluating it.
    polling: bool,
    handle: Option<TimerHandle>,
    deferred: Deferred,
}

struct Inner {
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<State>,
}

#[derive(Clone)]
pub struct Until {
    inner: Arc<Inner>,
}

impl Until {
    pub fn new<F>(scheduler: Arc<dyn Scheduler>, predicate: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                scheduler,
                state: Mutex::new(State {
                    predicate: Some(Box::new(predicate)),
                    polling: false,
                    handle: None,
                    deferred: Deferred::new(),
                }),
            }),
        }
    }

    /// Settles once `predicate` stops holding.
    pub fn new_while<F>(scheduler: Arc<dyn Scheduler>, mut predicate: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        Self::new(scheduler, move || !predicate())
    }

    /// Begins polling on the next scheduler pass. Never settles synchronously;
    /// idempotent while running and after settlement.
    pub fn start(&self) -> Completion {
        let mut state = self.inner.state.lock();
        let finished = state.predicate.is_none() && !state.polling;
        if state.handle.is_some() || finished {
            return state.deferred.completion();
        }
        let inner = Arc::clone(&self.inner);
        let handle = self
            .inner
            .scheduler
            .schedule_repeating(Arc::new(move || inner.poll()), 0);
        debug!(%handle, "until started");
        state.handle = Some(handle);
        state.deferred.completion()
    }

    pub fn completion(&self) -> Completion {
        self.inner.state.lock().deferred.completion()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().handle.is_some()
    }

    pub fn is_settled(&self) -> bool {
        self.inner.state.lock().deferred.is_settled()
    }
}

impl Inner {
    fn poll(&self) {
        // The predicate runs with no lock held so it may inspect this Until.
        let mut predicate = {
            let mut state = self.state.lock();
            if state.handle.is_none() {
                return;
            }
            match state.predicate.take() {
                Some(predicate) => {
                    state.polling = true;
                    predicate
                }
                None => return,
            }
        };

        let satisfied = predicate();

        let (handle, deferred) = {
            let mut state = self.state.lock();
            state.polling = false;
            if !satisfied {
                state.predicate = Some(predicate);
                return;
            }
            (state.handle.take(), state.deferred.clone())
        };
        drop(predicate);
        if let Some(handle) = handle {
            self.scheduler.cancel_repeating(handle);
        }
        debug!("until condition satisfied");
        deferred.fulfill();
    }
}

impl IntoFuture for &Until {
    type Output = Result<(), TimingError>;
    type IntoFuture = Completion;

    fn into_future(self) -> Self::IntoFuture {
        self.completion()
    }
}
