//! ## cadence-core::deterministic
//! **Manually advanced scheduler**
//!
//! Time only moves when the owner calls [`DeterministicScheduler::advance`],
//! typically once per frame of a game loop or per step of a simulation.
//! No host timer is involved, so the same inputs always produce the same
//! firing sequence.
//!
//! ### Firing rules
//! - Every pass fires due repeating items first, then due one-shot items.
//! - Within each kind, items fire in handle generation order.
//! - Callbacks run without the internal lock held; they may schedule and
//!   cancel freely. Items created during a pass wait for the next pass.
//! - Under [`TickPolicy::CatchUp`] only items that existed when `advance`
//!   began produce intermediate passes; newer items wait for the final one.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::scheduler::{clamp, Callback, HandleGenerator, Millis, Scheduler, TimerHandle};

/// How a single `advance` treats repeating items that fell behind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TickPolicy {
    /// One pass at the target time: each due item fires at most once,
    /// however many periods elapsed.
    #[default]
    Step,
    /// Replays every elapsed due time in order, so a repeating item fires
    /// once per period and observes the exact tick time.
    CatchUp,
}

/// Point-in-time counters, consumed by telemetry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub now: Millis,
    pub pending_repeating: usize,
    pub pending_once: usize,
    pub fired_repeating: u64,
    pub fired_once: u64,
}

struct RepeatingItem {
    callback: Callback,
    period: Millis,
    due_at: Millis,
    /// Pass counter at scheduling time.
    born: u64,
}

struct OnceItem {
    callback: Callback,
    due_at: Millis,
    born: u64,
}

struct State {
    now: Millis,
    repeating: BTreeMap<TimerHandle, RepeatingItem>,
    once: BTreeMap<TimerHandle, OnceItem>,
    ids: HandleGenerator,
    passes: u64,
    fired_repeating: u64,
    fired_once: u64,
}

pub struct DeterministicScheduler {
    state: Mutex<State>,
    policy: TickPolicy,
}

impl DeterministicScheduler {
    /// Creates a scheduler whose clock reads `start_time` until advanced.
    pub fn new(start_time: Millis) -> Self {
        Self::with_policy(start_time, TickPolicy::default())
    }

    pub fn with_policy(start_time: Millis, policy: TickPolicy) -> Self {
        Self {
            state: Mutex::new(State {
                now: start_time,
                repeating: BTreeMap::new(),
                once: BTreeMap::new(),
                ids: HandleGenerator::new(),
                passes: 0,
                fired_repeating: 0,
                fired_once: 0,
            }),
            policy,
        }
    }

    pub fn policy(&self) -> TickPolicy {
        self.policy
    }

    /// Moves the clock by `delta` ms and fires everything that became due.
    ///
    /// A negative `delta` moves the clock backward; nothing fires that was
    /// not already due at the earlier time.
    pub fn advance(&self, delta: Millis) {
        let (target, horizon) = {
            let state = self.state.lock();
            (state.now.saturating_add(delta), state.passes)
        };
        trace!(delta, target, "advancing deterministic clock");

        if self.policy == TickPolicy::CatchUp {
            while let Some(at) = self.next_due_before(target, horizon) {
                self.run_pass(at, false);
            }
        }
        self.run_pass(target, true);
    }

    pub fn pending_repeating(&self) -> usize {
        self.state.lock().repeating.len()
    }

    pub fn pending_once(&self) -> usize {
        self.state.lock().once.len()
    }

    pub fn stats(&self) -> SchedulerStats {
        let state = self.state.lock();
        SchedulerStats {
            now: state.now,
            pending_repeating: state.repeating.len(),
            pending_once: state.once.len(),
            fired_repeating: state.fired_repeating,
            fired_once: state.fired_once,
        }
    }

    /// Earliest intermediate due time strictly before `target` among items
    /// scheduled before pass `horizon` ended. Zero-period items are due on
    /// every pass and only take part in the final one.
    fn next_due_before(&self, target: Millis, horizon: u64) -> Option<Millis> {
        let state = self.state.lock();
        state
            .repeating
            .values()
            .filter(|item| item.period > 0 && item.born <= horizon)
            .map(|item| item.due_at)
            .chain(
                state
                    .once
                    .values()
                    .filter(|item| item.born <= horizon)
                    .map(|item| item.due_at),
            )
            .filter(|&due_at| due_at < target)
            .min()
    }

    fn run_pass(&self, at: Millis, include_zero_period: bool) {
        let (repeating, once) = {
            let mut state = self.state.lock();
            state.now = at;
            state.passes += 1;
            let repeating: Vec<TimerHandle> = state
                .repeating
                .iter()
                .filter(|(_, item)| item.due_at <= at && (include_zero_period || item.period > 0))
                .map(|(handle, _)| *handle)
                .collect();
            let once: Vec<TimerHandle> = state
                .once
                .iter()
                .filter(|(_, item)| item.due_at <= at)
                .map(|(handle, _)| *handle)
                .collect();
            (repeating, once)
        };

        for handle in repeating {
            // An earlier callback in this pass may have cancelled it.
            let callback = {
                let mut state = self.state.lock();
                let Some(item) = state.repeating.get_mut(&handle) else {
                    continue;
                };
                item.due_at = at.saturating_add(item.period);
                let callback = Arc::clone(&item.callback);
                state.fired_repeating += 1;
                callback
            };
            trace!(%handle, at, "repeating timer fired");
            callback();
        }

        for handle in once {
            let callback = {
                let mut state = self.state.lock();
                let Some(item) = state.once.remove(&handle) else {
                    continue;
                };
                state.fired_once += 1;
                item.callback
            };
            trace!(%handle, at, "one-shot timer fired");
            callback();
        }
    }
}

impl Scheduler for DeterministicScheduler {
    fn now(&self) -> Millis {
        self.state.lock().now
    }

    fn schedule_repeating(&self, callback: Callback, period: Millis) -> TimerHandle {
        let period = clamp(period);
        let mut state = self.state.lock();
        let handle = state.ids.next_handle();
        let due_at = state.now.saturating_add(period);
        let born = state.passes;
        state.repeating.insert(
            handle,
            RepeatingItem {
                callback,
                period,
                due_at,
                born,
            },
        );
        trace!(%handle, period, due_at, "repeating timer scheduled");
        handle
    }

    fn cancel_repeating(&self, handle: TimerHandle) {
        if self.state.lock().repeating.remove(&handle).is_some() {
            trace!(%handle, "repeating timer cancelled");
        }
    }

    fn schedule_once(&self, callback: Callback, delay: Millis) -> TimerHandle {
        let mut state = self.state.lock();
        let handle = state.ids.next_handle();
        let due_at = state.now.saturating_add(clamp(delay));
        let born = state.passes;
        state.once.insert(
            handle,
            OnceItem {
                callback,
                due_at,
                born,
            },
        );
        trace!(%handle, due_at, "one-shot timer scheduled");
        handle
    }

    fn cancel_once(&self, handle: TimerHandle) {
        if self.state.lock().once.remove(&handle).is_some() {
            trace!(%handle, "one-shot timer cancelled");
        }
    }
}
