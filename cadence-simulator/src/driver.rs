//! Fixed-step loop driver for a [`DeterministicScheduler`].
//!
//! Each step advances the clock by `step_ms` plus a jitter drawn from a
//! seeded generator, so a frame loop with uneven frame times can be replayed
//! exactly from its seed.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use cadence_core::deterministic::DeterministicScheduler;
use cadence_core::scheduler::{Millis, Scheduler};

pub struct LoopDriver {
    clock: Arc<DeterministicScheduler>,
    step_ms: Millis,
    jitter_ms: Millis,
    rng: StdRng,
    steps_taken: usize,
}

impl LoopDriver {
    pub fn new(clock: Arc<DeterministicScheduler>, step_ms: Millis, jitter_ms: Millis, seed: u64) -> Self {
        Self {
            clock,
            step_ms: step_ms.max(0),
            jitter_ms: jitter_ms.max(0),
            rng: StdRng::seed_from_u64(seed),
            steps_taken: 0,
        }
    }

    pub fn clock(&self) -> &Arc<DeterministicScheduler> {
        &self.clock
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Advances one frame and returns the delta applied.
    pub fn step(&mut self) -> Millis {
        let jitter = if self.jitter_ms > 0 {
            self.rng.random_range(0..=self.jitter_ms)
        } else {
            0
        };
        let delta = self.step_ms.saturating_add(jitter);
        self.clock.advance(delta);
        self.steps_taken += 1;
        trace!(step = self.steps_taken, delta, now = self.clock.now(), "loop step");
        delta
    }

    /// Runs `steps` frames, handing the clock time to `on_step` after each.
    pub fn run<F>(&mut self, steps: usize, mut on_step: F)
    where
        F: FnMut(Millis),
    {
        for _ in 0..steps {
            self.step();
            on_step(self.clock.now());
        }
    }

    /// Steps until `done` holds or `max_steps` frames have run. Returns the
    /// number of frames taken, or `None` if the condition never held.
    pub fn run_until<F>(&mut self, mut done: F, max_steps: usize) -> Option<usize>
    where
        F: FnMut(Millis) -> bool,
    {
        for taken in 1..=max_steps {
            self.step();
            if done(self.clock.now()) {
                return Some(taken);
            }
        }
        None
    }
}
