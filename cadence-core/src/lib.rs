//! # cadence-core
//!
//! Cancellable time-driven primitives on top of a pluggable scheduler.
//!
//! ### Key Submodules:
//! - `scheduler`: the `Scheduler` contract shared by every clock
//! - `deterministic`: manually advanced scheduler for simulations and game loops
//! - `host`: tokio-backed scheduler using wall-clock time
//! - `interval` / `delay` / `until`: the primitives
//! - `timing`: facade holding the active scheduler
//!
//! ### Usage
//! ```
//! use cadence_core::prelude::*;
//!
//! let (timing, clock) = Timing::deterministic(0);
//! let interval = timing.interval(500, true);
//! interval.on_tick(|now| println!("tick at {now}"));
//! clock.advance(500);
//! ```

pub mod deferred;
pub mod delay;
pub mod deterministic;
pub mod error;
pub mod host;
pub mod interval;
pub mod scheduler;
pub mod signal;
pub mod timing;
pub mod until;

pub mod prelude {
    pub use crate::deferred::{Completion, Deferred, Settlement};
    pub use crate::delay::Delay;
    pub use crate::deterministic::{DeterministicScheduler, SchedulerStats, TickPolicy};
    pub use crate::error::TimingError;
    pub use crate::host::TokioScheduler;
    pub use crate::interval::Interval;
    pub use crate::scheduler::{Callback, Millis, Scheduler, TimerHandle};
    pub use crate::signal::{ListenerId, Signal};
    pub use crate::timing::Timing;
    pub use crate::until::Until;
}

pub use error::TimingError;
