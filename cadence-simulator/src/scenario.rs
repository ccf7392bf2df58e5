//! YAML scenarios: named timers installed on a [`Timing`] facade.
//!
//! ```yaml
//! timers:
//!   - name: heartbeat
//!     kind: interval
//!     period_ms: 500
//!     cancel_after_ms: 3000
//!   - name: respawn
//!     kind: delay
//!     duration_ms: 1200
//!   - name: loading
//!     kind: until
//!     polls: 5
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use cadence_core::prelude::*;

use crate::error::SimulationError;
use crate::trace::{Trace, TraceKind};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub timers: Vec<TimerEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimerEntry {
    pub name: String,
    #[serde(flatten)]
    pub spec: TimerSpec,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerSpec {
    Interval {
        period_ms: Millis,
        #[serde(default)]
        cancel_after_ms: Option<Millis>,
    },
    Delay {
        duration_ms: Millis,
        #[serde(default = "default_true")]
        reject_on_cancel: bool,
        #[serde(default)]
        cancel_after_ms: Option<Millis>,
    },
    /// Condition becomes true on the `polls`-th poll.
    Until { polls: usize },
    /// Condition holds for the first `polls - 1` polls.
    While { polls: usize },
}

fn default_true() -> bool {
    true
}

impl Scenario {
    pub fn from_yaml(source: &str) -> Result<Self, SimulationError> {
        let scenario: Scenario = serde_yaml::from_str(source)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, SimulationError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }

    pub fn to_yaml(&self) -> Result<String, SimulationError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Built-in scenario used when no file is given.
    pub fn demo() -> Self {
        Self {
            timers: vec![
                TimerEntry {
                    name: "heartbeat".into(),
                    spec: TimerSpec::Interval {
                        period_ms: 250,
                        cancel_after_ms: Some(2_000),
                    },
                },
                TimerEntry {
                    name: "respawn".into(),
                    spec: TimerSpec::Delay {
                        duration_ms: 1_000,
                        reject_on_cancel: true,
                        cancel_after_ms: None,
                    },
                },
                TimerEntry {
                    name: "abandoned".into(),
                    spec: TimerSpec::Delay {
                        duration_ms: 5_000,
                        reject_on_cancel: true,
                        cancel_after_ms: Some(1_500),
                    },
                },
                TimerEntry {
                    name: "loading".into(),
                    spec: TimerSpec::Until { polls: 30 },
                },
                TimerEntry {
                    name: "cooldown".into(),
                    spec: TimerSpec::While { polls: 45 },
                },
            ],
        }
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        let mut names = HashSet::new();
        for entry in &self.timers {
            if entry.name.trim().is_empty() {
                return Err(SimulationError::InvalidScenario(
                    "timer names must not be empty".into(),
                ));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(SimulationError::InvalidScenario(format!(
                    "duplicate timer name '{}'",
                    entry.name
                )));
            }
            match entry.spec {
                TimerSpec::Until { polls } | TimerSpec::While { polls } if polls == 0 => {
                    return Err(SimulationError::InvalidScenario(format!(
                        "timer '{}' needs at least one poll",
                        entry.name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Creates every timer on `timing`, recording activity into `trace`.
    pub fn install(&self, timing: &Timing, trace: &Trace) -> Installation {
        let scheduler = timing.scheduler();
        let mut installation = Installation::default();

        for entry in &self.timers {
            let name = entry.name.clone();
            match entry.spec {
                TimerSpec::Interval {
                    period_ms,
                    cancel_after_ms,
                } => {
                    let interval = timing.interval(period_ms, false);
                    let ticks = trace.clone();
                    let timer = name.clone();
                    interval.on_tick(move |now| ticks.record(*now, &timer, TraceKind::Tick));
                    interval.start();

                    if let Some(after) = cancel_after_ms {
                        let target = interval.clone();
                        cancel_later(&scheduler, trace, &name, after, move || target.cancel());
                    }
                    installation.intervals.push(interval);
                }
                TimerSpec::Delay {
                    duration_ms,
                    reject_on_cancel,
                    cancel_after_ms,
                } => {
                    let delay = timing.delay(duration_ms, reject_on_cancel, false);
                    let completion = delay.start();
                    if let Some(after) = cancel_after_ms {
                        let target = delay.clone();
                        cancel_later(&scheduler, trace, &name, after, move || target.cancel());
                    }
                    installation.watches.push(Watch::new(name, completion));
                    installation.delays.push(delay);
                }
                TimerSpec::Until { polls } => {
                    let mut count = 0;
                    let until = timing.until(
                        move || {
                            count += 1;
                            count >= polls
                        },
                        false,
                    );
                    installation.watches.push(Watch::new(name, until.start()));
                    installation.untils.push(until);
                }
                TimerSpec::While { polls } => {
                    let mut count = 0;
                    let until = timing.while_(
                        move || {
                            count += 1;
                            count < polls
                        },
                        false,
                    );
                    installation.watches.push(Watch::new(name, until.start()));
                    installation.untils.push(until);
                }
            }
        }
        installation
    }
}

/// Schedules a one-shot `after` ms from installation that cancels a timer
/// and records it.
fn cancel_later<F>(scheduler: &Arc<dyn Scheduler>, trace: &Trace, name: &str, after: Millis, cancel: F)
where
    F: Fn() + Send + Sync + 'static,
{
    let trace = trace.clone();
    let timer = name.to_string();
    let clock = Arc::clone(scheduler);
    scheduler.schedule_once(
        Arc::new(move || {
            cancel();
            trace.record(clock.now(), &timer, TraceKind::Cancelled);
        }),
        after,
    );
}

/// Settlement observer for one awaitable timer.
pub struct Watch {
    pub timer: String,
    completion: Completion,
    reported: bool,
}

impl Watch {
    fn new(timer: String, completion: Completion) -> Self {
        Self {
            timer,
            completion,
            reported: false,
        }
    }

    /// Records the settlement the first time it is observed.
    fn check(&mut self, now: Millis, trace: &Trace) {
        if self.reported {
            return;
        }
        let kind = match self.completion.state() {
            Settlement::Pending => return,
            Settlement::Fulfilled => TraceKind::Fulfilled,
            Settlement::Rejected(_) => TraceKind::Rejected,
        };
        self.reported = true;
        trace.record(now, &self.timer, kind);
    }
}

/// Live timers created from a scenario.
#[derive(Default)]
pub struct Installation {
    pub intervals: Vec<Interval>,
    pub delays: Vec<Delay>,
    pub untils: Vec<Until>,
    pub watches: Vec<Watch>,
}

impl Installation {
    /// Reports settlements observed since the last call.
    pub fn observe(&mut self, now: Millis, trace: &Trace) {
        for watch in &mut self.watches {
            watch.check(now, trace);
        }
    }

    /// True once every delay/until has settled and no interval is running.
    pub fn is_quiescent(&self) -> bool {
        self.watches.iter().all(|watch| watch.reported)
            && self.intervals.iter().all(|interval| !interval.is_running())
    }

    /// Cancels whatever is still running.
    pub fn shutdown(&self) {
        for interval in &self.intervals {
            interval.cancel();
        }
        for delay in self.delays.iter().filter(|delay| delay.is_running()) {
            delay.cancel();
        }
    }
}
