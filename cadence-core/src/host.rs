//! ## cadence-core::host
//! **Wall-clock scheduler backed by tokio timers**
//!
//! Every schedule call spawns a task on the captured runtime; cancelling
//! aborts it. Nothing here is deterministic, which is why simulations use
//! [`crate::deterministic::DeterministicScheduler`] instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::trace;

use crate::error::TimingError;
use crate::scheduler::{clamp, Callback, HandleGenerator, Millis, Scheduler, TimerHandle};

/// tokio rejects zero-length intervals; "every tick" becomes every millisecond.
const MIN_REPEAT: Duration = Duration::from_millis(1);

struct Tasks {
    ids: HandleGenerator,
    repeating: HashMap<TimerHandle, JoinHandle<()>>,
    once: HashMap<TimerHandle, JoinHandle<()>>,
}

pub struct TokioScheduler {
    runtime: Handle,
    tasks: Arc<Mutex<Tasks>>,
}

impl TokioScheduler {
    /// Binds to the runtime of the calling context.
    pub fn new() -> Result<Self, TimingError> {
        Handle::try_current()
            .map(Self::with_handle)
            .map_err(|_| TimingError::NoRuntime)
    }

    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            tasks: Arc::new(Mutex::new(Tasks {
                ids: HandleGenerator::new(),
                repeating: HashMap::new(),
                once: HashMap::new(),
            })),
        }
    }

    pub fn pending_repeating(&self) -> usize {
        self.tasks.lock().repeating.len()
    }

    pub fn pending_once(&self) -> usize {
        self.tasks
            .lock()
            .once
            .values()
            .filter(|task| !task.is_finished())
            .count()
    }
}

fn to_duration(ms: Millis) -> Duration {
    Duration::from_millis(clamp(ms).unsigned_abs())
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Millis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }

    fn schedule_repeating(&self, callback: Callback, period: Millis) -> TimerHandle {
        let period = to_duration(period).max(MIN_REPEAT);
        // Hold the lock across spawn so the task is registered before it can run.
        let mut tasks = self.tasks.lock();
        let handle = tasks.ids.next_handle();
        let task = self.runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                callback();
            }
        });
        tasks.repeating.insert(handle, task);
        trace!(%handle, ?period, "host repeating timer scheduled");
        handle
    }

    fn cancel_repeating(&self, handle: TimerHandle) {
        if let Some(task) = self.tasks.lock().repeating.remove(&handle) {
            task.abort();
            trace!(%handle, "host repeating timer cancelled");
        }
    }

    fn schedule_once(&self, callback: Callback, delay: Millis) -> TimerHandle {
        let delay = to_duration(delay);
        let mut tasks = self.tasks.lock();
        let handle = tasks.ids.next_handle();
        let registry = Arc::clone(&self.tasks);
        let task = self.runtime.spawn(async move {
            sleep(delay).await;
            // Forget the handle first so a cancel from inside the callback is a no-op.
            registry.lock().once.remove(&handle);
            callback();
        });
        tasks.once.insert(handle, task);
        trace!(%handle, ?delay, "host one-shot timer scheduled");
        handle
    }

    fn cancel_once(&self, handle: TimerHandle) {
        if let Some(task) = self.tasks.lock().once.remove(&handle) {
            task.abort();
            trace!(%handle, "host one-shot timer cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        (
            count,
            Arc::new(move || {
                sink.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn requires_a_runtime() {
        assert_eq!(TokioScheduler::new().err(), Some(TimingError::NoRuntime));
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_fires_after_delay() {
        let scheduler = TokioScheduler::new().unwrap();
        let (count, callback) = counter();
        scheduler.schedule_once(callback, 100);

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_once(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_fires_every_period() {
        let scheduler = TokioScheduler::new().unwrap();
        let (count, callback) = counter();
        let handle = scheduler.schedule_repeating(callback, 50);

        tokio::time::sleep(Duration::from_millis(175)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        scheduler.cancel_repeating(handle);
        scheduler.cancel_repeating(handle);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_one_shot_never_fires() {
        let scheduler = TokioScheduler::new().unwrap();
        let (count, callback) = counter();
        let handle = scheduler.schedule_once(callback, 10);
        scheduler.cancel_once(handle);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn now_reports_wall_clock() {
        let scheduler = TokioScheduler::new().unwrap();
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as i64;
        assert!((scheduler.now() - wall).abs() < 1_000);
    }
}
