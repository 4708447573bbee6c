//! Deferred callbacks: one-shot delays and cancellable repeating timers.
//!
//! [`TokioScheduler`] runs callbacks on a tokio runtime. [`ManualScheduler`]
//! is a virtual clock that only moves when told to, which makes timing
//! fully deterministic.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use swirl_core::{Error, Result};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Callback fired once.
pub type OnceTask = Box<dyn FnOnce() + Send + 'static>;

/// Callback fired on every tick of a repeating timer.
pub type RepeatingTask = Box<dyn FnMut() + Send + 'static>;

/// Identifies a repeating timer so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Deferred callback capability.
///
/// Callbacks registered with a shorter delay fire before those with a
/// longer one. Absolute firing time is best-effort.
pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`. One-shots cannot be cancelled.
    fn schedule_once(&self, delay: Duration, task: OnceTask);

    /// Run `task` every `period`, first after one full period.
    fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> TimerId;

    /// Stop a repeating timer. Returns false if it was not active.
    fn cancel(&self, id: TimerId) -> bool;
}

/// Scheduler backed by tokio timers.
pub struct TokioScheduler {
    runtime: Handle,
    next_id: AtomicU64,
    timers: Mutex<HashMap<TimerId, AbortHandle>>,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Use the runtime of the calling context.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| Error::Scheduler(format!("No tokio runtime available: {e}")))?;
        Ok(Self::new(handle))
    }

    /// Number of repeating timers that have not been cancelled.
    pub fn active_repeating(&self) -> usize {
        self.timers.lock().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, delay: Duration, task: OnceTask) {
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }

    fn schedule_repeating(&self, period: Duration, mut task: RepeatingTask) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let handle = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task();
            }
        });

        self.timers.lock().insert(id, handle.abort_handle());
        debug!("Repeating timer {:?} installed, period {:?}", id, period);
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        match self.timers.lock().remove(&id) {
            Some(handle) => {
                handle.abort();
                debug!("Repeating timer {:?} cancelled", id);
                true
            }
            None => false,
        }
    }
}

enum Job {
    Once(OnceTask),
    Repeating {
        id: TimerId,
        period: Duration,
        task: RepeatingTask,
    },
}

struct Entry {
    deadline: Duration,
    seq: u64,
    job: Job,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    seq: u64,
    next_id: u64,
    queue: Vec<Entry>,
    active: HashSet<TimerId>,
}

impl ManualState {
    fn push(&mut self, deadline: Duration, job: Job) {
        self.seq += 1;
        self.queue.push(Entry {
            deadline,
            seq: self.seq,
            job,
        });
    }

    /// Remove the earliest entry due at or before `until`.
    fn pop_due(&mut self, until: Duration) -> Option<Entry> {
        let index = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.deadline <= until)
            .min_by_key(|(_, entry)| (entry.deadline, entry.seq))
            .map(|(index, _)| index)?;
        Some(self.queue.swap_remove(index))
    }
}

/// Virtual-clock scheduler.
///
/// Time starts at zero and only moves through [`ManualScheduler::advance`].
/// Callbacks run on the caller's thread with no lock held, so they may
/// schedule or cancel further work.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of queued callbacks, including repeating timers.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Number of repeating timers that have not been cancelled.
    pub fn active_repeating(&self) -> usize {
        self.state.lock().active.len()
    }

    /// Fire everything that is due right now.
    pub fn run_pending(&self) {
        self.advance(Duration::ZERO);
    }

    /// Move the clock forward, firing due callbacks in deadline order.
    pub fn advance(&self, by: Duration) {
        let target = self.state.lock().now + by;

        loop {
            let entry = {
                let mut state = self.state.lock();
                let Some(entry) = state.pop_due(target) else {
                    break;
                };
                state.now = state.now.max(entry.deadline);
                entry
            };

            trace!("Virtual timer fired at {:?}", entry.deadline);

            match entry.job {
                Job::Once(task) => task(),
                Job::Repeating {
                    id,
                    period,
                    mut task,
                } => {
                    if !self.state.lock().active.contains(&id) {
                        continue;
                    }
                    task();
                    let mut state = self.state.lock();
                    if state.active.contains(&id) {
                        state.push(
                            entry.deadline + period,
                            Job::Repeating { id, period, task },
                        );
                    }
                }
            }
        }

        let mut state = self.state.lock();
        state.now = state.now.max(target);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, delay: Duration, task: OnceTask) {
        let mut state = self.state.lock();
        let deadline = state.now + delay;
        state.push(deadline, Job::Once(task));
    }

    fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> TimerId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = TimerId(state.next_id);
        let deadline = state.now + period;
        state.active.insert(id);
        state.push(deadline, Job::Repeating { id, period, task });
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        let mut state = self.state.lock();
        if !state.active.remove(&id) {
            return false;
        }
        state.queue.retain(|entry| match entry.job {
            Job::Repeating { id: queued, .. } => queued != id,
            Job::Once(_) => true,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn recorder() -> (Arc<Mutex<Vec<u64>>>, impl Fn(u64) -> OnceTask) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        let make = move |label: u64| -> OnceTask {
            let sink = sink.clone();
            Box::new(move || sink.lock().push(label))
        };
        (fired, make)
    }

    #[test]
    fn test_manual_once_fires_in_delay_order() {
        let scheduler = ManualScheduler::new();
        let (fired, task) = recorder();

        scheduler.schedule_once(ms(300), task(3));
        scheduler.schedule_once(ms(0), task(1));
        scheduler.schedule_once(ms(150), task(2));

        scheduler.advance(ms(149));
        assert_eq!(*fired.lock(), vec![1]);

        scheduler.advance(ms(200));
        assert_eq!(*fired.lock(), vec![1, 2, 3]);
        assert_eq!(scheduler.now(), ms(349));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_manual_equal_deadlines_keep_registration_order() {
        let scheduler = ManualScheduler::new();
        let (fired, task) = recorder();
        for label in 0..5 {
            scheduler.schedule_once(ms(10), task(label));
        }
        scheduler.advance(ms(10));
        assert_eq!(*fired.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_manual_repeating_and_cancel() {
        let scheduler = ManualScheduler::new();
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = ticks.clone();
        let id = scheduler.schedule_repeating(
            ms(800),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        scheduler.advance(ms(799));
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        scheduler.advance(ms(1601));
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        scheduler.advance(ms(5000));
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.active_repeating(), 0);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_manual_callbacks_can_schedule_more_work() {
        let scheduler = Arc::new(ManualScheduler::new());
        let (fired, task) = recorder();
        let inner = task(2);
        let first = task(1);
        let nested = scheduler.clone();
        scheduler.schedule_once(
            ms(100),
            Box::new(move || {
                first();
                nested.schedule_once(ms(250), inner);
            }),
        );

        scheduler.advance(ms(349));
        assert_eq!(*fired.lock(), vec![1]);
        scheduler.advance(ms(1));
        assert_eq!(*fired.lock(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_once_fires_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let (fired, task) = recorder();

        scheduler.schedule_once(ms(150), task(2));
        scheduler.schedule_once(ms(0), task(1));

        tokio::time::sleep(ms(100)).await;
        assert_eq!(*fired.lock(), vec![1]);

        tokio::time::sleep(ms(100)).await;
        assert_eq!(*fired.lock(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_repeating_and_cancel() {
        let scheduler = TokioScheduler::current().unwrap();
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = ticks.clone();
        let id = scheduler.schedule_repeating(
            ms(800),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(scheduler.active_repeating(), 1);

        tokio::time::sleep(ms(700)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(ms(1000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        assert!(scheduler.cancel(id));
        tokio::time::sleep(ms(5000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.active_repeating(), 0);
    }

    #[test]
    fn test_tokio_current_outside_runtime() {
        let err = TokioScheduler::current().err().unwrap();
        assert!(matches!(err, Error::Scheduler(_)));
    }
}
