//! Clock abstractions used by fuses for melt windows and heal deadlines.
//!
//! Production code reads [`MonotonicClock`]. Tests and simulations use
//! [`VirtualClock`], which only moves when [`VirtualClock::elapse`] is called and
//! doubles as the heal scheduler so timers fire deterministically.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::scheduler::{HealScheduler, HealTask};

/// Clock abstraction so timing can be faked in tests.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Milliseconds since an arbitrary, fixed origin. Never decreases.
    fn now_millis(&self) -> u64;

    /// Scheduler firing heal timers on this clock's own timeline.
    ///
    /// `None` (the default) means the clock follows real time and tokio timers
    /// are a faithful match.
    fn heal_scheduler(&self) -> Option<Arc<dyn HealScheduler>> {
        None
    }
}

/// Monotonic clock backed by `Instant::now()`.
///
/// Notes: resets when the process restarts, which matches fuse state being
/// in-memory only.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self { start: Instant::now() }
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

pub(crate) fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Manually driven clock and heal scheduler.
///
/// Time starts at zero. Clones share the same timeline, so a test can keep one
/// handle while the registry owns another.
///
/// ```
/// use fusebox::{Clock, VirtualClock};
/// use std::time::Duration;
///
/// let clock = VirtualClock::new();
/// clock.elapse(Duration::from_millis(1500));
/// assert_eq!(clock.now_millis(), 1500);
/// ```
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    inner: Arc<VirtualInner>,
}

#[derive(Default)]
struct VirtualInner {
    now: AtomicU64,
    timers: Mutex<VirtualTimers>,
}

impl std::fmt::Debug for VirtualInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualInner")
            .field("now", &self.now.load(Ordering::Acquire))
            .field("pending", &self.timers.lock().by_name.len())
            .finish()
    }
}

/// Pending timers keyed by `(deadline, sequence)` so equal deadlines keep
/// their arming order.
#[derive(Default)]
struct VirtualTimers {
    next_seq: u64,
    by_name: HashMap<String, (u64, u64)>,
    queue: BTreeMap<(u64, u64), (String, HealTask)>,
}

impl VirtualTimers {
    fn remove(&mut self, name: &str) {
        if let Some(key) = self.by_name.remove(name) {
            self.queue.remove(&key);
        }
    }

    fn pop_due(&mut self, until: u64) -> Option<(u64, HealTask)> {
        let key = *self.queue.keys().next()?;
        if key.0 > until {
            return None;
        }
        let (name, task) = self.queue.remove(&key)?;
        self.by_name.remove(&name);
        Some((key.0, task))
    }
}

impl VirtualClock {
    /// Create a clock at time zero with no pending timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance time by `by`, firing every timer that falls due on the way.
    ///
    /// Timers fire in deadline order with the clock set to their deadline, so a
    /// heal callback observes the same `now` it would have seen in real time.
    /// Callbacks run on the calling thread with no scheduler lock held.
    pub fn elapse(&self, by: Duration) {
        let target = self.now_millis().saturating_add(duration_millis(by));
        loop {
            let due = self.inner.timers.lock().pop_due(target);
            match due {
                Some((deadline, task)) => {
                    self.inner.now.fetch_max(deadline, Ordering::AcqRel);
                    task();
                }
                None => break,
            }
        }
        self.inner.now.fetch_max(target, Ordering::AcqRel);
    }

    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        self.inner.timers.lock().by_name.len()
    }

    /// Deadline of the timer armed for `name`, if any.
    pub fn deadline(&self, name: &str) -> Option<u64> {
        self.inner.timers.lock().by_name.get(name).map(|(deadline, _)| *deadline)
    }
}

impl Clock for VirtualClock {
    fn now_millis(&self) -> u64 {
        self.inner.now.load(Ordering::Acquire)
    }

    fn heal_scheduler(&self) -> Option<Arc<dyn HealScheduler>> {
        Some(Arc::new(self.clone()))
    }
}

impl HealScheduler for VirtualClock {
    fn schedule(&self, name: &str, delay: Duration, task: HealTask) {
        let deadline = self.now_millis().saturating_add(duration_millis(delay));
        let mut timers = self.inner.timers.lock();
        timers.remove(name);
        let seq = timers.next_seq;
        timers.next_seq += 1;
        timers.by_name.insert(name.to_owned(), (deadline, seq));
        timers.queue.insert((deadline, seq), (name.to_owned(), task));
    }

    fn cancel(&self, name: &str) {
        self.inner.timers.lock().remove(name);
    }
}
