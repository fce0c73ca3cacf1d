//! Heal timers: at most one pending auto-heal callback per fuse name.
//!
//! The registry arms a timer on every OK→Blown edge and cancels it on reset or
//! reinstall. Timers carry no knowledge of fuse state; the callback they run
//! decides whether a heal still applies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::warn;

const TARGET: &str = "fusebox::scheduler";

/// Callback run when a heal timer fires.
pub type HealTask = Box<dyn FnOnce() + Send + 'static>;

/// Schedules and cancels one pending heal callback per fuse name.
pub trait HealScheduler: Send + Sync + std::fmt::Debug {
    /// Arm `task` to run after `delay`, replacing any timer already armed for `name`.
    fn schedule(&self, name: &str, delay: Duration, task: HealTask);
    /// Disarm the timer for `name`. Unknown or already-fired timers are ignored.
    fn cancel(&self, name: &str);
}

impl<S: HealScheduler + ?Sized> HealScheduler for Arc<S> {
    fn schedule(&self, name: &str, delay: Duration, task: HealTask) {
        (**self).schedule(name, delay, task)
    }

    fn cancel(&self, name: &str) {
        (**self).cancel(name)
    }
}

/// How a spawned heal timer waits out its delay.
///
/// The wait is always started inside the spawned task, so arming a timer never
/// needs the caller to be running on the runtime.
#[derive(Debug, Clone, Default)]
pub enum HealWait {
    /// `tokio::time::sleep` for the full reset delay.
    #[default]
    Sleep,
    /// Heal as soon as the timer task is polled.
    Immediate,
    /// Heal immediately, logging each armed delay.
    Logged(DelayLog),
}

impl HealWait {
    async fn wait(self, delay: Duration) {
        match self {
            HealWait::Sleep => tokio::time::sleep(delay).await,
            HealWait::Immediate | HealWait::Logged(_) => {}
        }
    }
}

/// Shared record of the delays a [`HealWait::Logged`] scheduler was asked to arm.
#[derive(Debug, Clone, Default)]
pub struct DelayLog {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl DelayLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Armed delays, oldest first.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }

    fn record(&self, delay: Duration) {
        self.delays.lock().push(delay);
    }
}

/// Heal scheduler that spawns one tokio task per armed timer.
///
/// The runtime handle is captured at construction when one is available, and
/// looked up again on each `schedule` otherwise. Any thread may arm a timer
/// once a handle is known. Without any runtime the timer is dropped with a
/// warning; the registry still heals the fuse lazily on the next synced read
/// once the reset delay has passed.
#[derive(Debug, Clone)]
pub struct TokioHealScheduler {
    inner: Arc<TokioTimers>,
}

#[derive(Debug)]
struct TokioTimers {
    handle: Option<Handle>,
    wait: HealWait,
    next_id: AtomicU64,
    pending: Mutex<HashMap<String, PendingTimer>>,
}

#[derive(Debug)]
struct PendingTimer {
    id: u64,
    abort: AbortHandle,
}

impl Default for TokioHealScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioHealScheduler {
    /// Scheduler sleeping on tokio time, on the current runtime if any.
    pub fn new() -> Self {
        Self::with_wait(HealWait::Sleep)
    }

    /// Scheduler whose timers wait according to `wait`.
    pub fn with_wait(wait: HealWait) -> Self {
        Self::build(Handle::try_current().ok(), wait)
    }

    /// Spawn timers on `handle` rather than the ambient runtime.
    pub fn with_handle(self, handle: Handle) -> Self {
        Self::build(Some(handle), self.inner.wait.clone())
    }

    /// Number of timers armed and not yet fired or cancelled.
    pub fn pending(&self) -> usize {
        self.inner.pending.lock().len()
    }

    fn build(handle: Option<Handle>, wait: HealWait) -> Self {
        Self {
            inner: Arc::new(TokioTimers {
                handle,
                wait,
                next_id: AtomicU64::new(0),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn runtime(&self) -> Option<Handle> {
        self.inner.handle.clone().or_else(|| Handle::try_current().ok())
    }
}

impl HealScheduler for TokioHealScheduler {
    fn schedule(&self, name: &str, delay: Duration, task: HealTask) {
        let Some(runtime) = self.runtime() else {
            warn!(
                target: TARGET,
                fuse = %name,
                ?delay,
                "no tokio runtime available; heal timer not armed"
            );
            return;
        };

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let key = name.to_owned();
        let timers: Weak<TokioTimers> = Arc::downgrade(&self.inner);
        let wait = self.inner.wait.clone();
        if let HealWait::Logged(log) = &wait {
            log.record(delay);
        }

        // Held across spawn so the task cannot observe the map before its own entry lands.
        let mut pending = self.inner.pending.lock();
        let join = runtime.spawn({
            let key = key.clone();
            async move {
                wait.wait(delay).await;
                let Some(timers) = timers.upgrade() else {
                    return;
                };
                let current = {
                    let mut pending = timers.pending.lock();
                    match pending.get(&key) {
                        Some(timer) if timer.id == id => pending.remove(&key).is_some(),
                        _ => false,
                    }
                };
                if current {
                    task();
                }
            }
        });
        if let Some(previous) = pending.insert(key, PendingTimer { id, abort: join.abort_handle() }) {
            previous.abort.abort();
        }
    }

    fn cancel(&self, name: &str) {
        if let Some(timer) = self.inner.pending.lock().remove(name) {
            timer.abort.abort();
        }
    }
}
