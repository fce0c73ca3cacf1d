//! Registry of named fuses.
//!
//! Every fuse lives behind its own mutex, so operations on one name are
//! serialized while different names proceed in parallel. The name map itself is
//! only write-locked to insert a brand-new name.
//!
//! Reads come in two flavours (see [`Consistency`]): synced reads go through the
//! fuse's mutex and therefore observe every write the caller made before, while
//! relaxed reads sample a lock-free status mirror.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, MonotonicClock, VirtualClock};
use crate::config::FuseConfig;
use crate::error::{FuseError, RunError};
use crate::guard::Verdict;
use crate::scheduler::{HealScheduler, TokioHealScheduler};
use crate::state::{FuseSnapshot, FuseState, FuseStatus};
use crate::telemetry::{EventSink, FuseEvent, HealCause, NullSink};

const TARGET: &str = "fusebox::registry";

/// How strongly a read must be ordered against earlier writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Consistency {
    /// Take the fuse's lock: sees every melt/reset/install issued before the
    /// call, and heals a fuse whose reset delay has already passed.
    #[default]
    Synced,
    /// Read the last published status without locking. May lag a concurrent
    /// writer and never heals.
    Relaxed,
}

#[derive(Debug)]
struct FuseCell {
    state: Mutex<FuseState>,
    status: AtomicU8,
}

impl FuseCell {
    fn new(config: FuseConfig) -> Self {
        Self {
            state: Mutex::new(FuseState::new(config)),
            status: AtomicU8::new(FuseStatus::Ok.to_u8()),
        }
    }

    fn publish(&self, status: FuseStatus) {
        self.status.store(status.to_u8(), Ordering::Release);
    }

    fn relaxed_status(&self) -> FuseStatus {
        FuseStatus::from_u8(self.status.load(Ordering::Acquire))
    }
}

#[derive(Debug)]
struct RegistryInner {
    fuses: RwLock<HashMap<String, Arc<FuseCell>>>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn HealScheduler>,
    sink: Arc<dyn EventSink>,
}

impl RegistryInner {
    fn cell(&self, name: &str) -> Result<Arc<FuseCell>, FuseError> {
        self.fuses.read().get(name).cloned().ok_or_else(|| FuseError::not_found(name))
    }

    /// Existing cell for `name`, or a fresh one holding `config`. The flag is
    /// `true` when the cell already existed and still needs reinstalling.
    fn cell_for_install(&self, name: &str, config: FuseConfig) -> (Arc<FuseCell>, bool) {
        let existing = self.fuses.read().get(name).cloned();
        if let Some(cell) = existing {
            return (cell, true);
        }
        match self.fuses.write().entry(name.to_owned()) {
            Entry::Occupied(entry) => (entry.get().clone(), true),
            Entry::Vacant(entry) => (entry.insert(Arc::new(FuseCell::new(config))).clone(), false),
        }
    }

    /// Run `read` under the fuse's lock after healing it if its reset delay
    /// has already run out (a heal timer that was lost or is late).
    fn with_synced<R>(
        &self,
        name: &str,
        cell: &FuseCell,
        read: impl FnOnce(&FuseState, u64) -> R,
    ) -> R {
        let now = self.clock.now_millis();
        let (value, healed) = {
            let mut state = cell.state.lock();
            let healed = state.heal_overdue(now) && {
                let epoch = state.epoch();
                state.heal(epoch)
            };
            if healed {
                cell.publish(state.status());
                self.scheduler.cancel(name);
            }
            (read(&state, now), healed)
        };
        if healed {
            info!(target: TARGET, fuse = %name, "overdue fuse healed on read");
            self.emit(FuseEvent::Healed { name: name.to_owned(), cause: HealCause::Overdue });
        }
        value
    }

    /// Heal-timer callback for the trip that produced `epoch`.
    fn heal(&self, name: &str, epoch: u64) {
        let Some(cell) = self.fuses.read().get(name).cloned() else {
            return;
        };
        let healed = {
            let mut state = cell.state.lock();
            let healed = state.heal(epoch);
            if healed {
                cell.publish(state.status());
            }
            healed
        };
        if healed {
            info!(target: TARGET, fuse = %name, "fuse healed");
            self.emit(FuseEvent::Healed { name: name.to_owned(), cause: HealCause::Timer });
        } else {
            debug!(target: TARGET, fuse = %name, "stale heal timer ignored");
        }
    }

    fn emit(&self, event: FuseEvent) {
        self.sink.emit(event);
    }
}

/// Named fuses sharing one clock, heal scheduler and event sink.
///
/// Clones share the same fuses. Create one per application (or per test) and
/// pass it around; there is no global instance.
///
/// # Examples
/// ```
/// use fusebox::{FuseConfig, FuseRegistry, FuseStatus, VirtualClock};
/// use std::time::Duration;
///
/// let clock = VirtualClock::new();
/// let fuses = FuseRegistry::with_virtual_clock(clock.clone());
/// fuses.install("db", FuseConfig::from_millis(3, 1000, 60_000).unwrap()).unwrap();
///
/// for _ in 0..3 {
///     fuses.melt("db").unwrap();
///     clock.elapse(Duration::from_millis(100));
/// }
/// assert_eq!(fuses.ask("db").unwrap(), FuseStatus::Blown);
///
/// clock.elapse(Duration::from_secs(60));
/// assert_eq!(fuses.ask("db").unwrap(), FuseStatus::Ok);
/// ```
#[derive(Debug, Clone)]
pub struct FuseRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for FuseRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FuseRegistry {
    /// Registry on the monotonic clock with tokio heal timers and no event sink.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> FuseRegistryBuilder {
        FuseRegistryBuilder::default()
    }

    /// Registry whose time and heal timers are both driven by `clock`.
    pub fn with_virtual_clock(clock: VirtualClock) -> Self {
        Self::builder().virtual_clock(clock).build()
    }

    /// Install a fuse, or reinstall an existing one in place.
    ///
    /// Accepts a validated [`FuseConfig`] or raw [`FuseOptions`](crate::FuseOptions).
    /// Invalid input is rejected before any state is touched. Reinstalling
    /// clears melt history, sets the status to OK and cancels a pending heal,
    /// whatever the fuse's prior status.
    pub fn install<C>(&self, name: impl Into<String>, config: C) -> Result<(), FuseError>
    where
        C: TryInto<FuseConfig>,
        FuseError: From<C::Error>,
    {
        let name = name.into();
        let config = config.try_into().map_err(|e| {
            let err = FuseError::from(e);
            warn!(target: TARGET, fuse = %name, error = %err, "fuse install rejected");
            err
        })?;

        let (cell, replaced) = self.inner.cell_for_install(&name, config);
        if replaced {
            let mut state = cell.state.lock();
            state.reinstall(config);
            cell.publish(state.status());
            self.inner.scheduler.cancel(&name);
            drop(state);
            warn!(target: TARGET, fuse = %name, "fuse reinstalled; previous state discarded");
        } else {
            info!(
                target: TARGET,
                fuse = %name,
                max_melts = config.max_melts(),
                period = ?config.period(),
                reset_delay = ?config.reset_delay(),
                "fuse installed"
            );
        }
        self.inner.emit(FuseEvent::Installed { name, replaced });
        Ok(())
    }

    /// Current status, synced with the caller's earlier writes.
    pub fn ask(&self, name: &str) -> Result<FuseStatus, FuseError> {
        self.ask_with(name, Consistency::Synced)
    }

    /// Current status with an explicit read mode.
    pub fn ask_with(&self, name: &str, consistency: Consistency) -> Result<FuseStatus, FuseError> {
        let cell = self.inner.cell(name)?;
        Ok(match consistency {
            Consistency::Synced => self.inner.with_synced(name, &cell, |state, _| state.status()),
            Consistency::Relaxed => cell.relaxed_status(),
        })
    }

    /// Record one failure against `name`.
    ///
    /// If this melt brings the in-window count to `max_melts` on an OK fuse, the
    /// fuse blows and a heal timer is armed for `reset_delay` from now. Melting
    /// an already blown fuse is recorded but arms nothing.
    ///
    /// Returns [`FuseError::NotFound`] for a name that was never installed; no
    /// state is created. Callers using melt as fire-and-forget may ignore it.
    pub fn melt(&self, name: &str) -> Result<(), FuseError> {
        let cell = self.inner.cell(name)?;
        let now = self.inner.clock.now_millis();
        let (outcome, reset_delay) = {
            let mut state = cell.state.lock();
            let outcome = state.melt(now);
            let reset_delay = state.config().reset_delay();
            if outcome.tripped {
                cell.publish(FuseStatus::Blown);
                self.arm_heal(name, reset_delay, state.epoch());
            }
            (outcome, reset_delay)
        };

        debug!(target: TARGET, fuse = %name, in_window = outcome.in_window, "fuse melted");
        self.inner.emit(FuseEvent::Melted { name: name.to_owned(), in_window: outcome.in_window });
        if outcome.tripped {
            error!(
                target: TARGET,
                fuse = %name,
                melts = outcome.in_window,
                ?reset_delay,
                "fuse blown"
            );
            self.inner.emit(FuseEvent::Blown {
                name: name.to_owned(),
                melts: outcome.in_window,
                reset_delay,
            });
        }
        Ok(())
    }

    /// Clear history, force OK and cancel any pending heal. Config is kept.
    pub fn reset(&self, name: &str) -> Result<(), FuseError> {
        let cell = self.inner.cell(name)?;
        let previous = {
            let mut state = cell.state.lock();
            let previous = state.reset();
            cell.publish(state.status());
            self.inner.scheduler.cancel(name);
            previous
        };
        info!(target: TARGET, fuse = %name, %previous, "fuse reset");
        self.inner.emit(FuseEvent::Reset { name: name.to_owned() });
        Ok(())
    }

    /// Run `op` once if the fuse is OK, melting it when `op` says so.
    ///
    /// A blown fuse returns [`FuseError::Unavailable`] and `op` never runs. No
    /// lock is held while `op` executes, so it may call back into the registry,
    /// including on the same fuse.
    ///
    /// # Examples
    /// ```
    /// use fusebox::{FuseConfig, FuseRegistry, Verdict, VirtualClock};
    ///
    /// let fuses = FuseRegistry::with_virtual_clock(VirtualClock::new());
    /// fuses.install("api", FuseConfig::from_millis(1, 1000, 5000).unwrap()).unwrap();
    ///
    /// let first = fuses.run("api", || Verdict::Melt("timed out"));
    /// assert_eq!(first.unwrap(), "timed out");
    ///
    /// let second = fuses.run("api", || Verdict::Pass("never runs"));
    /// assert!(second.unwrap_err().is_unavailable());
    /// ```
    pub fn run<T, F>(&self, name: &str, op: F) -> Result<T, FuseError>
    where
        F: FnOnce() -> Verdict<T>,
    {
        self.run_with(name, Consistency::Synced, op)
    }

    /// [`run`](Self::run) with an explicit read mode for the admission check.
    pub fn run_with<T, F>(&self, name: &str, consistency: Consistency, op: F) -> Result<T, FuseError>
    where
        F: FnOnce() -> Verdict<T>,
    {
        self.admit(name, consistency)?;
        let verdict = op();
        self.settle(name, verdict)
    }

    /// Guard a fallible operation: `Err` melts the fuse and comes back as
    /// [`RunError::Inner`].
    pub fn run_result<T, E, F>(&self, name: &str, op: F) -> Result<T, RunError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.run(name, || Verdict::from_result(op()))?.map_err(RunError::Inner)
    }

    /// Async form of [`run`](Self::run). The future is awaited outside any lock.
    pub async fn run_async<T, F, Fut>(&self, name: &str, op: F) -> Result<T, FuseError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Verdict<T>>,
    {
        self.admit(name, Consistency::Synced)?;
        let verdict = op().await;
        self.settle(name, verdict)
    }

    /// Async form of [`run_result`](Self::run_result).
    pub async fn run_result_async<T, E, F, Fut>(&self, name: &str, op: F) -> Result<T, RunError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.admit(name, Consistency::Synced)?;
        let result = op().await;
        self.settle(name, Verdict::from_result(result))?.map_err(RunError::Inner)
    }

    /// Point-in-time view of one fuse (synced).
    pub fn snapshot(&self, name: &str) -> Result<FuseSnapshot, FuseError> {
        let cell = self.inner.cell(name)?;
        Ok(self.inner.with_synced(name, &cell, |state, now| state.snapshot(name, now)))
    }

    /// Whether a fuse is installed under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.fuses.read().contains_key(name)
    }

    /// Installed fuse names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.fuses.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Relaxed statuses of all fuses, sorted by name.
    pub fn statuses(&self) -> Vec<(String, FuseStatus)> {
        let map = self.inner.fuses.read();
        let mut entries: Vec<(String, FuseStatus)> =
            map.iter().map(|(k, v)| (k.clone(), v.relaxed_status())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.inner.fuses.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.fuses.read().is_empty()
    }

    fn admit(&self, name: &str, consistency: Consistency) -> Result<(), FuseError> {
        match self.ask_with(name, consistency)? {
            FuseStatus::Ok => Ok(()),
            FuseStatus::Blown => {
                debug!(target: TARGET, fuse = %name, "call rejected by blown fuse");
                self.inner.emit(FuseEvent::Rejected { name: name.to_owned() });
                Err(FuseError::unavailable(name))
            }
        }
    }

    fn settle<T>(&self, name: &str, verdict: Verdict<T>) -> Result<T, FuseError> {
        match verdict {
            Verdict::Pass(value) => Ok(value),
            Verdict::Melt(value) => {
                self.melt(name)?;
                Ok(value)
            }
        }
    }

    /// Arm the heal timer for the trip identified by `epoch`. Called with the
    /// fuse's lock held so arming is ordered with resets and reinstalls.
    fn arm_heal(&self, name: &str, delay: Duration, epoch: u64) {
        let registry = Arc::downgrade(&self.inner);
        let key = name.to_owned();
        self.inner.scheduler.schedule(
            name,
            delay,
            Box::new(move || {
                if let Some(inner) = registry.upgrade() {
                    inner.heal(&key, epoch);
                }
            }),
        );
    }
}

/// Builder for [`FuseRegistry`] with injectable clock, scheduler and sink.
#[derive(Debug, Default)]
pub struct FuseRegistryBuilder {
    clock: Option<Arc<dyn Clock>>,
    scheduler: Option<Arc<dyn HealScheduler>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl FuseRegistryBuilder {
    /// Time source for melt windows and heal deadlines.
    ///
    /// Unless [`scheduler`](Self::scheduler) is also set, heal timers come from
    /// [`Clock::heal_scheduler`], falling back to [`TokioHealScheduler`] for
    /// clocks that follow real time.
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Where heal timers are armed.
    pub fn scheduler<S: HealScheduler + 'static>(mut self, scheduler: S) -> Self {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    /// Receiver of fuse events.
    pub fn sink<S: EventSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Use `clock` as both the time source and the heal scheduler.
    pub fn virtual_clock(self, clock: VirtualClock) -> Self {
        self.clock(clock.clone()).scheduler(clock)
    }

    pub fn build(self) -> FuseRegistry {
        let clock = self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::default()));
        let scheduler = self
            .scheduler
            .or_else(|| clock.heal_scheduler())
            .unwrap_or_else(|| Arc::new(TokioHealScheduler::new()));
        let sink = self.sink.unwrap_or_else(|| Arc::new(NullSink));
        FuseRegistry {
            inner: Arc::new(RegistryInner {
                fuses: RwLock::new(HashMap::new()),
                clock,
                scheduler,
                sink,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::HealTask;
    use crate::telemetry::MemorySink;
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> MakeWriter<'a> for SharedWriter {
        type Writer = SharedGuard;
        fn make_writer(&'a self) -> Self::Writer {
            SharedGuard(self.0.clone())
        }
    }

    struct SharedGuard(Arc<Mutex<Vec<u8>>>);
    impl std::io::Write for SharedGuard {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Scheduler that loses every timer, leaving heals to the overdue check.
    #[derive(Debug, Default)]
    struct LosingScheduler;

    impl HealScheduler for LosingScheduler {
        fn schedule(&self, _name: &str, _delay: Duration, _task: HealTask) {}
        fn cancel(&self, _name: &str) {}
    }

    fn config(max_melts: u32, period: u64, reset_delay: u64) -> FuseConfig {
        FuseConfig::from_millis(max_melts, period, reset_delay).unwrap()
    }

    fn registry() -> (FuseRegistry, VirtualClock, MemorySink) {
        let clock = VirtualClock::new();
        let sink = MemorySink::default();
        let registry = FuseRegistry::builder().virtual_clock(clock.clone()).sink(sink.clone()).build();
        (registry, clock, sink)
    }

    #[test]
    fn reinstall_warns_and_resets_in_place() {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer = SharedWriter(buffer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_writer(BoxMakeWriter::new(writer))
            .with_target(true)
            .without_time()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (registry, clock, _) = registry();
        registry.install("svc", config(1, 1000, 60_000)).unwrap();
        registry.melt("svc").unwrap();
        assert_eq!(clock.pending(), 1);

        registry.install("svc", config(2, 1000, 60_000)).unwrap();
        assert_eq!(registry.ask("svc").unwrap(), FuseStatus::Ok);
        assert_eq!(clock.pending(), 0, "reinstall cancels the heal timer");
        assert_eq!(registry.len(), 1);

        let logs = String::from_utf8(buffer.lock().clone()).unwrap();
        assert!(logs.contains("fuse reinstalled"), "warning should be emitted on reinstall");
        assert!(logs.contains("fusebox::registry"));
    }

    #[test]
    fn emits_lifecycle_events_in_order() {
        let (registry, clock, sink) = registry();
        registry.install("db", config(2, 1000, 500)).unwrap();
        registry.melt("db").unwrap();
        registry.melt("db").unwrap();
        assert!(registry.run("db", || Verdict::Pass(())).is_err());
        clock.elapse(Duration::from_millis(500));
        registry.reset("db").unwrap();

        assert_eq!(
            sink.events_for("db"),
            vec![
                FuseEvent::Installed { name: "db".into(), replaced: false },
                FuseEvent::Melted { name: "db".into(), in_window: 1 },
                FuseEvent::Melted { name: "db".into(), in_window: 2 },
                FuseEvent::Blown {
                    name: "db".into(),
                    melts: 2,
                    reset_delay: Duration::from_millis(500)
                },
                FuseEvent::Rejected { name: "db".into() },
                FuseEvent::Healed { name: "db".into(), cause: HealCause::Timer },
                FuseEvent::Reset { name: "db".into() },
            ]
        );
    }

    #[test]
    fn heal_timer_runs_from_time_of_trip() {
        let (registry, clock, _) = registry();
        registry.install("db", config(3, 1000, 60_000)).unwrap();
        registry.melt("db").unwrap();
        clock.elapse(Duration::from_millis(100));
        registry.melt("db").unwrap();
        clock.elapse(Duration::from_millis(100));
        registry.melt("db").unwrap();
        assert_eq!(clock.deadline("db"), Some(60_200));

        clock.elapse(Duration::from_millis(50));
        registry.melt("db").unwrap();
        assert_eq!(clock.deadline("db"), Some(60_200), "melting a blown fuse does not re-arm");
    }

    #[test]
    fn stale_timer_does_not_heal_reinstalled_fuse() {
        let clock = VirtualClock::new();
        let parked: Arc<Mutex<Option<HealTask>>> = Arc::new(Mutex::new(None));

        struct Parking(Arc<Mutex<Option<HealTask>>>);
        impl std::fmt::Debug for Parking {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("Parking")
            }
        }
        impl HealScheduler for Parking {
            fn schedule(&self, _name: &str, _delay: Duration, task: HealTask) {
                *self.0.lock() = Some(task);
            }
            fn cancel(&self, _name: &str) {}
        }

        let registry =
            FuseRegistry::builder().clock(clock.clone()).scheduler(Parking(parked.clone())).build();
        registry.install("db", config(1, 1000, 100)).unwrap();
        registry.melt("db").unwrap();
        let first_timer = parked.lock().take().expect("timer armed on trip");

        registry.install("db", config(1, 1000, 100)).unwrap();
        registry.melt("db").unwrap();
        assert_eq!(registry.ask("db").unwrap(), FuseStatus::Blown);

        first_timer();
        assert_eq!(
            registry.ask_with("db", Consistency::Relaxed).unwrap(),
            FuseStatus::Blown,
            "timer from the previous install must be a no-op"
        );

        let second_timer = parked.lock().take().expect("timer armed on second trip");
        second_timer();
        assert_eq!(registry.ask_with("db", Consistency::Relaxed).unwrap(), FuseStatus::Ok);
    }

    #[test]
    fn lost_timer_is_recovered_on_synced_read() {
        let clock = VirtualClock::new();
        let sink = MemorySink::default();
        let registry = FuseRegistry::builder()
            .clock(clock.clone())
            .scheduler(LosingScheduler)
            .sink(sink.clone())
            .build();
        registry.install("db", config(1, 1000, 1000)).unwrap();
        registry.melt("db").unwrap();

        clock.elapse(Duration::from_millis(999));
        assert_eq!(registry.ask("db").unwrap(), FuseStatus::Blown);

        clock.elapse(Duration::from_millis(1));
        assert_eq!(registry.ask_with("db", Consistency::Relaxed).unwrap(), FuseStatus::Blown);
        assert_eq!(registry.ask("db").unwrap(), FuseStatus::Ok);
        assert_eq!(registry.snapshot("db").unwrap().melts_recorded, 0);
        assert!(sink
            .events_for("db")
            .contains(&FuseEvent::Healed { name: "db".into(), cause: HealCause::Overdue }));
    }

    #[test]
    fn relaxed_reads_follow_published_status() {
        let (registry, _, _) = registry();
        registry.install("db", config(1, 1000, 60_000)).unwrap();
        assert_eq!(registry.ask_with("db", Consistency::Relaxed).unwrap(), FuseStatus::Ok);
        registry.melt("db").unwrap();
        assert_eq!(registry.ask_with("db", Consistency::Relaxed).unwrap(), FuseStatus::Blown);
        registry.reset("db").unwrap();
        assert_eq!(registry.ask_with("db", Consistency::Relaxed).unwrap(), FuseStatus::Ok);
    }

    #[test]
    fn unknown_names_are_not_found_everywhere() {
        let (registry, _, sink) = registry();
        assert!(registry.ask("ghost").unwrap_err().is_not_found());
        assert!(registry.melt("ghost").unwrap_err().is_not_found());
        assert!(registry.reset("ghost").unwrap_err().is_not_found());
        assert!(registry.snapshot("ghost").unwrap_err().is_not_found());
        let ran = registry.run("ghost", || Verdict::Pass(1));
        assert!(ran.unwrap_err().is_not_found());
        assert!(!registry.contains("ghost"));
        assert!(sink.is_empty());
    }

    #[test]
    fn listing_is_sorted() {
        let (registry, _, _) = registry();
        for name in ["cache", "api", "db"] {
            registry.install(name, config(1, 10, 10)).unwrap();
        }
        registry.melt("cache").unwrap();
        assert_eq!(registry.names(), vec!["api", "cache", "db"]);
        assert_eq!(
            registry.statuses(),
            vec![
                ("api".to_string(), FuseStatus::Ok),
                ("cache".to_string(), FuseStatus::Blown),
                ("db".to_string(), FuseStatus::Ok),
            ]
        );
        assert!(!registry.is_empty());
    }

    #[test]
    fn custom_clock_brings_its_own_heal_timers() {
        let clock = VirtualClock::new();
        let sink = MemorySink::default();
        let registry = FuseRegistry::builder().clock(clock.clone()).sink(sink.clone()).build();
        registry.install("db", config(1, 1000, 500)).unwrap();
        registry.melt("db").unwrap();
        assert_eq!(clock.deadline("db"), Some(500));

        clock.elapse(Duration::from_millis(500));
        assert_eq!(registry.ask_with("db", Consistency::Relaxed).unwrap(), FuseStatus::Ok);
        assert!(sink
            .events_for("db")
            .contains(&FuseEvent::Healed { name: "db".into(), cause: HealCause::Timer }));
    }

    #[test]
    fn dropped_registry_turns_pending_heal_into_noop() {
        let clock = VirtualClock::new();
        let registry = FuseRegistry::with_virtual_clock(clock.clone());
        registry.install("db", config(1, 10, 10)).unwrap();
        registry.melt("db").unwrap();
        drop(registry);
        clock.elapse(Duration::from_millis(10));
        assert_eq!(clock.pending(), 0);
    }
}
