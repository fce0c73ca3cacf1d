//! Fuse lifecycle events and the sinks that consume them.
//!
//! The registry emits a [`FuseEvent`] for every melt, trip, heal, reset, install
//! and rejected call. Events are delivered after the fuse's lock is released, so
//! a sink may call back into the registry. Delivery is write-only and
//! fire-and-forget: sinks cannot fail a registry operation.
//!
//! ```rust
//! use fusebox::telemetry::{EventSink, FuseEvent, MemorySink};
//!
//! let sink = MemorySink::with_capacity(16);
//! sink.emit(FuseEvent::Reset { name: "db".into() });
//! assert_eq!(sink.len(), 1);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Why a blown fuse returned to OK without a manual reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealCause {
    /// The heal timer fired.
    Timer,
    /// A synced read found the reset delay already elapsed and healed in place.
    Overdue,
}

/// Events emitted by the fuse registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FuseEvent {
    /// A fuse was installed, or an existing one reinstalled.
    Installed {
        /// Fuse name.
        name: String,
        /// An earlier fuse under this name was replaced.
        replaced: bool,
    },
    /// A melt was recorded.
    Melted {
        /// Fuse name.
        name: String,
        /// Melts in the window including this one.
        in_window: usize,
    },
    /// The fuse transitioned OK → Blown.
    Blown {
        /// Fuse name.
        name: String,
        /// Melts in the window at the time of tripping.
        melts: usize,
        /// Delay until the armed heal timer fires.
        reset_delay: Duration,
    },
    /// The fuse healed on its own.
    Healed {
        /// Fuse name.
        name: String,
        /// What triggered the heal.
        cause: HealCause,
    },
    /// The fuse was reset manually.
    Reset {
        /// Fuse name.
        name: String,
    },
    /// A guarded call was refused because the fuse is blown.
    Rejected {
        /// Fuse name.
        name: String,
    },
}

impl FuseEvent {
    /// Name of the fuse the event concerns.
    pub fn name(&self) -> &str {
        match self {
            FuseEvent::Installed { name, .. }
            | FuseEvent::Melted { name, .. }
            | FuseEvent::Blown { name, .. }
            | FuseEvent::Healed { name, .. }
            | FuseEvent::Reset { name }
            | FuseEvent::Rejected { name } => name,
        }
    }
}

impl fmt::Display for FuseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuseEvent::Installed { name, replaced } => {
                write!(f, "Installed({}, replaced={})", name, replaced)
            }
            FuseEvent::Melted { name, in_window } => {
                write!(f, "Melted({}, in_window={})", name, in_window)
            }
            FuseEvent::Blown { name, melts, reset_delay } => {
                write!(f, "Blown({}, melts={}, reset_delay={:?})", name, melts, reset_delay)
            }
            FuseEvent::Healed { name, cause } => write!(f, "Healed({}, cause={:?})", name, cause),
            FuseEvent::Reset { name } => write!(f, "Reset({})", name),
            FuseEvent::Rejected { name } => write!(f, "Rejected({})", name),
        }
    }
}

/// Consumer of fuse events, e.g. a metrics exporter.
///
/// `emit` is called synchronously on the thread that caused the event and must
/// not block for long.
pub trait EventSink: Send + Sync + fmt::Debug {
    /// Receive one event.
    fn emit(&self, event: FuseEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: FuseEvent) {
        (**self).emit(event)
    }
}

/// A no-op sink that discards all events.
#[derive(Clone, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: FuseEvent) {}
}

/// A sink that logs events using the `tracing` crate.
#[derive(Clone, Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: FuseEvent) {
        tracing::info!(target: "fusebox::telemetry", fuse = %event.name(), event = %event, "fuse_event");
    }
}

/// A sink that stores events in memory, evicting the oldest past `capacity`.
#[derive(Clone, Debug)]
pub struct MemorySink {
    events: Arc<Mutex<VecDeque<FuseEvent>>>,
    capacity: usize,
    evicted: Arc<AtomicU64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
            evicted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn events(&self) -> Vec<FuseEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Events concerning one fuse, oldest first.
    pub fn events_for(&self, name: &str) -> Vec<FuseEvent> {
        self.events.lock().iter().filter(|e| e.name() == name).cloned().collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events dropped to stay within capacity.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: FuseEvent) {
        let mut guard = self.events.lock();
        if guard.len() >= self.capacity {
            guard.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        guard.push_back(event);
    }
}
