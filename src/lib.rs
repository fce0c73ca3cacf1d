#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # fusebox
//!
//! Named circuit-breaker fuses: count failures ("melts") per resource over a
//! sliding time window, blow the fuse once too many land in one window, reject
//! calls while it is blown, and heal automatically after a reset delay.
//!
//! ## Features
//!
//! - **Fuse registry** with per-name serialization and no global lock
//! - **Windowed melt counting** with eager pruning of expired melts
//! - **Heal timers** on tokio, or on a [`VirtualClock`] for deterministic tests
//! - **Admission control** for sync closures, async futures and tower services
//! - **Lifecycle events** for metrics through pluggable [`EventSink`]s
//!
//! ## Quick Start
//!
//! ```rust
//! use fusebox::{FuseOptions, FuseRegistry, RunError};
//!
//! #[tokio::main]
//! async fn main() {
//!     let fuses = FuseRegistry::new();
//!     fuses.install("db", FuseOptions::standard(3, 1_000, 60_000)).unwrap();
//!
//!     let result = fuses
//!         .run_result_async("db", || async {
//!             // Your call against the protected resource here
//!             Ok::<_, std::io::Error>(())
//!         })
//!         .await;
//!
//!     match result {
//!         Ok(()) => {}
//!         Err(RunError::Fuse(e)) => eprintln!("not attempted: {e}"),
//!         Err(RunError::Inner(e)) => eprintln!("failed and melted: {e}"),
//!     }
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod layer;
pub mod prelude;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod telemetry;

// Re-exports
pub use clock::{Clock, MonotonicClock, VirtualClock};
pub use config::{ConfigError, FuseConfig, FuseOptions, StrategyOptions};
pub use error::{FuseError, RunError};
pub use guard::Verdict;
pub use layer::{FuseLayer, FuseService};
pub use registry::{Consistency, FuseRegistry, FuseRegistryBuilder};
pub use scheduler::{DelayLog, HealScheduler, HealTask, HealWait, TokioHealScheduler};
pub use state::{FuseSnapshot, FuseStatus};
pub use telemetry::{EventSink, FuseEvent, HealCause, LogSink, MemorySink, NullSink};
