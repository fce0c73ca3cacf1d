//! Convenient re-exports for common fusebox types.
pub use crate::{
    clock::{Clock, VirtualClock},
    config::{FuseConfig, FuseOptions},
    error::{FuseError, RunError},
    guard::Verdict,
    layer::FuseLayer,
    registry::{Consistency, FuseRegistry},
    state::FuseStatus,
    telemetry::{EventSink, FuseEvent},
};
