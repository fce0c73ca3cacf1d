//! Per-fuse data and transition logic. No locking, no I/O, no clock reads:
//! callers pass `now` in and act on the returned outcome.

use std::collections::VecDeque;

use crate::clock::duration_millis;
use crate::config::FuseConfig;

const STATUS_OK: u8 = 0;
const STATUS_BLOWN: u8 = 1;

/// Whether a fuse admits calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuseStatus {
    /// Healthy; calls go through.
    Ok,
    /// Tripped; calls are rejected until the fuse heals or is reset.
    Blown,
}

impl FuseStatus {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            FuseStatus::Ok => STATUS_OK,
            FuseStatus::Blown => STATUS_BLOWN,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        if v == STATUS_BLOWN {
            FuseStatus::Blown
        } else {
            FuseStatus::Ok
        }
    }

    /// `true` for [`FuseStatus::Blown`].
    pub fn is_blown(self) -> bool {
        self == FuseStatus::Blown
    }
}

impl std::fmt::Display for FuseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FuseStatus::Ok => write!(f, "ok"),
            FuseStatus::Blown => write!(f, "blown"),
        }
    }
}

/// Point-in-time view of one fuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuseSnapshot {
    /// Fuse name.
    pub name: String,
    /// Installed configuration.
    pub config: FuseConfig,
    /// Current status.
    pub status: FuseStatus,
    /// Melts whose timestamp lies within `[now - period, now]`.
    pub melts_in_window: usize,
    /// Melt records still held, including ones past the window not yet pruned.
    pub melts_recorded: usize,
    /// Clock reading at the last OK→Blown edge, while blown.
    pub blown_at_millis: Option<u64>,
}

/// Result of recording one melt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MeltOutcome {
    /// Melts in the window after this one was recorded.
    pub in_window: usize,
    /// This melt moved the fuse from OK to Blown.
    pub tripped: bool,
}

/// Data held for one installed fuse name.
///
/// `epoch` changes on every transition that should invalidate an armed heal
/// timer (reinstall, reset, heal). A timer captures the epoch of the trip that
/// armed it and heals only if it still matches.
#[derive(Debug, Clone)]
pub(crate) struct FuseState {
    config: FuseConfig,
    melts: VecDeque<u64>,
    status: FuseStatus,
    blown_at: Option<u64>,
    epoch: u64,
}

impl FuseState {
    pub(crate) fn new(config: FuseConfig) -> Self {
        Self { config, melts: VecDeque::new(), status: FuseStatus::Ok, blown_at: None, epoch: 0 }
    }

    pub(crate) fn config(&self) -> &FuseConfig {
        &self.config
    }

    pub(crate) fn status(&self) -> FuseStatus {
        self.status
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace the config and start over: no melts, OK, prior timers void.
    pub(crate) fn reinstall(&mut self, config: FuseConfig) {
        self.config = config;
        self.clear();
    }

    /// Record a melt at `now`, pruning records that fell out of the window.
    ///
    /// A fuse that is already blown keeps recording but never trips twice.
    pub(crate) fn melt(&mut self, now: u64) -> MeltOutcome {
        self.prune(now);
        self.melts.push_back(now);
        let in_window = self.in_window(now);
        let tripped = self.status == FuseStatus::Ok && in_window >= self.max_melts();
        if tripped {
            self.status = FuseStatus::Blown;
            self.blown_at = Some(now);
        }
        MeltOutcome { in_window, tripped }
    }

    /// Force OK with an empty history. Returns the status it replaced.
    pub(crate) fn reset(&mut self) -> FuseStatus {
        let previous = self.status;
        self.clear();
        previous
    }

    /// Heal on behalf of the timer armed at `epoch`. Stale timers are no-ops.
    pub(crate) fn heal(&mut self, epoch: u64) -> bool {
        if self.epoch != epoch || self.status != FuseStatus::Blown {
            return false;
        }
        self.clear();
        true
    }

    /// A blown fuse whose reset delay has run out by `now`.
    pub(crate) fn heal_overdue(&self, now: u64) -> bool {
        match (self.status, self.blown_at) {
            (FuseStatus::Blown, Some(at)) => {
                now >= at.saturating_add(duration_millis(self.config.reset_delay()))
            }
            _ => false,
        }
    }

    /// Melts with a timestamp in `[now - period, now]`.
    pub(crate) fn in_window(&self, now: u64) -> usize {
        let start = self.window_start(now);
        self.melts.iter().filter(|t| **t >= start && **t <= now).count()
    }

    pub(crate) fn snapshot(&self, name: &str, now: u64) -> FuseSnapshot {
        FuseSnapshot {
            name: name.to_owned(),
            config: self.config,
            status: self.status,
            melts_in_window: self.in_window(now),
            melts_recorded: self.melts.len(),
            blown_at_millis: self.blown_at,
        }
    }

    fn clear(&mut self) {
        self.melts.clear();
        self.status = FuseStatus::Ok;
        self.blown_at = None;
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn prune(&mut self, now: u64) {
        let start = self.window_start(now);
        while self.melts.front().is_some_and(|t| *t < start) {
            self.melts.pop_front();
        }
    }

    fn window_start(&self, now: u64) -> u64 {
        now.saturating_sub(duration_millis(self.config.period()))
    }

    fn max_melts(&self) -> usize {
        usize::try_from(self.config.max_melts()).unwrap_or(usize::MAX)
    }
}
