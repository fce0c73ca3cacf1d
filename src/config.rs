//! Fuse configuration: the melt threshold, its time window, and the heal delay.
//!
//! [`FuseConfig`] is always valid once constructed. [`FuseOptions`] is the
//! loosely typed wire form a configuration loader reads; converting it into a
//! `FuseConfig` is where out-of-range input gets rejected.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reasons a fuse configuration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `max_melts` must be > 0 and fit in a `u32`.
    #[error("max_melts must be > 0 (got {provided})")]
    InvalidMaxMelts {
        /// Value provided by caller.
        provided: i64,
    },
    /// The melt window must be ≥ 0 ms.
    #[error("period must be >= 0 ms (got {provided_millis})")]
    InvalidPeriod {
        /// Value provided by caller, in milliseconds.
        provided_millis: i64,
    },
    /// The heal delay must be ≥ 0 ms.
    #[error("reset_delay must be >= 0 ms (got {provided_millis})")]
    InvalidResetDelay {
        /// Value provided by caller, in milliseconds.
        provided_millis: i64,
    },
}

/// Validated configuration for one fuse.
///
/// The fuse blows once `max_melts` melts fall within any `period`-long window,
/// and heals on its own `reset_delay` after blowing.
///
/// # Examples
/// ```
/// use fusebox::FuseConfig;
/// use std::time::Duration;
///
/// let config = FuseConfig::new(3, Duration::from_secs(1), Duration::from_secs(60)).unwrap();
/// assert_eq!(config.max_melts(), 3);
/// assert!(FuseConfig::new(0, Duration::from_secs(1), Duration::from_secs(60)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuseConfig {
    max_melts: u32,
    period: Duration,
    reset_delay: Duration,
}

impl FuseConfig {
    /// Create a config with validation.
    pub fn new(max_melts: u32, period: Duration, reset_delay: Duration) -> Result<Self, ConfigError> {
        if max_melts == 0 {
            return Err(ConfigError::InvalidMaxMelts { provided: 0 });
        }
        Ok(Self { max_melts, period, reset_delay })
    }

    /// Millisecond shorthand for [`FuseConfig::new`].
    pub fn from_millis(
        max_melts: u32,
        period_millis: u64,
        reset_delay_millis: u64,
    ) -> Result<Self, ConfigError> {
        Self::new(
            max_melts,
            Duration::from_millis(period_millis),
            Duration::from_millis(reset_delay_millis),
        )
    }

    /// Melts within one window needed to blow the fuse.
    pub fn max_melts(&self) -> u32 {
        self.max_melts
    }

    /// Length of the window melts are counted over.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time a blown fuse waits before healing itself.
    pub fn reset_delay(&self) -> Duration {
        self.reset_delay
    }
}

/// Melt-counting strategy as read from configuration input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StrategyOptions {
    /// Blow after `max_melts` melts within `period_millis`.
    Standard {
        /// Melts within one window needed to blow.
        max_melts: i64,
        /// Window length in milliseconds.
        period_millis: i64,
    },
}

/// Unvalidated fuse configuration, shaped like the install request:
/// `{"strategy": {"standard": {"max_melts": 3, "period_millis": 1000}}, "reset_delay_millis": 60000}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FuseOptions {
    /// Melt threshold and window.
    pub strategy: StrategyOptions,
    /// Heal delay in milliseconds.
    pub reset_delay_millis: i64,
}

impl FuseOptions {
    /// Options for the standard strategy.
    pub fn standard(max_melts: i64, period_millis: i64, reset_delay_millis: i64) -> Self {
        Self { strategy: StrategyOptions::Standard { max_melts, period_millis }, reset_delay_millis }
    }
}

impl TryFrom<FuseOptions> for FuseConfig {
    type Error = ConfigError;

    fn try_from(options: FuseOptions) -> Result<Self, Self::Error> {
        let StrategyOptions::Standard { max_melts, period_millis } = options.strategy;
        let max_melts = u32::try_from(max_melts)
            .ok()
            .filter(|m| *m > 0)
            .ok_or(ConfigError::InvalidMaxMelts { provided: max_melts })?;
        let period = u64::try_from(period_millis)
            .map_err(|_| ConfigError::InvalidPeriod { provided_millis: period_millis })?;
        let reset_delay = u64::try_from(options.reset_delay_millis).map_err(|_| {
            ConfigError::InvalidResetDelay { provided_millis: options.reset_delay_millis }
        })?;
        FuseConfig::from_millis(max_melts, period, reset_delay)
    }
}

impl From<FuseConfig> for FuseOptions {
    fn from(config: FuseConfig) -> Self {
        let millis = |d: Duration| i64::try_from(d.as_millis()).unwrap_or(i64::MAX);
        FuseOptions::standard(
            i64::from(config.max_melts),
            millis(config.period),
            millis(config.reset_delay),
        )
    }
}
