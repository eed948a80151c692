//! Strategy settings
//!
//! The recognized construction-time options of the processing strategy.
//! All fields have defaults matching an untuned deployment; only specify
//! what you want to change.

use std::fmt;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Default ring capacity across all lanes
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default number of ingestion lanes
pub const DEFAULT_SUBSCRIBER_COUNT: usize = 1;

/// Producer behavior when a lane's buffer is full
///
/// Full-buffer conditions are delays, never errors; no strategy drops
/// data.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WaitStrategy {
    /// Park the producer until a slot frees (default)
    #[default]
    #[serde(alias = "BLOCKING")]
    Blocking,
    /// Spin briefly, then back off with progressively longer sleeps
    #[serde(alias = "SLEEPING")]
    Sleeping,
    /// Spin briefly, then yield to the scheduler between retries
    #[serde(alias = "YIELDING")]
    Yielding,
    /// Retry hot, yielding only enough to keep the runtime live
    #[serde(alias = "BUSY_SPIN")]
    BusySpin,
}

impl WaitStrategy {
    /// Lowercase name used in logs and configs
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitStrategy::Blocking => "blocking",
            WaitStrategy::Sleeping => "sleeping",
            WaitStrategy::Yielding => "yielding",
            WaitStrategy::BusySpin => "busy_spin",
        }
    }
}

impl fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construction-time options of the processing strategy
///
/// # Example
///
/// ```toml
/// [strategy]
/// buffer_size = 256
/// subscriber_count = 4
/// wait_strategy = "sleeping"
/// max_concurrency = 64
/// eager_limit_check = true
/// thread_logging = false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    /// Total ring capacity, split evenly across lanes
    /// Default: 1024 (must be a power of two)
    pub buffer_size: usize,

    /// Number of ingestion lanes
    /// Default: 1
    pub subscriber_count: usize,

    /// Producer behavior when a lane is full
    /// Default: blocking
    pub wait_strategy: WaitStrategy,

    /// Ceiling on in-flight units
    /// Default: absent (unbounded)
    pub max_concurrency: Option<usize>,

    /// Reject admissions at the ceiling instead of queuing the submitter
    /// Default: true
    pub eager_limit_check: bool,

    /// Record which physical thread executed each hand-off
    /// Default: false
    pub thread_logging: bool,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            subscriber_count: DEFAULT_SUBSCRIBER_COUNT,
            wait_strategy: WaitStrategy::default(),
            max_concurrency: None,
            eager_limit_check: true,
            thread_logging: false,
        }
    }
}

impl StrategySettings {
    /// Validate the settings
    ///
    /// The ring capacity must be a power of two at least as large as the
    /// lane count; the concurrency ceiling, when present, must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.subscriber_count == 0 {
            return Err(ConfigError::invalid_value(
                "strategy",
                "subscriber_count",
                "must be at least 1",
            ));
        }

        if !self.buffer_size.is_power_of_two() {
            return Err(ConfigError::invalid_value(
                "strategy",
                "buffer_size",
                format!("{} is not a power of two", self.buffer_size),
            ));
        }

        if self.buffer_size < self.subscriber_count {
            return Err(ConfigError::invalid_value(
                "strategy",
                "buffer_size",
                format!(
                    "{} is smaller than subscriber_count {}",
                    self.buffer_size, self.subscriber_count
                ),
            ));
        }

        if self.max_concurrency == Some(0) {
            return Err(ConfigError::invalid_value(
                "strategy",
                "max_concurrency",
                "must be at least 1 when set",
            ));
        }

        Ok(())
    }

    /// Ring capacity available to each lane
    pub fn lane_capacity(&self) -> usize {
        (self.buffer_size / self.subscriber_count).max(1)
    }
}
