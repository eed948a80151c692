//! Weir Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use std::str::FromStr;
//! use weir_config::Config;
//!
//! let config = Config::from_str("[strategy]\nsubscriber_count = 2").unwrap();
//! assert_eq!(config.strategy.subscriber_count, 2);
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [strategy]
//! buffer_size = 256
//! subscriber_count = 4
//! wait_strategy = "sleeping"
//! max_concurrency = 64
//! eager_limit_check = true
//! thread_logging = false
//!
//! [pools]
//! name_prefix = "orders"
//! cpu_threads = 8
//! blocking_threads = 32
//! ```

mod error;
mod pools;
mod strategy;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use pools::{PoolSettings, DEFAULT_NAME_PREFIX};
pub use strategy::{
    StrategySettings, WaitStrategy, DEFAULT_BUFFER_SIZE, DEFAULT_SUBSCRIBER_COUNT,
};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Strategy options (buffer, lanes, wait strategy, concurrency ceiling)
    pub strategy: StrategySettings,

    /// Worker pool naming and sizing
    pub pools: PoolSettings,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.strategy.validate()?;
        self.pools.validate()?;
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
