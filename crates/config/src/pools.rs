//! Worker pool settings
//!
//! Sizing overrides for the three pools a strategy acquires. Absent
//! overrides fall back to sizes derived from core count and the
//! parallelism factor.

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Default pool and thread name prefix
pub const DEFAULT_NAME_PREFIX: &str = "weir";

/// Worker pool configuration
///
/// Pools are named `{name_prefix}.{role}` and their threads carry the
/// pool name.
///
/// # Example
///
/// ```toml
/// [pools]
/// name_prefix = "orders"
/// cpu_threads = 8
/// blocking_threads = 32
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Prefix for pool and thread names
    /// Default: "weir"
    pub name_prefix: String,

    /// Event-loop pool size
    /// Default: None (derived as subscriber_count x parallelism)
    pub event_loop_threads: Option<usize>,

    /// CPU-intensive pool size
    /// Default: None (derived as the core count)
    pub cpu_threads: Option<usize>,

    /// Blocking pool size
    /// Default: None (derived as twice the core count)
    pub blocking_threads: Option<usize>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.into(),
            event_loop_threads: None,
            cpu_threads: None,
            blocking_threads: None,
        }
    }
}

impl PoolSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.name_prefix.is_empty() {
            return Err(ConfigError::invalid_value(
                "pools",
                "name_prefix",
                "must not be empty",
            ));
        }

        for (field, value) in [
            ("event_loop_threads", self.event_loop_threads),
            ("cpu_threads", self.cpu_threads),
            ("blocking_threads", self.blocking_threads),
        ] {
            if value == Some(0) {
                return Err(ConfigError::invalid_value(
                    "pools",
                    field,
                    "must be at least 1 when set",
                ));
            }
        }

        Ok(())
    }

    /// Effective event-loop pool size given the derived default
    pub fn effective_event_loop_threads(&self, derived: usize) -> usize {
        self.event_loop_threads.unwrap_or(derived).max(1)
    }

    /// Effective CPU-intensive pool size given the core count
    pub fn effective_cpu_threads(&self, cores: usize) -> usize {
        self.cpu_threads.unwrap_or(cores).max(1)
    }

    /// Effective blocking pool size given the core count
    pub fn effective_blocking_threads(&self, cores: usize) -> usize {
        self.blocking_threads.unwrap_or(cores * 2).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = PoolSettings::default();
        assert_eq!(settings.name_prefix, "weir");
        assert_eq!(settings.event_loop_threads, None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_effective_sizes_use_derived_defaults() {
        let settings = PoolSettings::default();
        assert_eq!(settings.effective_event_loop_threads(4), 4);
        assert_eq!(settings.effective_cpu_threads(8), 8);
        assert_eq!(settings.effective_blocking_threads(8), 16);
    }

    #[test]
    fn test_overrides_win() {
        let toml = r#"
name_prefix = "orders"
event_loop_threads = 2
cpu_threads = 6
blocking_threads = 24
"#;
        let settings: PoolSettings = toml::from_str(toml).unwrap();
        assert_eq!(settings.name_prefix, "orders");
        assert_eq!(settings.effective_event_loop_threads(4), 2);
        assert_eq!(settings.effective_cpu_threads(8), 6);
        assert_eq!(settings.effective_blocking_threads(8), 24);
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let settings = PoolSettings {
            name_prefix: String::new(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_threads() {
        let settings = PoolSettings {
            cpu_threads: Some(0),
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("cpu_threads"));
    }
}
