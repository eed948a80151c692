//! Scheduler error types
//!
//! Error taxonomy for strategy construction and unit submission. Step
//! failures are not errors of the scheduler itself; they travel through
//! the unit's completion surface as `Outcome::Failed`.

use thiserror::Error;

use weir_flow::CorrelationId;

/// Scheduler errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Strategy construction rejected the configuration
    #[error("invalid configuration: {0}")]
    Configuration(#[from] weir_config::ConfigError),

    /// Submission attempted under an active transaction context
    ///
    /// Raised before any step of the unit executes; transactional work
    /// cannot hop between event-loop and worker-pool threads.
    #[error("unit {correlation} submitted inside an active transaction")]
    TransactionalContext {
        /// Correlation identifier of the rejected unit
        correlation: CorrelationId,
    },

    /// Eager limit check rejected the submission
    ///
    /// Retryable: capacity frees as in-flight units reach a terminal
    /// outcome.
    #[error("in-flight limit of {limit} reached")]
    CapacityExceeded {
        /// The configured `max_concurrency` ceiling
        limit: usize,
    },

    /// A worker pool could not be created
    #[error("worker pool creation failed")]
    PoolCreation(#[from] weir_exec::PoolError),

    /// The strategy has been disposed
    #[error("strategy is disposed")]
    Disposed,
}

impl SchedulerError {
    /// Whether the submission may simply be retried later
    ///
    /// True only for capacity rejections; every other variant reflects a
    /// configuration or lifecycle problem retrying cannot fix.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulerError::CapacityExceeded { .. })
    }
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;
