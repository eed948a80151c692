//! Pool error types

use std::io;

use thiserror::Error;
use tokio::task::JoinError;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur when creating or using a worker pool
#[derive(Debug, Error)]
pub enum PoolError {
    /// Failed to build the pool's runtime
    #[error("failed to create pool '{name}': {source}")]
    Creation {
        /// Pool name
        name: String,
        /// Underlying IO error from the runtime builder
        #[source]
        source: io::Error,
    },

    /// A task handed to the pool panicked
    #[error("task on pool '{pool}' panicked")]
    TaskPanicked {
        /// Pool name
        pool: String,
    },

    /// A task handed to the pool was cancelled before completing
    #[error("task on pool '{pool}' was cancelled")]
    TaskCancelled {
        /// Pool name
        pool: String,
    },
}

impl PoolError {
    /// Map a join failure from a pool-side task
    pub(crate) fn from_join(pool: &str, err: JoinError) -> Self {
        if err.is_panic() {
            Self::TaskPanicked { pool: pool.into() }
        } else {
            Self::TaskCancelled { pool: pool.into() }
        }
    }

    /// Whether this error means the task panicked
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::TaskPanicked { .. })
    }
}
