//! Step execution error types

use thiserror::Error;

/// Error raised when a pipeline step fails
///
/// Carries the failing step's name so completion handlers can attribute
/// the failure without re-walking the pipeline.
#[derive(Debug, Error)]
#[error("step '{step}' failed: {message}")]
pub struct StepError {
    /// Name of the failing step
    pub step: &'static str,
    /// Failure description
    pub message: String,
}

impl StepError {
    /// Create a step error
    pub fn new(step: &'static str, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }

    /// Error for a step whose execution panicked
    pub fn panicked(step: &'static str) -> Self {
        Self {
            step,
            message: "execution panicked".into(),
        }
    }
}
