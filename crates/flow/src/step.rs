//! Pipeline steps and their processing classification
//!
//! A `PipelineStep` is a transformation applied to a unit of work. Every
//! step declares a `ProcessingKind` that tells the scheduler which worker
//! pool must execute it. The classification is fixed at construction time.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::unit::UnitOfWork;
use crate::StepResult;

/// Execution affinity of a pipeline step
///
/// The scheduler routes each step to a worker pool based on this
/// classification:
/// - `Light` runs inline on the event-loop lane, never switching threads
/// - `CpuIntensive` is handed off to the CPU-intensive pool
/// - `Blocking` is handed off to the blocking/IO pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingKind {
    /// Lightweight, non-blocking work; stays on the event loop
    Light,
    /// CPU-bound work; runs on the CPU-intensive pool
    CpuIntensive,
    /// Blocking or IO-bound work; runs on the blocking pool
    Blocking,
}

impl ProcessingKind {
    /// Short lowercase name used in logs and pool names
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingKind::Light => "light",
            ProcessingKind::CpuIntensive => "cpu-intensive",
            ProcessingKind::Blocking => "blocking",
        }
    }
}

impl fmt::Display for ProcessingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single processing step applied to units of work
///
/// Steps receive the whole unit and return it, usually with a transformed
/// payload. A step must not block the calling thread unless it declares
/// `ProcessingKind::Blocking`; the scheduler trusts the declared
/// classification when choosing an execution pool.
///
/// # Example
///
/// ```ignore
/// use std::future::Future;
/// use std::pin::Pin;
///
/// use weir_flow::{PipelineStep, ProcessingKind, StepResult, UnitOfWork};
///
/// struct Uppercase;
///
/// impl PipelineStep<String> for Uppercase {
///     fn process<'a>(
///         &'a self,
///         unit: UnitOfWork<String>,
///     ) -> Pin<Box<dyn Future<Output = StepResult<UnitOfWork<String>>> + Send + 'a>> {
///         Box::pin(async move { Ok(unit.map(|s| s.to_uppercase())) })
///     }
///
///     fn name(&self) -> &'static str {
///         "uppercase"
///     }
/// }
/// ```
pub trait PipelineStep<T>: Send + Sync {
    /// Process a unit, returning the (possibly transformed) unit
    ///
    /// Returning an error resolves the unit's completion as failed; later
    /// steps do not run for that unit.
    fn process<'a>(
        &'a self,
        unit: UnitOfWork<T>,
    ) -> Pin<Box<dyn Future<Output = StepResult<UnitOfWork<T>>> + Send + 'a>>;

    /// Name of this step for logging and diagnostics
    fn name(&self) -> &'static str;

    /// Declared execution affinity of this step
    ///
    /// Defaults to `Light`. The value must not change after construction.
    fn kind(&self) -> ProcessingKind {
        ProcessingKind::Light
    }
}

/// An ordered chain of pipeline steps
///
/// Steps run sequentially per unit; the scheduler owns the thread each
/// step executes on. Steps are reference-counted so lane tasks can share
/// them with hand-off executions.
pub struct Pipeline<T> {
    steps: Vec<Arc<dyn PipelineStep<T>>>,
}

impl<T> Pipeline<T> {
    /// Create a pipeline from an ordered list of steps
    pub fn new(steps: Vec<Arc<dyn PipelineStep<T>>>) -> Self {
        Self { steps }
    }

    /// Create an empty pipeline (units pass through unchanged)
    pub fn empty() -> Self {
        Self { steps: Vec::new() }
    }

    /// Number of steps in the pipeline
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the pipeline has no steps
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Ordered step list
    #[inline]
    pub fn steps(&self) -> &[Arc<dyn PipelineStep<T>>] {
        &self.steps
    }

    /// Names of all steps, in execution order
    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
        }
    }
}

impl<T> Default for Pipeline<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.names())
            .finish()
    }
}
