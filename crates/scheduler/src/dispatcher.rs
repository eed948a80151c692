//! Typed step dispatcher
//!
//! Runs a unit through the pipeline one step at a time, choosing the
//! executor per step from its declared [`ProcessingKind`]. Light steps
//! run inline on the lane; CPU-intensive and blocking steps are handed
//! off to their dedicated pools, with the lane suspended until the pool
//! reports back. The hand-off keeps per-lane ordering intact because the
//! lane never starts the next unit while one is suspended.
//!
//! A step that panics on a pool fails only its own unit; the lane and
//! the pools keep running.

use std::sync::Arc;

use weir_exec::{PoolHandle, ThreadLogger};
use weir_flow::{Outcome, Pipeline, PipelineStep, ProcessingKind, StepError, StepResult, UnitOfWork};

use crate::metrics::StrategyMetrics;

/// Result of one pool hand-off
enum HandOff<T> {
    /// The pool ran the step to completion (successfully or not)
    Finished(StepResult<UnitOfWork<T>>),
    /// The pool shut down before the step finished
    Interrupted,
}

/// Routes each pipeline step to the executor its classification demands
///
/// Clones share the pipeline, the pools and the metrics; every lane task
/// holds one.
pub(crate) struct TypedDispatcher<T> {
    pipeline: Pipeline<T>,
    cpu_pool: PoolHandle,
    blocking_pool: PoolHandle,
    thread_log: Option<Arc<ThreadLogger>>,
    metrics: Arc<StrategyMetrics>,
}

impl<T: Send + 'static> TypedDispatcher<T> {
    pub(crate) fn new(
        pipeline: Pipeline<T>,
        cpu_pool: PoolHandle,
        blocking_pool: PoolHandle,
        thread_log: Option<Arc<ThreadLogger>>,
        metrics: Arc<StrategyMetrics>,
    ) -> Self {
        Self {
            pipeline,
            cpu_pool,
            blocking_pool,
            thread_log,
            metrics,
        }
    }

    /// Run one unit through every step, in order
    ///
    /// Stops at the first failing step. `Cancelled` means a hand-off pool
    /// shut down mid-step; the unit's fate on that pool is unknown and it
    /// is not retried.
    pub(crate) async fn dispatch(&self, mut unit: UnitOfWork<T>) -> Outcome<T> {
        for step in self.pipeline.steps() {
            let step_name = step.name();
            let result = match step.kind() {
                ProcessingKind::Light => {
                    self.metrics.record_inline_step();
                    step.process(unit).await
                }
                ProcessingKind::CpuIntensive => {
                    self.metrics.record_cpu_handoff();
                    match self.offload(&self.cpu_pool, step, unit).await {
                        HandOff::Finished(result) => result,
                        HandOff::Interrupted => return Outcome::Cancelled,
                    }
                }
                ProcessingKind::Blocking => {
                    self.metrics.record_blocking_handoff();
                    match self.offload(&self.blocking_pool, step, unit).await {
                        HandOff::Finished(result) => result,
                        HandOff::Interrupted => return Outcome::Cancelled,
                    }
                }
            };

            match result {
                Ok(next) => unit = next,
                Err(error) => {
                    tracing::debug!(step = step_name, error = %error, "step failed");
                    return Outcome::Failed(error);
                }
            }
        }

        Outcome::Completed(unit)
    }

    /// Execute one step on a hand-off pool and wait for the result
    async fn offload(
        &self,
        pool: &PoolHandle,
        step: &Arc<dyn PipelineStep<T>>,
        unit: UnitOfWork<T>,
    ) -> HandOff<T> {
        let correlation = unit.correlation();
        let step_name = step.name();

        let step = Arc::clone(step);
        let work = async move { step.process(unit).await };

        let outcome = match &self.thread_log {
            Some(log) => {
                pool.run(log.instrument(correlation, pool.name().to_owned(), work))
                    .await
            }
            None => pool.run(work).await,
        };

        match outcome {
            Ok(result) => HandOff::Finished(result),
            Err(error) if error.is_panic() => {
                tracing::error!(
                    correlation = %correlation,
                    step = step_name,
                    pool = pool.name(),
                    "step panicked on its hand-off pool"
                );
                HandOff::Finished(Err(StepError::panicked(step_name)))
            }
            Err(_) => HandOff::Interrupted,
        }
    }
}

impl<T> Clone for TypedDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            cpu_pool: self.cpu_pool.clone(),
            blocking_pool: self.blocking_pool.clone(),
            thread_log: self.thread_log.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<T> std::fmt::Debug for TypedDispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedDispatcher")
            .field("steps", &self.pipeline.names())
            .field("cpu_pool", &self.cpu_pool.name())
            .field("blocking_pool", &self.blocking_pool.name())
            .field("thread_logging", &self.thread_log.is_some())
            .finish()
    }
}
