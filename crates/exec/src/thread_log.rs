//! Diagnostic thread logging
//!
//! When enabled, every hand-off records which physical thread executed
//! which unit, keyed by correlation identifier. Recording is purely
//! observational and never changes ordering or outcomes.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use weir_flow::CorrelationId;

/// One recorded execution: a unit visited a thread on a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadVisit {
    /// Name of the pool that executed the unit
    pub pool: String,
    /// Name of the executing OS thread
    pub thread: String,
}

/// Diagnostic log of thread visits, keyed by correlation identifier
///
/// Shared between the dispatcher and callers that want to inspect where
/// their units ran. The map is append-only while units are in flight;
/// [`clear`](Self::clear) resets it between runs.
#[derive(Debug, Default)]
pub struct ThreadLogger {
    visits: Mutex<HashMap<CorrelationId, Vec<ThreadVisit>>>,
}

impl ThreadLogger {
    /// Create an empty logger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the current thread is executing the given unit
    ///
    /// Must be called on the executing thread itself; the thread identity
    /// is captured at call time.
    pub fn record(&self, correlation: CorrelationId, pool: &str) {
        let current = std::thread::current();
        let thread = match current.name() {
            Some(name) => name.to_owned(),
            None => format!("{:?}", current.id()),
        };

        tracing::trace!(
            correlation = %correlation,
            pool = %pool,
            thread = %thread,
            "unit executing"
        );

        self.visits
            .lock()
            .entry(correlation)
            .or_default()
            .push(ThreadVisit {
                pool: pool.to_owned(),
                thread,
            });
    }

    /// Wrap a future so its first poll records the executing thread
    ///
    /// The wrapped future must be polled on the pool that will execute it;
    /// `PoolHandle::run` satisfies this by spawning it onto the pool.
    pub fn instrument<F>(
        self: &Arc<Self>,
        correlation: CorrelationId,
        pool: impl Into<String>,
        future: F,
    ) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        let logger = Arc::clone(self);
        let pool = pool.into();
        async move {
            logger.record(correlation, &pool);
            future.await
        }
    }

    /// All visits recorded for a unit, in execution order
    pub fn visits(&self, correlation: CorrelationId) -> Vec<ThreadVisit> {
        self.visits
            .lock()
            .get(&correlation)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of units with at least one recorded visit
    pub fn unit_count(&self) -> usize {
        self.visits.lock().len()
    }

    /// Drop all recorded visits
    pub fn clear(&self) {
        self.visits.lock().clear();
    }
}
