//! Proactor processing strategy
//!
//! Ties the pieces together: admission through the backpressure sink,
//! correlation-stable lanes over the ring, and per-step pool routing via
//! the typed dispatcher. [`StrategyBuilder`] derives pool sizes from the
//! concurrency governor and acquires the three pools through a shared
//! refcounted registry, so strategies with the same name prefix share
//! worker threads.
//!
//! Disposal is idempotent: lanes stop, queued and in-flight units resolve
//! as cancelled, the in-flight count drains to zero and the pools are
//! released.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossfire::AsyncRx;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use weir_config::{PoolSettings, StrategySettings};
use weir_exec::{PoolHandle, PoolKind, PoolRegistry, ThreadLogger};
use weir_flow::{
    completion, CompletionHandle, CorrelationId, NoTransaction, Outcome, Pipeline,
    TransactionProbe, UnitOfWork,
};

use crate::dispatcher::TypedDispatcher;
use crate::error::{Result, SchedulerError};
use crate::governor::ConcurrencyGovernor;
use crate::metrics::{MetricsSnapshot, RejectionTracker, StrategyMetrics};
use crate::ring::{LaneJob, RingDispatcher};
use crate::sink::BackpressureSink;

/// Builder for a [`ProactorStrategy`]
///
/// Only the pipeline is required; everything else defaults to an untuned
/// deployment. Pool sizes derive from the detected core count unless
/// overridden through [`PoolSettings`] or [`cores`](Self::cores).
///
/// # Example
///
/// ```ignore
/// use weir_scheduler::{Pipeline, StrategyBuilder, StrategySettings};
///
/// let strategy = StrategyBuilder::new(Pipeline::<String>::empty())
///     .settings(StrategySettings {
///         subscriber_count: 4,
///         max_concurrency: Some(64),
///         ..Default::default()
///     })
///     .build()?;
/// ```
pub struct StrategyBuilder<T> {
    settings: StrategySettings,
    pools: PoolSettings,
    registry: PoolRegistry,
    pipeline: Pipeline<T>,
    probe: Arc<dyn TransactionProbe>,
    cores: Option<usize>,
}

impl<T: Send + 'static> StrategyBuilder<T> {
    /// Start a builder for the given pipeline
    pub fn new(pipeline: Pipeline<T>) -> Self {
        Self {
            settings: StrategySettings::default(),
            pools: PoolSettings::default(),
            registry: PoolRegistry::new(),
            pipeline,
            probe: Arc::new(NoTransaction),
            cores: None,
        }
    }

    /// Strategy settings (buffer, lanes, wait strategy, ceiling)
    pub fn settings(mut self, settings: StrategySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Worker pool sizing and naming overrides
    pub fn pool_settings(mut self, pools: PoolSettings) -> Self {
        self.pools = pools;
        self
    }

    /// Registry to acquire pools from
    ///
    /// Strategies sharing a registry and a name prefix share pools.
    pub fn registry(mut self, registry: PoolRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Probe consulted on every submission for transactional context
    pub fn transaction_probe(mut self, probe: Arc<dyn TransactionProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Override the detected core count used for pool sizing
    pub fn cores(mut self, cores: usize) -> Self {
        self.cores = Some(cores);
        self
    }

    /// Validate the configuration, acquire the pools and start the lanes
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Configuration`] for invalid settings and
    /// [`SchedulerError::PoolCreation`] if a worker pool cannot be built.
    pub fn build(self) -> Result<ProactorStrategy<T>> {
        self.settings.validate()?;
        self.pools.validate()?;

        let cores = match self.cores {
            Some(cores) => cores.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };
        let governor = ConcurrencyGovernor::new(
            cores,
            self.settings.subscriber_count,
            self.settings.max_concurrency.into(),
        );

        let prefix = &self.pools.name_prefix;
        let event_pool = self.registry.acquire(
            PoolKind::EventLoop,
            prefix,
            self.pools
                .effective_event_loop_threads(governor.event_loop_threads()),
        )?;
        let cpu_pool = match self.registry.acquire(
            PoolKind::CpuIntensive,
            prefix,
            self.pools.effective_cpu_threads(cores),
        ) {
            Ok(pool) => pool,
            Err(error) => {
                self.registry.release(event_pool.name());
                return Err(error.into());
            }
        };
        let blocking_pool = match self.registry.acquire(
            PoolKind::Blocking,
            prefix,
            self.pools.effective_blocking_threads(cores),
        ) {
            Ok(pool) => pool,
            Err(error) => {
                self.registry.release(cpu_pool.name());
                self.registry.release(event_pool.name());
                return Err(error.into());
            }
        };

        let sink =
            BackpressureSink::new(governor.max_concurrency(), self.settings.eager_limit_check);
        let (ring, receivers) = RingDispatcher::build(
            self.settings.subscriber_count,
            self.settings.lane_capacity(),
            self.settings.wait_strategy,
        );

        let thread_log = self
            .settings
            .thread_logging
            .then(|| Arc::new(ThreadLogger::new()));
        let metrics = Arc::new(StrategyMetrics::new());
        let dispatcher = TypedDispatcher::new(
            self.pipeline,
            cpu_pool.clone(),
            blocking_pool.clone(),
            thread_log.clone(),
            Arc::clone(&metrics),
        );

        let cancel = CancellationToken::new();
        let mut lanes = Vec::with_capacity(receivers.len());
        for (lane, rx) in receivers.into_iter().enumerate() {
            lanes.push(event_pool.spawn(run_lane(
                lane,
                rx,
                dispatcher.clone(),
                Arc::clone(&metrics),
                cancel.clone(),
            )));
        }

        tracing::info!(
            lanes = ring.lane_count(),
            lane_capacity = ring.lane_capacity(),
            parallelism = governor.parallelism(),
            wait = %ring.wait_strategy(),
            max_concurrency = %governor.max_concurrency(),
            eager = self.settings.eager_limit_check,
            event_pool = event_pool.name(),
            "processing strategy started"
        );

        Ok(ProactorStrategy {
            settings: self.settings,
            governor,
            sink,
            ring,
            probe: self.probe,
            thread_log,
            metrics,
            rejections: RejectionTracker::new(),
            registry: self.registry,
            event_pool,
            cpu_pool,
            blocking_pool,
            lanes: Mutex::new(lanes),
            cancel,
            next_correlation: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        })
    }
}

impl<T> fmt::Debug for StrategyBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyBuilder")
            .field("settings", &self.settings)
            .field("pools", &self.pools)
            .field("steps", &self.pipeline.names())
            .field("cores", &self.cores)
            .finish()
    }
}

/// Consumer loop of one lane
///
/// Takes units in arrival order and runs each one to a terminal outcome
/// before touching the next, which is what makes per-lane ordering hold.
/// Cancellation is observed between units and between steps of the unit
/// in progress.
async fn run_lane<T: Send + 'static>(
    lane: usize,
    rx: AsyncRx<Box<LaneJob<T>>>,
    dispatcher: TypedDispatcher<T>,
    metrics: Arc<StrategyMetrics>,
    cancel: CancellationToken,
) {
    tracing::debug!(lane, "lane started");

    loop {
        let job = tokio::select! {
            _ = cancel.cancelled() => break,
            received = rx.recv() => match received {
                Ok(job) => job,
                Err(_) => break,
            },
        };

        let LaneJob { unit, done, slot } = *job;
        let correlation = unit.correlation();

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Outcome::Cancelled,
            outcome = dispatcher.dispatch(unit) => outcome,
        };

        match outcome {
            Outcome::Completed(unit) => {
                metrics.record_completed();
                done.complete(unit);
            }
            Outcome::Failed(error) => {
                metrics.record_failed();
                tracing::debug!(lane, correlation = %correlation, error = %error, "unit failed");
                done.fail(error);
            }
            Outcome::Cancelled => {
                metrics.record_cancelled();
                // Dropping the cell resolves the handle as cancelled.
                drop(done);
            }
        }

        slot.release();
    }

    tracing::debug!(lane, "lane stopped");
}

/// Asynchronous processing strategy with per-step pool routing
///
/// Submissions pass the transaction probe and the backpressure sink, then
/// queue on their correlation lane. Lane tasks run the pipeline, handing
/// CPU-intensive and blocking steps to their pools and resuming on the
/// event loop in between. The returned [`CompletionHandle`] resolves
/// exactly once per unit.
///
/// The strategy is incompatible with transactional execution: a unit's
/// steps migrate across threads, so submissions made inside an active
/// transaction context are rejected before any step runs.
pub struct ProactorStrategy<T> {
    settings: StrategySettings,
    governor: ConcurrencyGovernor,
    sink: BackpressureSink,
    ring: RingDispatcher<T>,
    probe: Arc<dyn TransactionProbe>,
    thread_log: Option<Arc<ThreadLogger>>,
    metrics: Arc<StrategyMetrics>,
    rejections: RejectionTracker,
    registry: PoolRegistry,
    event_pool: PoolHandle,
    cpu_pool: PoolHandle,
    blocking_pool: PoolHandle,
    lanes: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
    next_correlation: AtomicU64,
    disposed: AtomicBool,
}

impl<T: Send + 'static> ProactorStrategy<T> {
    /// Submit a unit of work
    ///
    /// Resolves once the unit is queued on its lane; the returned handle
    /// resolves when the unit reaches its terminal outcome.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Disposed`] after [`dispose`](Self::dispose)
    /// - [`SchedulerError::TransactionalContext`] if the probe reports an
    ///   active transaction
    /// - [`SchedulerError::CapacityExceeded`] at the in-flight ceiling
    ///   when eager limit checking is on
    pub async fn submit(&self, unit: UnitOfWork<T>) -> Result<CompletionHandle<T>> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(SchedulerError::Disposed);
        }
        self.metrics.record_submitted();
        let correlation = unit.correlation();

        // Reject transactional submitters before any admission state
        // changes; no step may run for such a unit.
        if self.probe.in_transaction() {
            self.metrics.record_transactional_rejection();
            tracing::debug!(correlation = %correlation, "rejected: active transaction");
            return Err(SchedulerError::TransactionalContext { correlation });
        }

        let slot = match self.sink.admit().await {
            Ok(slot) => slot,
            Err(error) => {
                if let SchedulerError::CapacityExceeded { limit } = &error {
                    self.metrics.record_capacity_rejection();
                    self.rejections.record_rejection(*limit);
                }
                return Err(error);
            }
        };

        let (done, handle) = completion();
        let job = LaneJob { unit, done, slot };
        match self.ring.submit(job).await {
            Ok(()) => Ok(handle),
            Err(job) => {
                // Lane shut down under us; dropping the job frees its slot.
                drop(job);
                Err(SchedulerError::Disposed)
            }
        }
    }

    /// Submit a bare payload under a fresh correlation identifier
    ///
    /// Consecutive calls get consecutive identifiers, which spreads them
    /// round-robin across the lanes.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub async fn submit_payload(&self, payload: T) -> Result<CompletionHandle<T>> {
        let correlation =
            CorrelationId::new(self.next_correlation.fetch_add(1, Ordering::Relaxed));
        self.submit(UnitOfWork::new(correlation, payload)).await
    }

    /// Stop the strategy and release its pools
    ///
    /// Queued and in-flight units resolve as cancelled; their handles
    /// never hang. Safe to call more than once; only the first call does
    /// the work.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        tracing::info!(in_flight = self.sink.in_flight(), "disposing processing strategy");
        self.cancel.cancel();

        let lanes: Vec<JoinHandle<()>> = std::mem::take(&mut *self.lanes.lock());
        for (lane, task) in lanes.into_iter().enumerate() {
            if let Err(error) = task.await {
                if error.is_panic() {
                    tracing::warn!(lane, "lane task panicked during shutdown");
                }
            }
        }

        // Jobs still queued in the lanes were dropped with the receivers;
        // their slots are back, so this terminates.
        self.sink.drain().await;

        self.registry.release(self.blocking_pool.name());
        self.registry.release(self.cpu_pool.name());
        self.registry.release(self.event_pool.name());

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            submitted = snapshot.units_submitted,
            completed = snapshot.units_completed,
            failed = snapshot.units_failed,
            cancelled = snapshot.units_cancelled,
            capacity_rejections = snapshot.capacity_rejections,
            "processing strategy disposed"
        );
    }

    /// Counters as of now
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Units currently between admission and terminal outcome
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.sink.in_flight()
    }

    /// The sizing decisions this strategy was built with
    #[inline]
    pub fn governor(&self) -> ConcurrencyGovernor {
        self.governor
    }

    /// Diagnostic thread log, present when `thread_logging` is on
    pub fn thread_logger(&self) -> Option<Arc<ThreadLogger>> {
        self.thread_log.clone()
    }

    /// Number of ingestion lanes
    #[inline]
    pub fn lane_count(&self) -> usize {
        self.ring.lane_count()
    }

    /// Whether [`dispose`](Self::dispose) has run
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl<T> Drop for ProactorStrategy<T> {
    fn drop(&mut self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            tracing::warn!("strategy dropped without dispose; releasing pools");
            self.cancel.cancel();
            self.registry.release(self.blocking_pool.name());
            self.registry.release(self.cpu_pool.name());
            self.registry.release(self.event_pool.name());
        }
    }
}

impl<T: Send + 'static> fmt::Debug for ProactorStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProactorStrategy")
            .field("lanes", &self.ring.lane_count())
            .field("lane_capacity", &self.ring.lane_capacity())
            .field("wait", &self.settings.wait_strategy)
            .field("parallelism", &self.governor.parallelism())
            .field("in_flight", &self.sink.in_flight())
            .field("disposed", &self.disposed.load(Ordering::Acquire))
            .finish()
    }
}
