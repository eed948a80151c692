//! Weir - Processing strategy
//!
//! The proactor scheduler that runs pipelines of classified steps over
//! shared worker pools.
//!
//! # Architecture
//!
//! ```text
//! [Submitters]          [Ring]              [Lanes]             [Pools]
//!    submit ──┐                          ┌─→ lane 0 ─┐   light: inline
//!    submit ──┼─→ sink ─→ correlation % N ─→ lane 1 ─┼─→ cpu  ──→ {prefix}.cpu-intensive
//!    submit ──┘  (in-flight ceiling)     └─→ lane 2 ─┘   block ──→ {prefix}.blocking
//!                                                          └── resume on {prefix}.event-loop
//! ```
//!
//! # Key Design
//!
//! - **Typed hand-offs**: Each step declares `ProcessingKind`; only
//!   CPU-intensive and blocking steps leave the event loop
//! - **Correlation lanes**: `correlation % lanes` keeps related units in
//!   order without any cross-lane locking
//! - **Counted admission**: A compare-and-swap in-flight counter that
//!   rejects eagerly or parks the submitter, never drops a unit
//! - **Derived sizing**: The concurrency governor turns cores, lanes and
//!   the ceiling into a parallelism factor that sizes the event loop
//! - **Shared pools**: Pools are refcounted per name prefix, so several
//!   strategies can share one set of worker threads
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use weir_scheduler::{Pipeline, StrategyBuilder, StrategySettings};
//!
//! let strategy = StrategyBuilder::new(Pipeline::new(vec![
//!     Arc::new(Decode),          // light: stays on the event loop
//!     Arc::new(Compress),        // cpu-intensive: handed off
//!     Arc::new(Persist),         // blocking: handed off
//! ]))
//! .settings(StrategySettings {
//!     subscriber_count: 4,
//!     max_concurrency: Some(256),
//!     ..Default::default()
//! })
//! .build()?;
//!
//! let handle = strategy.submit_payload(record).await?;
//! let outcome = handle.outcome().await;
//!
//! strategy.dispose().await;
//! ```

mod dispatcher;
mod error;
mod governor;
mod metrics;
mod ring;
mod sink;
mod strategy;
mod wait;

pub use error::{Result, SchedulerError};
pub use governor::{ConcurrencyGovernor, MaxConcurrency};
pub use metrics::{MetricsSnapshot, StrategyMetrics};
pub use sink::{BackpressureSink, InFlightSlot};
pub use strategy::{ProactorStrategy, StrategyBuilder};

// Re-export key types from dependencies for convenience
pub use weir_config::{Config, PoolSettings, StrategySettings, WaitStrategy};
pub use weir_exec::{PoolKind, PoolRegistry, ThreadLogger, ThreadVisit};
pub use weir_flow::{
    completion, CompletionCell, CompletionHandle, CorrelationId, NoTransaction, Outcome, Pipeline,
    PipelineStep, ProcessingKind, StepError, StepResult, TransactionProbe, UnitOfWork,
};

#[cfg(test)]
mod ring_test;
#[cfg(test)]
mod strategy_test;
