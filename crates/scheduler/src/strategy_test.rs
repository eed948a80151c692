//! Strategy construction and lifecycle tests

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::timeout;

use weir_config::{PoolSettings, StrategySettings};
use weir_exec::PoolRegistry;
use weir_flow::{Pipeline, PipelineStep, StepResult, TransactionProbe, UnitOfWork};

use crate::error::SchedulerError;
use crate::strategy::StrategyBuilder;

fn step<T>(step: impl PipelineStep<T> + 'static) -> Arc<dyn PipelineStep<T>> {
    Arc::new(step)
}

/// Counts how many units ran through it
struct CountStep {
    seen: Arc<AtomicUsize>,
}

impl PipelineStep<u32> for CountStep {
    fn process<'a>(
        &'a self,
        unit: UnitOfWork<u32>,
    ) -> Pin<Box<dyn Future<Output = StepResult<UnitOfWork<u32>>> + Send + 'a>> {
        Box::pin(async move {
            self.seen.fetch_add(1, Ordering::Relaxed);
            Ok(unit)
        })
    }

    fn name(&self) -> &'static str {
        "count"
    }
}

/// Records the correlation identifier of every unit it sees
struct RecordStep {
    correlations: Arc<Mutex<Vec<u64>>>,
}

impl PipelineStep<u32> for RecordStep {
    fn process<'a>(
        &'a self,
        unit: UnitOfWork<u32>,
    ) -> Pin<Box<dyn Future<Output = StepResult<UnitOfWork<u32>>> + Send + 'a>> {
        Box::pin(async move {
            self.correlations.lock().push(unit.correlation().as_u64());
            Ok(unit)
        })
    }

    fn name(&self) -> &'static str {
        "record"
    }
}

struct FlagProbe {
    active: AtomicBool,
}

impl TransactionProbe for FlagProbe {
    fn in_transaction(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

#[tokio::test]
async fn test_build_with_defaults_runs_units() {
    let strategy = StrategyBuilder::new(Pipeline::<u32>::empty())
        .cores(4)
        .build()
        .unwrap();

    let handle = strategy.submit_payload(7).await.unwrap();
    let outcome = timeout(Duration::from_secs(1), handle.outcome())
        .await
        .expect("unit should resolve");
    assert_eq!(*outcome.into_completed().unwrap().payload(), 7);

    let snapshot = strategy.metrics();
    assert_eq!(snapshot.units_submitted, 1);
    assert_eq!(snapshot.units_completed, 1);

    strategy.dispose().await;
}

#[test]
fn test_invalid_settings_fail_before_pools() {
    let registry = PoolRegistry::new();
    let result = StrategyBuilder::new(Pipeline::<u32>::empty())
        .settings(StrategySettings {
            buffer_size: 1000,
            ..Default::default()
        })
        .registry(registry.clone())
        .cores(2)
        .build();

    match result {
        Err(SchedulerError::Configuration(_)) => {}
        other => panic!("expected configuration error, got {other:?}"),
    }
    assert_eq!(registry.pool_count(), 0, "no pool may be acquired");
}

#[test]
fn test_invalid_pool_settings_fail_before_pools() {
    let registry = PoolRegistry::new();
    let result = StrategyBuilder::new(Pipeline::<u32>::empty())
        .pool_settings(PoolSettings {
            cpu_threads: Some(0),
            ..Default::default()
        })
        .registry(registry.clone())
        .cores(2)
        .build();

    assert!(matches!(result, Err(SchedulerError::Configuration(_))));
    assert_eq!(registry.pool_count(), 0);
}

#[test]
fn test_governor_reflects_build_inputs() {
    let strategy = StrategyBuilder::new(Pipeline::<u32>::empty())
        .settings(StrategySettings {
            subscriber_count: 4,
            ..Default::default()
        })
        .cores(16)
        .build()
        .unwrap();

    let governor = strategy.governor();
    assert_eq!(governor.cores(), 16);
    assert_eq!(governor.lanes(), 4);
    assert_eq!(governor.parallelism(), 4);
    assert_eq!(governor.event_loop_threads(), 16);
    assert_eq!(strategy.lane_count(), 4);
}

#[tokio::test]
async fn test_transactional_submissions_never_run_steps() {
    let seen = Arc::new(AtomicUsize::new(0));
    let probe = Arc::new(FlagProbe {
        active: AtomicBool::new(true),
    });
    let strategy = StrategyBuilder::new(Pipeline::new(vec![step(CountStep {
        seen: Arc::clone(&seen),
    })]))
    .transaction_probe(Arc::clone(&probe) as Arc<dyn TransactionProbe>)
    .cores(2)
    .build()
    .unwrap();

    match strategy.submit_payload(1).await {
        Err(SchedulerError::TransactionalContext { .. }) => {}
        other => panic!("expected transactional rejection, got {other:?}"),
    }
    assert_eq!(seen.load(Ordering::Relaxed), 0, "no step may run");
    assert_eq!(strategy.metrics().transactional_rejections, 1);
    assert_eq!(strategy.in_flight(), 0);

    // The probe is consulted per submission, not once at build time.
    probe.active.store(false, Ordering::Relaxed);
    let handle = strategy.submit_payload(2).await.unwrap();
    assert!(timeout(Duration::from_secs(1), handle.outcome())
        .await
        .expect("unit should resolve")
        .is_completed());
    assert_eq!(seen.load(Ordering::Relaxed), 1);

    strategy.dispose().await;
}

#[tokio::test]
async fn test_dispose_is_idempotent() {
    let strategy = StrategyBuilder::new(Pipeline::<u32>::empty())
        .cores(2)
        .build()
        .unwrap();

    let handle = strategy.submit_payload(1).await.unwrap();
    assert!(timeout(Duration::from_secs(1), handle.outcome())
        .await
        .expect("unit should resolve")
        .is_completed());

    strategy.dispose().await;
    assert!(strategy.is_disposed());
    assert_eq!(strategy.in_flight(), 0);

    let before = strategy.metrics();
    strategy.dispose().await;
    assert_eq!(strategy.metrics(), before, "second dispose must be a no-op");

    match strategy.submit_payload(2).await {
        Err(SchedulerError::Disposed) => {}
        other => panic!("expected disposed error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_payload_assigns_fresh_correlations() {
    let correlations = Arc::new(Mutex::new(Vec::new()));
    let strategy = StrategyBuilder::new(Pipeline::new(vec![step(RecordStep {
        correlations: Arc::clone(&correlations),
    })]))
    .settings(StrategySettings {
        subscriber_count: 2,
        buffer_size: 8,
        ..Default::default()
    })
    .cores(2)
    .build()
    .unwrap();

    let mut handles = Vec::new();
    for payload in 0..4u32 {
        handles.push(strategy.submit_payload(payload).await.unwrap());
    }
    for handle in handles {
        assert!(timeout(Duration::from_secs(1), handle.outcome())
            .await
            .expect("unit should resolve")
            .is_completed());
    }

    let mut seen = correlations.lock().clone();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3]);

    strategy.dispose().await;
}

#[tokio::test]
async fn test_strategies_share_pools_through_the_registry() {
    let registry = PoolRegistry::new();
    let first = StrategyBuilder::new(Pipeline::<u32>::empty())
        .registry(registry.clone())
        .cores(2)
        .build()
        .unwrap();
    let second = StrategyBuilder::new(Pipeline::<u32>::empty())
        .registry(registry.clone())
        .cores(2)
        .build()
        .unwrap();

    assert_eq!(registry.pool_count(), 3);
    assert_eq!(registry.ref_count("weir.event-loop"), Some(2));
    assert_eq!(registry.ref_count("weir.cpu-intensive"), Some(2));
    assert_eq!(registry.ref_count("weir.blocking"), Some(2));

    first.dispose().await;
    assert_eq!(registry.pool_count(), 3, "pools live while the second strategy does");
    assert_eq!(registry.ref_count("weir.event-loop"), Some(1));

    // The surviving strategy still runs units on the shared pools.
    let handle = second.submit_payload(5).await.unwrap();
    assert!(timeout(Duration::from_secs(1), handle.outcome())
        .await
        .expect("unit should resolve")
        .is_completed());

    second.dispose().await;
    assert_eq!(registry.pool_count(), 0);
}

#[test]
fn test_debug_reports_shape() {
    let builder = StrategyBuilder::new(Pipeline::<u32>::empty()).cores(2);
    assert!(format!("{builder:?}").contains("StrategyBuilder"));

    let strategy = builder.build().unwrap();
    let rendered = format!("{strategy:?}");
    assert!(rendered.contains("lanes"));
    assert!(rendered.contains("parallelism"));
    assert!(rendered.contains("disposed"));
}
