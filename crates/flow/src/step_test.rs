//! Tests for PipelineStep, ProcessingKind and Pipeline

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::step::{Pipeline, PipelineStep, ProcessingKind};
use crate::unit::{CorrelationId, UnitOfWork};
use crate::{StepError, StepResult};

// =============================================================================
// Test Helpers
// =============================================================================

/// Step that appends its name to a string payload
struct TagStep {
    name: &'static str,
    kind: ProcessingKind,
}

impl PipelineStep<String> for TagStep {
    fn process<'a>(
        &'a self,
        unit: UnitOfWork<String>,
    ) -> Pin<Box<dyn Future<Output = StepResult<UnitOfWork<String>>> + Send + 'a>> {
        Box::pin(async move { Ok(unit.map(|s| format!("{}:{}", s, self.name))) })
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> ProcessingKind {
        self.kind
    }
}

/// Step that always fails
struct FailingStep;

impl PipelineStep<String> for FailingStep {
    fn process<'a>(
        &'a self,
        _unit: UnitOfWork<String>,
    ) -> Pin<Box<dyn Future<Output = StepResult<UnitOfWork<String>>> + Send + 'a>> {
        Box::pin(async move { Err(StepError::new("failing", "always fails")) })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

fn tag(name: &'static str, kind: ProcessingKind) -> Arc<dyn PipelineStep<String>> {
    Arc::new(TagStep { name, kind })
}

// =============================================================================
// ProcessingKind tests
// =============================================================================

#[test]
fn test_kind_names() {
    assert_eq!(ProcessingKind::Light.as_str(), "light");
    assert_eq!(ProcessingKind::CpuIntensive.as_str(), "cpu-intensive");
    assert_eq!(ProcessingKind::Blocking.as_str(), "blocking");
}

#[test]
fn test_kind_display_matches_as_str() {
    assert_eq!(
        ProcessingKind::CpuIntensive.to_string(),
        ProcessingKind::CpuIntensive.as_str()
    );
}

#[test]
fn test_default_kind_is_light() {
    assert_eq!(FailingStep.kind(), ProcessingKind::Light);
}

// =============================================================================
// Pipeline tests
// =============================================================================

#[test]
fn test_pipeline_names_in_order() {
    let pipeline = Pipeline::new(vec![
        tag("first", ProcessingKind::Light),
        tag("second", ProcessingKind::CpuIntensive),
        tag("third", ProcessingKind::Blocking),
    ]);

    assert_eq!(pipeline.len(), 3);
    assert!(!pipeline.is_empty());
    assert_eq!(pipeline.names(), vec!["first", "second", "third"]);
}

#[test]
fn test_empty_pipeline() {
    let pipeline = Pipeline::<String>::empty();
    assert!(pipeline.is_empty());
    assert_eq!(pipeline.len(), 0);
}

#[test]
fn test_pipeline_clone_shares_steps() {
    let step = tag("shared", ProcessingKind::Light);
    let pipeline = Pipeline::new(vec![Arc::clone(&step)]);
    let cloned = pipeline.clone();

    assert!(Arc::ptr_eq(&pipeline.steps()[0], &cloned.steps()[0]));
}

#[tokio::test]
async fn test_step_transforms_unit() {
    let step = tag("upper", ProcessingKind::Light);
    let unit = UnitOfWork::new(CorrelationId::new(1), "seed".to_string());

    let out = step.process(unit).await.unwrap();
    assert_eq!(out.payload(), "seed:upper");
    assert_eq!(out.correlation().as_u64(), 1);
}

#[tokio::test]
async fn test_failing_step_reports_name() {
    let unit = UnitOfWork::new(CorrelationId::new(1), "seed".to_string());
    let err = FailingStep.process(unit).await.unwrap_err();
    assert_eq!(err.step, "failing");
}
