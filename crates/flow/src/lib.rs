//! Weir Flow - core types for units of work and pipeline steps
//!
//! This crate provides the foundational types that flow through the
//! scheduler:
//! - `UnitOfWork` - an opaque payload plus its correlation identifier
//! - `CorrelationId` - stable identifier used for lane assignment and
//!   diagnostics
//! - `PipelineStep` - a processing step with a declared
//!   `ProcessingKind` classification
//! - `Pipeline` - an ordered chain of steps applied to each unit
//! - `Outcome` / `CompletionHandle` - per-unit completion surface
//! - `TransactionProbe` - collaborator reporting whether the submitting
//!   context runs under an active transaction
//!
//! # Design Principles
//!
//! - **Payload is opaque**: the scheduler never inspects or mutates the
//!   payload, only its execution context
//! - **Classification is fixed**: a step's `ProcessingKind` is declared at
//!   construction time and never changes during execution
//! - **Completion resolves exactly once**: the completion cell is consumed
//!   on resolution; dropping it resolves the handle as `Cancelled`

mod error;
mod step;
mod txn;
mod unit;

pub use error::StepError;
pub use step::{Pipeline, PipelineStep, ProcessingKind};
pub use txn::{NoTransaction, TransactionProbe};
pub use unit::{completion, CompletionCell, CompletionHandle, CorrelationId, Outcome, UnitOfWork};

/// Result type for pipeline step execution
pub type StepResult<T> = std::result::Result<T, StepError>;

// Test modules - only compiled during testing
#[cfg(test)]
mod step_test;
