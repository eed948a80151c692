//! Unit of work and its completion surface
//!
//! A `UnitOfWork` wraps an opaque payload together with the
//! `CorrelationId` the scheduler uses for lane assignment and
//! diagnostics. Completion is reported through a one-shot
//! `CompletionCell`/`CompletionHandle` pair created by [`completion`].

use std::fmt;

use tokio::sync::oneshot;

use crate::error::StepError;

/// Correlation identifier carried by every unit of work
///
/// Units sharing a correlation identifier are assigned to the same lane,
/// which preserves their relative ordering. The identifier is also the key
/// under which diagnostic thread visits are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Create a correlation identifier from a raw value
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw identifier value
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CorrelationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A unit of work travelling through the pipeline
///
/// The payload is opaque to the scheduler; steps receive the whole unit
/// and return it (possibly with a transformed payload). The correlation
/// identifier never changes while the unit is in flight.
#[derive(Debug, Clone)]
pub struct UnitOfWork<T> {
    correlation: CorrelationId,
    payload: T,
}

impl<T> UnitOfWork<T> {
    /// Create a unit of work with the given correlation identifier
    pub fn new(correlation: CorrelationId, payload: T) -> Self {
        Self {
            correlation,
            payload,
        }
    }

    /// Correlation identifier of this unit
    #[inline]
    pub fn correlation(&self) -> CorrelationId {
        self.correlation
    }

    /// Borrow the payload
    #[inline]
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Mutably borrow the payload
    #[inline]
    pub fn payload_mut(&mut self) -> &mut T {
        &mut self.payload
    }

    /// Consume the unit, returning the payload
    pub fn into_payload(self) -> T {
        self.payload
    }

    /// Replace the payload, keeping the correlation identifier
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> UnitOfWork<U> {
        UnitOfWork {
            correlation: self.correlation,
            payload: f(self.payload),
        }
    }
}

/// Terminal outcome of a submitted unit
#[derive(Debug)]
pub enum Outcome<T> {
    /// All steps completed; carries the final unit
    Completed(UnitOfWork<T>),
    /// A step failed; the unit is dropped
    Failed(StepError),
    /// The strategy was disposed before the unit resolved
    Cancelled,
}

impl<T> Outcome<T> {
    /// Whether the unit completed all steps
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    /// Whether a step failed
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// Whether the unit was cancelled mid-flight
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// Consume the outcome, returning the completed unit if any
    pub fn into_completed(self) -> Option<UnitOfWork<T>> {
        match self {
            Outcome::Completed(unit) => Some(unit),
            _ => None,
        }
    }
}

/// Create a linked completion cell/handle pair
///
/// The cell travels with the unit through the scheduler and is consumed
/// when the unit reaches a terminal outcome. The handle stays with the
/// submitter and resolves exactly once.
pub fn completion<T>() -> (CompletionCell<T>, CompletionHandle<T>) {
    let (tx, rx) = oneshot::channel();
    (CompletionCell { tx }, CompletionHandle { rx })
}

/// Scheduler-side end of the completion surface
///
/// Consumed on resolution. Dropping the cell without resolving it makes
/// the paired handle observe `Outcome::Cancelled`.
pub struct CompletionCell<T> {
    tx: oneshot::Sender<Outcome<T>>,
}

impl<T> CompletionCell<T> {
    /// Resolve the unit as completed
    pub fn complete(self, unit: UnitOfWork<T>) {
        let _ = self.tx.send(Outcome::Completed(unit));
    }

    /// Resolve the unit as failed
    pub fn fail(self, error: StepError) {
        let _ = self.tx.send(Outcome::Failed(error));
    }
}

impl<T> fmt::Debug for CompletionCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionCell").finish()
    }
}

/// Submitter-side end of the completion surface
pub struct CompletionHandle<T> {
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> CompletionHandle<T> {
    /// Wait for the unit's terminal outcome
    ///
    /// Resolves as `Cancelled` if the scheduler dropped the unit without
    /// resolving it (strategy disposal mid-flight).
    pub async fn outcome(self) -> Outcome<T> {
        self.rx.await.unwrap_or(Outcome::Cancelled)
    }
}

impl<T> fmt::Debug for CompletionHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandle").finish()
    }
}
