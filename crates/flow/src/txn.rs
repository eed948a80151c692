//! Transaction context probe
//!
//! The scheduler's hand-off discipline is incompatible with transactional
//! (thread-pinned) execution, so every submission is checked against a
//! `TransactionProbe` before admission.

/// Collaborator reporting whether the submitting context runs under an
/// active transaction
///
/// Probed on the submitting task before a unit is admitted. A `true`
/// answer fails the submission with a configuration error before any step
/// executes.
pub trait TransactionProbe: Send + Sync {
    /// Whether an active transaction is bound to the submitting context
    fn in_transaction(&self) -> bool;
}

/// Default probe for callers without transactional semantics
///
/// Always reports no active transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransaction;

impl TransactionProbe for NoTransaction {
    fn in_transaction(&self) -> bool {
        false
    }
}
