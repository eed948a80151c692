//! Backpressure sink
//!
//! Admission control in front of the ring. A unit claims an in-flight
//! slot before it enters its lane; the slot is given back exactly once
//! when the unit reaches a terminal outcome, whichever outcome that is.
//!
//! With a bounded ceiling the claim is a compare-and-swap loop, so the
//! counter can never overshoot the limit, not even transiently while
//! many producers race. Eager mode turns a full counter into an
//! immediate capacity error; non-eager mode parks the submitter until a
//! slot frees.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::error::{Result, SchedulerError};
use crate::governor::MaxConcurrency;

struct InFlightState {
    /// Units currently between admission and terminal outcome
    count: AtomicUsize,
    /// Ceiling; `None` counts without ever rejecting
    limit: Option<usize>,
    /// Reject at the ceiling instead of parking the submitter
    eager: bool,
    /// Signalled on every slot release
    freed: Notify,
}

/// In-flight admission gate shared by all producers of one strategy
///
/// Clones share the same counter. The sink hands out [`InFlightSlot`]
/// guards; holding a slot is what "in flight" means.
#[derive(Clone)]
pub struct BackpressureSink {
    shared: Arc<InFlightState>,
}

impl BackpressureSink {
    /// Create a sink for the given ceiling
    pub fn new(max_concurrency: MaxConcurrency, eager_limit_check: bool) -> Self {
        Self {
            shared: Arc::new(InFlightState {
                count: AtomicUsize::new(0),
                limit: max_concurrency.limit(),
                eager: eager_limit_check,
                freed: Notify::new(),
            }),
        }
    }

    /// Claim a slot without waiting
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::CapacityExceeded`] if the counter sits at
    /// the ceiling.
    pub fn try_admit(&self) -> Result<InFlightSlot> {
        if self.try_claim() {
            Ok(self.slot())
        } else {
            Err(SchedulerError::CapacityExceeded {
                limit: self.shared.limit.unwrap_or(0),
            })
        }
    }

    /// Claim a slot, honouring the eager flag
    ///
    /// Eager mode fails fast at the ceiling; non-eager mode parks until a
    /// release frees a slot and never returns a capacity error.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::CapacityExceeded`] in eager mode at the
    /// ceiling.
    pub async fn admit(&self) -> Result<InFlightSlot> {
        if self.try_claim() {
            return Ok(self.slot());
        }

        if self.shared.eager {
            return Err(SchedulerError::CapacityExceeded {
                limit: self.shared.limit.unwrap_or(0),
            });
        }

        loop {
            // Register for the wakeup before re-checking, so a release
            // landing between the check and the await still wakes us.
            let notified = self.shared.freed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_claim() {
                return Ok(self.slot());
            }

            notified.await;
        }
    }

    /// Wait until every admitted unit has released its slot
    ///
    /// Disposal calls this after stopping the lanes; queued units release
    /// through their dropped slots, so the wait always terminates.
    pub async fn drain(&self) {
        loop {
            let notified = self.shared.freed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }

            notified.await;
        }
    }

    /// Units currently holding a slot
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.shared.count.load(Ordering::Acquire)
    }

    /// The configured ceiling, if bounded
    #[inline]
    pub fn limit(&self) -> Option<usize> {
        self.shared.limit
    }

    /// Whether the ceiling rejects eagerly
    #[inline]
    pub fn is_eager(&self) -> bool {
        self.shared.eager
    }

    /// Claim one slot if the ceiling allows it
    fn try_claim(&self) -> bool {
        let limit = match self.shared.limit {
            Some(limit) => limit,
            None => {
                self.shared.count.fetch_add(1, Ordering::AcqRel);
                return true;
            }
        };

        let mut current = self.shared.count.load(Ordering::Acquire);
        loop {
            if current >= limit {
                return false;
            }
            match self.shared.count.compare_exchange(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    fn slot(&self) -> InFlightSlot {
        InFlightSlot {
            shared: Arc::clone(&self.shared),
            released: AtomicBool::new(false),
        }
    }
}

impl fmt::Debug for BackpressureSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackpressureSink")
            .field("in_flight", &self.in_flight())
            .field("limit", &self.shared.limit)
            .field("eager", &self.shared.eager)
            .finish()
    }
}

/// One claimed in-flight slot
///
/// Releasing is single-shot: the explicit [`release`](Self::release) on
/// the terminal path and the `Drop` backstop for abandoned units share
/// one guard, so the counter decrements exactly once per admission.
pub struct InFlightSlot {
    shared: Arc<InFlightState>,
    released: AtomicBool,
}

impl InFlightSlot {
    /// Give the slot back and wake parked submitters
    ///
    /// Calling this more than once is a no-op.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.shared.count.fetch_sub(1, Ordering::AcqRel);
            self.shared.freed.notify_waiters();
        }
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for InFlightSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightSlot")
            .field("released", &self.released.load(Ordering::Acquire))
            .finish()
    }
}
