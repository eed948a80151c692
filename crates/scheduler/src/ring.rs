//! Ring buffer dispatcher
//!
//! Bounded hand-off between submitters and the lane consumers. Each lane
//! is a fixed-capacity channel owned by exactly one consumer task; a unit
//! is routed to its lane by correlation id, so units sharing a
//! correlation always land on the same lane and keep their order.
//!
//! A full lane pushes back on the submitter through the configured wait
//! strategy instead of growing a queue.

use std::fmt;

use crossfire::mpsc;
use crossfire::{AsyncRx, MAsyncTx};

use weir_config::WaitStrategy;
use weir_flow::{CompletionCell, CorrelationId, UnitOfWork};

use crate::sink::InFlightSlot;
use crate::wait;

/// Everything a lane consumer needs to finish one unit
///
/// Dropping the job unresolved cancels the completion handle and gives
/// the in-flight slot back, so a job lost in a closed lane never leaks
/// capacity.
#[derive(Debug)]
pub(crate) struct LaneJob<T> {
    pub unit: UnitOfWork<T>,
    pub done: CompletionCell<T>,
    pub slot: InFlightSlot,
}

/// Fixed set of bounded lanes with correlation-stable routing
pub(crate) struct RingDispatcher<T> {
    lanes: Vec<MAsyncTx<Box<LaneJob<T>>>>,
    lane_capacity: usize,
    wait: WaitStrategy,
}

impl<T: Send + 'static> RingDispatcher<T> {
    /// Create the lanes and return the consumer ends
    ///
    /// Counts are clamped to at least one lane of capacity one.
    pub(crate) fn build(
        lane_count: usize,
        lane_capacity: usize,
        wait: WaitStrategy,
    ) -> (Self, Vec<AsyncRx<Box<LaneJob<T>>>>) {
        let lane_count = lane_count.max(1);
        let lane_capacity = lane_capacity.max(1);

        let mut lanes = Vec::with_capacity(lane_count);
        let mut receivers = Vec::with_capacity(lane_count);
        for _ in 0..lane_count {
            let (tx, rx) = mpsc::bounded_async::<Box<LaneJob<T>>>(lane_capacity);
            lanes.push(tx);
            receivers.push(rx);
        }

        (
            Self {
                lanes,
                lane_capacity,
                wait,
            },
            receivers,
        )
    }

    /// Queue a job on its lane, waiting out a full lane per the strategy
    ///
    /// Returns the job itself when the lane has shut down, so the caller
    /// can decide what to do with the unit.
    pub(crate) async fn submit(&self, job: LaneJob<T>) -> Result<(), LaneJob<T>> {
        let lane = self.lane_for(job.unit.correlation());
        let tx = &self.lanes[lane];
        wait::send_with_strategy(self.wait, tx, Box::new(job))
            .await
            .map_err(|job| *job)
    }

    /// The lane a correlation id maps to
    #[inline]
    pub(crate) fn lane_for(&self, correlation: CorrelationId) -> usize {
        (correlation.as_u64() % self.lanes.len() as u64) as usize
    }

    #[inline]
    pub(crate) fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    #[inline]
    pub(crate) fn lane_capacity(&self) -> usize {
        self.lane_capacity
    }

    #[inline]
    pub(crate) fn wait_strategy(&self) -> WaitStrategy {
        self.wait
    }
}

impl<T> fmt::Debug for RingDispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingDispatcher")
            .field("lanes", &self.lanes.len())
            .field("lane_capacity", &self.lane_capacity)
            .field("wait", &self.wait)
            .finish()
    }
}
