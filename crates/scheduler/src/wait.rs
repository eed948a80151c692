//! Producer-side wait strategies
//!
//! What a submitter does while its lane is full. The four strategies trade
//! submission latency against CPU burned while waiting; none of them ever
//! drops a unit, a full lane only delays the producer.
//!
//! Rendered for async lanes: "parking" is awaiting the channel's send
//! future, "spinning" is bounded `try_send` retries with spin-loop hints,
//! and "sleeping" backs off through progressively longer timer waits.

use std::time::Duration;

use crossfire::{MAsyncTx, TrySendError};
use weir_config::WaitStrategy;

/// try_send retries before a spinning strategy starts yielding
const SPIN_RETRIES: u32 = 100;
/// Yields before the sleeping strategy starts timed backoff
const YIELD_RETRIES: u32 = 100;
/// First timer wait of the sleeping strategy
const INITIAL_SLEEP: Duration = Duration::from_micros(10);
/// Backoff ceiling of the sleeping strategy
const MAX_SLEEP: Duration = Duration::from_millis(1);

/// Send a value into a lane, waiting out a full buffer per the strategy
///
/// Returns the value back if the lane is disconnected (the consumer side
/// has shut down); a full lane is never an error.
pub(crate) async fn send_with_strategy<J>(
    strategy: WaitStrategy,
    tx: &MAsyncTx<J>,
    value: J,
) -> Result<(), J>
where
    J: Unpin + Send + 'static,
{
    match strategy {
        WaitStrategy::Blocking => tx.send(value).await.map_err(|e| e.0),
        WaitStrategy::BusySpin => busy_spin_send(tx, value).await,
        WaitStrategy::Yielding => yielding_send(tx, value).await,
        WaitStrategy::Sleeping => sleeping_send(tx, value).await,
    }
}

/// Hot spin: retry as fast as the scheduler allows
///
/// Yields to the runtime between attempts so a full lane cannot starve
/// the consumer tasks that would free it.
async fn busy_spin_send<J>(tx: &MAsyncTx<J>, mut value: J) -> Result<(), J>
where
    J: Unpin + Send + 'static,
{
    loop {
        match tx.try_send(value) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(v)) => {
                value = v;
                std::hint::spin_loop();
                tokio::task::yield_now().await;
            }
            Err(TrySendError::Disconnected(v)) => return Err(v),
        }
    }
}

/// Bounded spin, then cooperative yields
async fn yielding_send<J>(tx: &MAsyncTx<J>, mut value: J) -> Result<(), J>
where
    J: Unpin + Send + 'static,
{
    let mut attempts: u32 = 0;
    loop {
        match tx.try_send(value) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(v)) => {
                value = v;
                attempts = attempts.saturating_add(1);
                if attempts <= SPIN_RETRIES {
                    std::hint::spin_loop();
                } else {
                    tokio::task::yield_now().await;
                }
            }
            Err(TrySendError::Disconnected(v)) => return Err(v),
        }
    }
}

/// Bounded spin, bounded yields, then progressive timer backoff
async fn sleeping_send<J>(tx: &MAsyncTx<J>, mut value: J) -> Result<(), J>
where
    J: Unpin + Send + 'static,
{
    let mut attempts: u32 = 0;
    let mut delay = INITIAL_SLEEP;
    loop {
        match tx.try_send(value) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(v)) => {
                value = v;
                attempts = attempts.saturating_add(1);
                if attempts <= SPIN_RETRIES {
                    std::hint::spin_loop();
                } else if attempts <= SPIN_RETRIES + YIELD_RETRIES {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_SLEEP);
                }
            }
            Err(TrySendError::Disconnected(v)) => return Err(v),
        }
    }
}
