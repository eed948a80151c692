//! Weir Exec - named worker pools for the processing-strategy scheduler
//!
//! Pools are dedicated tokio runtimes with named threads, created lazily
//! through the [`PoolRegistry`] and shared across strategy instances:
//!
//! ```text
//! PoolRegistry (refcounted)
//!   ├── "{prefix}.event-loop"     - small, sequences pipeline steps
//!   ├── "{prefix}.cpu-intensive"  - CPU-bound step hand-offs
//!   └── "{prefix}.blocking"       - blocking/IO step hand-offs
//! ```
//!
//! # Key Design
//!
//! - **Lazy construction**: a pool is built on first acquire; later
//!   acquires of the same name share it
//! - **Refcounted disposal**: the runtime is shut down in the background
//!   when the last acquirer releases it
//! - **Cancellable hand-offs**: [`PoolHandle::run`] aborts the pool-side
//!   task if the awaiting caller is dropped, so cancelling a lane cancels
//!   its in-progress hand-off
//! - **Observable threads**: every pool thread carries the pool name, and
//!   the optional [`ThreadLogger`] records which thread executed which
//!   unit

mod error;
mod pool;
mod registry;
mod thread_log;

pub use error::{PoolError, Result};
pub use pool::{PoolHandle, PoolKind};
pub use registry::PoolRegistry;
pub use thread_log::{ThreadLogger, ThreadVisit};
