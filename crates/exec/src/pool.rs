//! Worker pools backed by dedicated tokio runtimes
//!
//! Each pool owns a multi-thread runtime whose threads all carry the pool
//! name, so diagnostic thread identities are meaningful. Handles are
//! cheap to clone; the runtime itself lives until
//! [`PoolHandle::shutdown_background`] or the last handle drops.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::{JoinError, JoinHandle};

use crate::error::{PoolError, Result};

/// Role of a worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Small pool that sequences pipeline steps
    EventLoop,
    /// Pool for CPU-bound step hand-offs
    CpuIntensive,
    /// Pool for blocking/IO step hand-offs
    Blocking,
}

impl PoolKind {
    /// Role suffix used in pool and thread names
    pub fn role(&self) -> &'static str {
        match self {
            PoolKind::EventLoop => "event-loop",
            PoolKind::CpuIntensive => "cpu-intensive",
            PoolKind::Blocking => "blocking",
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role())
    }
}

struct PoolInner {
    name: String,
    kind: PoolKind,
    threads: usize,
    /// Taken on shutdown; `None` once the runtime is being torn down
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        // shutdown_background never blocks, so dropping the last handle
        // inside an async context is safe
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
    }
}

/// Handle to a named worker pool
///
/// Clones share the same runtime. Acquire handles through
/// [`crate::PoolRegistry`] so disposal is refcounted across strategies.
#[derive(Clone)]
pub struct PoolHandle {
    inner: Arc<PoolInner>,
}

impl PoolHandle {
    /// Build a pool with the given name and thread count
    ///
    /// Every thread of the pool is named after the pool itself.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Creation`] if the runtime cannot be built.
    pub fn build(kind: PoolKind, name: impl Into<String>, threads: usize) -> Result<Self> {
        let name = name.into();
        let threads = threads.max(1);

        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name(&name)
            .enable_all()
            .build()
            .map_err(|e| PoolError::Creation {
                name: name.clone(),
                source: e,
            })?;

        let handle = runtime.handle().clone();

        tracing::debug!(pool = %name, threads = threads, "worker pool created");

        Ok(Self {
            inner: Arc::new(PoolInner {
                name,
                kind,
                threads,
                runtime: Mutex::new(Some(runtime)),
                handle,
            }),
        })
    }

    /// Pool name (also the name of every pool thread)
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Role of this pool
    #[inline]
    pub fn kind(&self) -> PoolKind {
        self.inner.kind
    }

    /// Number of worker threads
    #[inline]
    pub fn threads(&self) -> usize {
        self.inner.threads
    }

    /// Whether the pool's runtime is still running
    pub fn is_active(&self) -> bool {
        self.inner.runtime.lock().is_some()
    }

    /// Spawn a long-lived task onto the pool
    ///
    /// Used for lane loops; the task keeps running until it finishes or
    /// the pool shuts down.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.inner.handle.spawn(future)
    }

    /// Run a future on the pool and await its result
    ///
    /// This is the hand-off primitive: the caller suspends while the pool
    /// executes the future, then resumes with the result. If the caller is
    /// dropped mid-await, the pool-side task is aborted.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::TaskPanicked`] if the future panicked, or
    /// [`PoolError::TaskCancelled`] if the pool shut down underneath it.
    pub async fn run<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let mut task = AbortOnDrop::new(self.inner.handle.spawn(future));
        task.join()
            .await
            .map_err(|e| PoolError::from_join(&self.inner.name, e))
    }

    /// Shut the pool's runtime down without blocking
    ///
    /// Outstanding tasks are dropped at their next yield point. Called by
    /// the registry when the last acquirer releases the pool.
    pub fn shutdown_background(&self) {
        if let Some(runtime) = self.inner.runtime.lock().take() {
            runtime.shutdown_background();
            tracing::debug!(pool = %self.inner.name, "worker pool shut down");
        }
    }
}

impl fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHandle")
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .field("threads", &self.inner.threads)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Join guard that aborts the pool-side task when dropped mid-await
///
/// Aborting an already-finished task is a no-op, so the guard needs no
/// disarming after a successful join.
struct AbortOnDrop<T> {
    handle: JoinHandle<T>,
}

impl<T> AbortOnDrop<T> {
    fn new(handle: JoinHandle<T>) -> Self {
        Self { handle }
    }

    async fn join(&mut self) -> std::result::Result<T, JoinError> {
        (&mut self.handle).await
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
