//! Refcounted pool registry
//!
//! Strategies acquire pools by kind and name prefix; the registry builds
//! each pool on first acquire and shuts it down in the background when
//! the last acquirer releases it. Registries are cheap to clone and share
//! one pool map.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::pool::{PoolHandle, PoolKind};

struct PoolEntry {
    pool: PoolHandle,
    refs: usize,
}

/// Shared factory for named worker pools
///
/// Pool names follow `{prefix}.{role}`, e.g. `weir.cpu-intensive`. Two
/// strategies acquiring the same name share one pool; thread counts are
/// fixed by whoever creates the pool first.
#[derive(Clone, Default)]
pub struct PoolRegistry {
    pools: Arc<Mutex<HashMap<String, PoolEntry>>>,
}

impl PoolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a pool, building it on first use
    ///
    /// Increments the pool's reference count; every acquire must be paired
    /// with exactly one [`release`](Self::release).
    ///
    /// # Errors
    ///
    /// Returns [`crate::PoolError::Creation`] if a new runtime cannot be
    /// built.
    pub fn acquire(&self, kind: PoolKind, prefix: &str, threads: usize) -> Result<PoolHandle> {
        let name = format!("{}.{}", prefix, kind.role());
        let mut pools = self.pools.lock();

        if let Some(entry) = pools.get_mut(&name) {
            entry.refs += 1;
            tracing::debug!(pool = %name, refs = entry.refs, "pool reused");
            return Ok(entry.pool.clone());
        }

        let pool = PoolHandle::build(kind, name.clone(), threads)?;
        tracing::info!(pool = %name, threads = pool.threads(), "pool acquired");
        pools.insert(
            name,
            PoolEntry {
                pool: pool.clone(),
                refs: 1,
            },
        );
        Ok(pool)
    }

    /// Release one reference to a pool
    ///
    /// When the last reference is released the pool's runtime is shut down
    /// in the background and removed from the registry. Releasing an
    /// unknown name is a no-op.
    pub fn release(&self, name: &str) {
        let mut pools = self.pools.lock();

        let remaining = match pools.get_mut(name) {
            Some(entry) => {
                entry.refs -= 1;
                entry.refs
            }
            None => return,
        };

        if remaining == 0 {
            let entry = pools.remove(name);
            drop(pools);
            if let Some(entry) = entry {
                entry.pool.shutdown_background();
                tracing::info!(pool = %name, "pool released and shut down");
            }
        } else {
            tracing::debug!(pool = %name, refs = remaining, "pool released");
        }
    }

    /// Number of live pools
    pub fn pool_count(&self) -> usize {
        self.pools.lock().len()
    }

    /// Current reference count for a pool name, if the pool is live
    pub fn ref_count(&self, name: &str) -> Option<usize> {
        self.pools.lock().get(name).map(|e| e.refs)
    }
}

impl fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pools = self.pools.lock();
        f.debug_struct("PoolRegistry")
            .field("pools", &pools.keys().collect::<Vec<_>>())
            .finish()
    }
}
