//! # Destroy Policies
//!
//! What happens to an entity's backend once its last reference is released.
//! The entity guarantees the policy runs exactly once, after every storage
//! was force-unmapped and outside the entity lock.

use parking_lot::Mutex;
use render_interop_core::{EntityId, InteropConfig, RecyclePool};

use super::RenderEntityBackend;

/// Teardown of a backend whose entity reached zero references.
pub trait DestroyPolicy<B>: Send + Sync {
    /// Takes ownership of the retired backend.
    fn destroy(&self, id: EntityId, backend: B);
}

/// Drops the backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct DropBackend;

impl<B: RenderEntityBackend> DestroyPolicy<B> for DropBackend {
    fn destroy(&self, id: EntityId, backend: B) {
        tracing::trace!(entity = %id, "backend dropped");
        drop(backend);
    }
}

/// Keeps retired backends for reuse by later entities of the same kind.
///
/// Backends that do not fit into the pool are dropped.
pub struct PooledReuse<B> {
    pool: Mutex<RecyclePool<B>>,
}

impl<B: RenderEntityBackend> PooledReuse<B> {
    /// Creates a policy holding up to `capacity` backends.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: Mutex::new(RecyclePool::new(capacity)),
        }
    }

    /// Creates a policy holding up to `pool_capacity` backends.
    #[must_use]
    pub fn from_config(config: &InteropConfig) -> Self {
        Self::new(config.pool_capacity.max(1))
    }

    /// Takes a retired backend, most recently retired first.
    #[must_use]
    pub fn take(&self) -> Option<B> {
        self.pool.lock().pop()
    }

    /// Number of backends waiting for reuse.
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.pool.lock().len()
    }
}

impl<B: RenderEntityBackend> DestroyPolicy<B> for PooledReuse<B> {
    fn destroy(&self, id: EntityId, backend: B) {
        if self.pool.lock().insert(backend).is_err() {
            tracing::debug!(entity = %id, "recycle pool full, backend dropped");
        }
    }
}
