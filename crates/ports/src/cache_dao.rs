//! The cache-locality DAO port.
//!
//! Persists which workers have previously accepted items carrying a given
//! cache hint, so the pool can bias placement toward a worker that is
//! already "warm" for that hint. See the `cached` table schema in the
//! adapters crate for the concrete persisted shape.

use crate::BoxFuture;
use buildpool_domain::{CacheHint, PoolName, WorkerName};
use buildpool_shared::Result;

/// Boundary contract for the cache-locality store.
///
/// Implementations must tolerate concurrent `mark_cached`/`query_cache` calls
/// without surprising each other (insert-or-replace plus a sorted select);
/// the pool core serializes its own mutations but does not serialize calls
/// into this port beyond what a single call site naturally does.
pub trait CacheDao: Send + Sync {
    /// Record that `worker` has accepted an item carrying `hint` for `pool`.
    /// Insert-or-replace semantics: calling this again for the same triple
    /// just refreshes the `created` timestamp.
    fn mark_cached(
        &self,
        pool: PoolName,
        hint: CacheHint,
        worker: WorkerName,
    ) -> BoxFuture<'_, Result<()>>;

    /// Return every worker ever marked for `(pool, hint)`, sorted by name.
    fn query_cache(&self, pool: PoolName, hint: CacheHint) -> BoxFuture<'_, Result<Vec<WorkerName>>>;
}
