//! Admin-facing use cases over the pool list itself: `pools` and `show`.

use crate::registry::PoolRegistry;
use buildpool_domain::{Item, PoolName, PoolSnapshot};

/// List every pool name the registry has created so far, sorted.
///
/// A pool only appears here once some job has been submitted to it or some
/// worker has registered against it; an empty registry returns an empty list.
pub async fn admin_list_pools<I: Item>(registry: &PoolRegistry<I>) -> Vec<PoolName> {
    registry.pool_names().await
}

/// Snapshot `pool_name`'s backlog and worker state for an admin `show` call.
///
/// Naming a pool that has never been used creates it (empty, no workers) as
/// a side effect, the same way `submit_job`/`register_worker` do; the
/// returned snapshot simply reports zero backlog and no workers in that case.
pub async fn admin_pool_snapshot<I: Item>(registry: &PoolRegistry<I>, pool_name: &PoolName) -> PoolSnapshot {
    registry.pool(pool_name).await.snapshot().await
}
