//! Submitter-facing use case: submit an item into a named pool.

use crate::registry::PoolRegistry;
use buildpool_domain::{Item, PoolName};
use buildpool_pool::Ticket;

/// Submit `item` into `pool_name`, creating the pool if this is its first
/// submission. Never suspends beyond the pool's own bounded cache lookup
/// (see `buildpool_pool::Pool::submit`).
pub async fn submit_job<I: Item>(registry: &PoolRegistry<I>, pool_name: &PoolName, urgent: bool, item: I) -> Ticket<I> {
    let pool = registry.pool(pool_name).await;
    pool.submit(urgent, item).await
}
