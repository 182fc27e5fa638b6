//! Worker-facing use case: register a worker within a named pool.

use crate::registry::PoolRegistry;
use buildpool_domain::{Item, PoolName, WorkerName};
use buildpool_pool::WorkerHandle;
use buildpool_shared::Result;

/// Register `worker_name` in `pool_name`. Fails with `pool:name_taken`
/// (wrapped as an `ErrorEnvelope`) if the name is already registered.
///
/// Also wakes any admin `update_worker` call waiting for this exact
/// `(pool, worker)` pair to reconnect (see `crate::admin_worker`).
pub async fn register_worker<I: Item>(
    registry: &PoolRegistry<I>,
    pool_name: &PoolName,
    worker_name: WorkerName,
) -> Result<WorkerHandle<I>> {
    let pool = registry.pool(pool_name).await;
    let handle = pool.register(worker_name.clone()).await?;
    registry.notify_reconnect(pool_name, &worker_name).await;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildpool_domain::{CacheHint, CostEstimate};
    use buildpool_testkit::in_memory::{InMemoryCacheDao, NoopLogger, NoopTelemetry};
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct TestItem;

    impl Item for TestItem {
        fn cache_hint(&self) -> &CacheHint {
            static NONE: std::sync::OnceLock<CacheHint> = std::sync::OnceLock::new();
            NONE.get_or_init(CacheHint::none)
        }

        fn cost_estimate(&self) -> CostEstimate {
            CostEstimate::uniform(1)
        }

        fn display_form(&self) -> String {
            "test".to_owned()
        }
    }

    fn registry() -> PoolRegistry<TestItem> {
        PoolRegistry::new(Arc::new(InMemoryCacheDao::new()), Arc::new(NoopTelemetry), Arc::new(NoopLogger))
    }

    #[tokio::test]
    async fn registering_twice_fails_with_name_taken() {
        let registry = registry();
        let pool_name = PoolName::parse("ci").expect("valid");
        let worker_name = WorkerName::parse("w1").expect("valid");

        register_worker(&registry, &pool_name, worker_name.clone()).await.expect("first register");
        let error = register_worker(&registry, &pool_name, worker_name)
            .await
            .expect_err("second register should fail");
        assert_eq!(error.code, buildpool_shared::ErrorCode::new("pool", "name_taken"));
    }
}
