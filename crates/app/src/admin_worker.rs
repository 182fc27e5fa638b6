//! Admin-facing use cases over individual workers: `set-active` and `update`.

use crate::registry::PoolRegistry;
use buildpool_domain::{Item, PoolName, WorkerName};
use buildpool_shared::{timeout_with_context, RequestContext, Result};
use std::time::Duration;

/// Force `worker_name` active or inactive from an admin surface, bypassing
/// the worker's own self-reported state.
pub async fn admin_set_worker_active<I: Item>(
    registry: &PoolRegistry<I>,
    pool_name: &PoolName,
    worker_name: &WorkerName,
    active: bool,
) -> Result<()> {
    let pool = registry.pool(pool_name).await;
    pool.set_active(worker_name, active).await?;
    Ok(())
}

/// Ask `worker_name` to self-update: deactivate it, then wait for it to
/// release its old registration and re-register under the same name within
/// `timeout_ms`, honoring `ctx` cancellation the same way any other bounded
/// wait does.
///
/// The reconnect waiter is registered *before* deactivation so a worker that
/// releases and re-registers immediately after being deactivated can never
/// race past the wait and leave it hanging forever.
pub async fn admin_update_worker<I: Item>(
    registry: &PoolRegistry<I>,
    ctx: &RequestContext,
    pool_name: &PoolName,
    worker_name: &WorkerName,
    timeout_ms: u64,
) -> Result<()> {
    let pool = registry.pool(pool_name).await;
    let notify = registry.reconnect_waiter(pool_name.clone(), worker_name.clone()).await;

    pool.set_active(worker_name, false).await?;

    let waited = timeout_with_context(ctx, Duration::from_millis(timeout_ms), "admin_update_worker", async {
        notify.notified().await;
        Ok(())
    })
    .await;

    registry.forget_reconnect_waiter(pool_name, worker_name).await;
    waited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register_worker::register_worker;
    use buildpool_domain::{CacheHint, CostEstimate};
    use buildpool_testkit::in_memory::{InMemoryCacheDao, NoopLogger, NoopTelemetry};
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

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
    async fn set_active_on_an_unknown_worker_fails() {
        let registry = registry();
        let pool_name = PoolName::parse("ci").expect("valid");
        let worker_name = WorkerName::parse("ghost").expect("valid");

        let result = admin_set_worker_active(&registry, &pool_name, &worker_name, true).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn update_times_out_when_the_worker_never_reconnects() {
        let registry = registry();
        let pool_name = PoolName::parse("ci").expect("valid");
        let worker_name = WorkerName::parse("w1").expect("valid");
        register_worker(&registry, &pool_name, worker_name.clone()).await.expect("register");

        let ctx = RequestContext::new_request();
        let result = admin_update_worker(&registry, &ctx, &pool_name, &worker_name, 10).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn update_succeeds_once_the_worker_re_registers() {
        let registry = registry();
        let pool_name = PoolName::parse("ci").expect("valid");
        let worker_name = WorkerName::parse("w1").expect("valid");
        register_worker(&registry, &pool_name, worker_name.clone()).await.expect("register");

        let ctx = RequestContext::new_request();
        let waiting = {
            let registry = registry.clone();
            let pool_name = pool_name.clone();
            let worker_name = worker_name.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { admin_update_worker(&registry, &ctx, &pool_name, &worker_name, 5_000).await })
        };

        tokio::time::sleep(StdDuration::from_millis(20)).await;
        registry.pool(&pool_name).await.release(&worker_name).await.expect("release before reconnect");
        register_worker(&registry, &pool_name, worker_name.clone()).await.expect("reconnect");

        let result = tokio::time::timeout(StdDuration::from_secs(1), waiting)
            .await
            .expect("update should not hang")
            .expect("join");
        assert!(result.is_ok());
    }
}
