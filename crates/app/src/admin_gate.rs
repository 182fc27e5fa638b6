//! Admin-facing use cases over the active gate: `gate-get` and `gate-set`.

use crate::registry::PoolRegistry;
use buildpool_domain::{Item, PoolName};

/// Open or close `pool_name`'s active gate.
///
/// The gate is shared process-wide across every pool the registry hands out
/// (see `crate::registry` and DESIGN.md); naming any pool here affects every
/// other pool's submitters and workers too.
pub async fn admin_set_gate_active<I: Item>(registry: &PoolRegistry<I>, pool_name: &PoolName, active: bool) {
    registry.pool(pool_name).await.set_gate_active(active).await;
}

/// Read the current state of the active gate.
pub async fn admin_gate_is_active<I: Item>(registry: &PoolRegistry<I>, pool_name: &PoolName) -> bool {
    registry.pool(pool_name).await.gate_is_active().await
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
    async fn gate_starts_active_and_can_be_closed_and_reopened() {
        let registry = registry();
        let pool_name = PoolName::parse("ci").expect("valid");

        assert!(admin_gate_is_active(&registry, &pool_name).await);

        admin_set_gate_active(&registry, &pool_name, false).await;
        assert!(!admin_gate_is_active(&registry, &pool_name).await);

        admin_set_gate_active(&registry, &pool_name, true).await;
        assert!(admin_gate_is_active(&registry, &pool_name).await);
    }

    #[tokio::test]
    async fn the_gate_is_shared_across_every_pool_in_the_registry() {
        let registry = registry();
        let pool_a = PoolName::parse("ci").expect("valid");
        let pool_b = PoolName::parse("release").expect("valid");

        admin_set_gate_active(&registry, &pool_a, false).await;
        assert!(!admin_gate_is_active(&registry, &pool_b).await);
    }
}
