//! In-memory stand-ins for the boundary ports, for use in tests that don't
//! want to pull in the real SQLite/JSON-sink adapters.

use buildpool_domain::{CacheHint, PoolName, WorkerName};
use buildpool_ports::{
    BoxFuture, CacheDao, LogEvent, LogFields, LoggerPort, TelemetryPort, TelemetryTags,
    TelemetryTimer,
};
use buildpool_shared::Result;
use std::sync::Mutex;

/// A `LoggerPort` that discards every event. Useful when a test only cares
/// about scheduler behavior, not log output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: LogFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// A `TelemetryTimer` that discards its stop event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTimer;

impl TelemetryTimer for NoopTimer {
    fn stop(&self) {}
}

/// A `TelemetryPort` that discards every counter, timer, and gauge.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetryPort for NoopTelemetry {
    fn increment_counter(&self, _name: &str, _value: u64, _tags: Option<&TelemetryTags>) {}

    fn record_timer_ms(&self, _name: &str, _duration_ms: u64, _tags: Option<&TelemetryTags>) {}

    fn start_timer(&self, _name: &str, _tags: Option<&TelemetryTags>) -> Box<dyn TelemetryTimer> {
        Box::new(NoopTimer)
    }

    fn record_gauge(&self, _name: &str, _value: i64, _tags: Option<&TelemetryTags>) {}
}

/// A `CacheDao` backed by a plain `Vec` behind a mutex, mirroring the
/// insert-or-replace-plus-sorted-select contract the real SQLite adapter
/// implements (see `buildpool-adapters::cache::SqliteCacheDao`), without
/// touching disk.
#[derive(Debug, Default)]
pub struct InMemoryCacheDao {
    entries: Mutex<Vec<(PoolName, CacheHint, WorkerName)>>,
}

impl InMemoryCacheDao {
    /// Build an empty in-memory cache table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently recorded, for test assertions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the table is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(PoolName, CacheHint, WorkerName)>> {
        self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CacheDao for InMemoryCacheDao {
    fn mark_cached(&self, pool: PoolName, hint: CacheHint, worker: WorkerName) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut entries = self.lock();
            entries.retain(|(p, h, w)| !(p == &pool && h == &hint && w == &worker));
            entries.push((pool, hint, worker));
            Ok(())
        })
    }

    fn query_cache(&self, pool: PoolName, hint: CacheHint) -> BoxFuture<'_, Result<Vec<WorkerName>>> {
        Box::pin(async move {
            let entries = self.lock();
            let mut workers: Vec<WorkerName> = entries
                .iter()
                .filter(|(p, h, _)| p == &pool && h == &hint)
                .map(|(_, _, w)| w.clone())
                .collect();
            workers.sort();
            workers.dedup();
            Ok(workers)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(name: &str) -> PoolName {
        PoolName::parse(name).expect("pool name")
    }

    fn worker(name: &str) -> WorkerName {
        WorkerName::parse(name).expect("worker name")
    }

    #[tokio::test]
    async fn mark_then_query_round_trips() {
        let dao = InMemoryCacheDao::new();
        dao.mark_cached(pool("builds"), CacheHint::new("a"), worker("alpha")).await.expect("mark");

        let found = dao.query_cache(pool("builds"), CacheHint::new("a")).await.expect("query");
        assert_eq!(found, vec![worker("alpha")]);
    }

    #[tokio::test]
    async fn marking_again_refreshes_rather_than_duplicates() {
        let dao = InMemoryCacheDao::new();
        dao.mark_cached(pool("builds"), CacheHint::new("a"), worker("alpha")).await.expect("mark once");
        dao.mark_cached(pool("builds"), CacheHint::new("a"), worker("alpha")).await.expect("mark twice");

        assert_eq!(dao.len(), 1);
    }

    #[tokio::test]
    async fn query_is_scoped_by_pool_and_hint() {
        let dao = InMemoryCacheDao::new();
        dao.mark_cached(pool("builds"), CacheHint::new("a"), worker("alpha")).await.expect("mark");
        dao.mark_cached(pool("other"), CacheHint::new("a"), worker("bravo")).await.expect("mark");

        let found = dao.query_cache(pool("builds"), CacheHint::new("a")).await.expect("query");
        assert_eq!(found, vec![worker("alpha")]);
    }

    #[test]
    fn noop_logger_builds_a_child_without_panicking() {
        let logger = NoopLogger;
        let _child = logger.child(LogFields::default());
    }
}
