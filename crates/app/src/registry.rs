//! A named collection of pools, lazily created on first use, sharing one
//! process-wide active gate (see DESIGN.md for why the gate is shared
//! rather than per-pool).

use buildpool_domain::{Item, PoolName, WorkerName};
use buildpool_pool::{ActiveGate, Pool};
use buildpool_ports::{CacheDao, LoggerPort, TelemetryPort};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// Composition root for the scheduler's named pools.
///
/// Every pool it hands out shares the same cache DAO, logger, telemetry
/// sink, and active gate; only the backlog/worker-map state is per-pool.
pub struct PoolRegistry<I: Item> {
    pools: Arc<Mutex<HashMap<PoolName, Pool<I>>>>,
    reconnect_waiters: Arc<Mutex<HashMap<(PoolName, WorkerName), Arc<Notify>>>>,
    active_gate: Arc<ActiveGate>,
    cache_dao: Arc<dyn CacheDao>,
    telemetry: Arc<dyn TelemetryPort>,
    logger: Arc<dyn LoggerPort>,
}

impl<I: Item> Clone for PoolRegistry<I> {
    fn clone(&self) -> Self {
        Self {
            pools: Arc::clone(&self.pools),
            reconnect_waiters: Arc::clone(&self.reconnect_waiters),
            active_gate: Arc::clone(&self.active_gate),
            cache_dao: Arc::clone(&self.cache_dao),
            telemetry: Arc::clone(&self.telemetry),
            logger: Arc::clone(&self.logger),
        }
    }
}

impl<I: Item> PoolRegistry<I> {
    /// Build an empty registry, starting with the active gate open.
    #[must_use]
    pub fn new(cache_dao: Arc<dyn CacheDao>, telemetry: Arc<dyn TelemetryPort>, logger: Arc<dyn LoggerPort>) -> Self {
        Self {
            pools: Arc::new(Mutex::new(HashMap::new())),
            reconnect_waiters: Arc::new(Mutex::new(HashMap::new())),
            active_gate: Arc::new(ActiveGate::new(true)),
            cache_dao,
            telemetry,
            logger,
        }
    }

    /// Return the named pool, creating it (empty, no workers) on first use.
    pub async fn pool(&self, name: &PoolName) -> Pool<I> {
        let mut pools = self.pools.lock().await;
        pools
            .entry(name.clone())
            .or_insert_with(|| {
                Pool::new(
                    name.clone(),
                    Arc::clone(&self.cache_dao),
                    Arc::clone(&self.telemetry),
                    Arc::clone(&self.logger),
                    Arc::clone(&self.active_gate),
                )
            })
            .clone()
    }

    /// Every pool name known to the registry, sorted.
    pub async fn pool_names(&self) -> Vec<PoolName> {
        let pools = self.pools.lock().await;
        let mut names: Vec<PoolName> = pools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register interest in `worker` re-registering under the same name in
    /// `pool`, returning the `Notify` the caller should await. Repeated
    /// calls for the same `(pool, worker)` share one `Notify`.
    pub(crate) async fn reconnect_waiter(&self, pool: PoolName, worker: WorkerName) -> Arc<Notify> {
        let mut waiters = self.reconnect_waiters.lock().await;
        Arc::clone(waiters.entry((pool, worker)).or_insert_with(|| Arc::new(Notify::new())))
    }

    /// Drop any pending reconnect waiter for `(pool, worker)` without
    /// notifying it (the wait already resolved or timed out).
    pub(crate) async fn forget_reconnect_waiter(&self, pool: &PoolName, worker: &WorkerName) {
        let mut waiters = self.reconnect_waiters.lock().await;
        waiters.remove(&(pool.clone(), worker.clone()));
    }

    /// Wake anyone waiting on `worker` reconnecting to `pool`.
    pub(crate) async fn notify_reconnect(&self, pool: &PoolName, worker: &WorkerName) {
        let mut waiters = self.reconnect_waiters.lock().await;
        if let Some(notify) = waiters.remove(&(pool.clone(), worker.clone())) {
            notify.notify_waiters();
        }
    }
}
