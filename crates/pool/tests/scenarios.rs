//! Integration scenarios exercising the pool scheduler end to end.
//!
//! Each test stands up a `Pool<TestItem>` with in-memory fakes for the
//! cache DAO, logger, and telemetry ports (the real adapters live in
//! `buildpool-adapters`; these are local stand-ins so this crate's tests
//! don't depend on that crate).

use buildpool_domain::{CacheHint, CostEstimate, Item, PoolName, WorkerName};
use buildpool_pool::{ActiveGate, Pool, PoolError};
use buildpool_ports::{
    BoxFuture, CacheDao, LogEvent, LoggerPort, TelemetryPort, TelemetryTags, TelemetryTimer,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct TestItem {
    label: &'static str,
    hint: CacheHint,
    cost: CostEstimate,
}

impl TestItem {
    fn new(label: &'static str) -> Self {
        Self { label, hint: CacheHint::none(), cost: CostEstimate::uniform(1) }
    }

    fn with_hint(label: &'static str, hint: &str) -> Self {
        Self { label, hint: CacheHint::new(hint), cost: CostEstimate::uniform(1) }
    }

    fn with_cost(mut self, cached: u32, non_cached: u32) -> Self {
        self.cost = CostEstimate::new(cached, non_cached);
        self
    }
}

impl Item for TestItem {
    fn cache_hint(&self) -> &CacheHint {
        &self.hint
    }

    fn cost_estimate(&self) -> CostEstimate {
        self.cost
    }

    fn display_form(&self) -> String {
        self.label.to_owned()
    }
}

#[derive(Default)]
struct InMemoryCacheDao {
    entries: Mutex<Vec<(PoolName, CacheHint, WorkerName)>>,
}

impl CacheDao for InMemoryCacheDao {
    fn mark_cached(
        &self,
        pool: PoolName,
        hint: CacheHint,
        worker: WorkerName,
    ) -> BoxFuture<'_, buildpool_shared::Result<()>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            entries.retain(|(p, h, w)| !(p == &pool && h == &hint && w == &worker));
            entries.push((pool, hint, worker));
            Ok(())
        })
    }

    fn query_cache(
        &self,
        pool: PoolName,
        hint: CacheHint,
    ) -> BoxFuture<'_, buildpool_shared::Result<Vec<WorkerName>>> {
        Box::pin(async move {
            let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
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

struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}

    fn child(&self, _fields: buildpool_ports::LogFields) -> Box<dyn LoggerPort> {
        Box::new(NoopLogger)
    }
}

struct NoopTimer;

impl TelemetryTimer for NoopTimer {
    fn stop(&self) {}
}

#[derive(Default)]
struct NoopTelemetry;

impl TelemetryPort for NoopTelemetry {
    fn increment_counter(&self, _name: &str, _value: u64, _tags: Option<&TelemetryTags>) {}

    fn record_timer_ms(&self, _name: &str, _duration_ms: u64, _tags: Option<&TelemetryTags>) {}

    fn start_timer(&self, _name: &str, _tags: Option<&TelemetryTags>) -> Box<dyn TelemetryTimer> {
        Box::new(NoopTimer)
    }

    fn record_gauge(&self, _name: &str, _value: i64, _tags: Option<&TelemetryTags>) {}
}

fn test_pool() -> Pool<TestItem> {
    test_pool_with_dao().0
}

fn test_pool_with_dao() -> (Pool<TestItem>, Arc<InMemoryCacheDao>) {
    let dao = Arc::new(InMemoryCacheDao::default());
    let pool = Pool::new(
        PoolName::parse("ci-pool").expect("valid"),
        Arc::clone(&dao) as Arc<dyn CacheDao>,
        Arc::new(NoopTelemetry),
        Arc::new(NoopLogger),
        Arc::new(ActiveGate::new(true)),
    );
    (pool, dao)
}

async fn timeout<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("operation should not hang")
}

#[tokio::test]
async fn a_ready_worker_immediately_receives_a_submitted_item() {
    let pool = test_pool();
    let worker = pool.register(WorkerName::parse("w1").expect("valid")).await.expect("register");
    worker.set_active(true).await.expect("activate");

    let popper = {
        let worker = worker;
        tokio::spawn(async move { worker.pop().await })
    };
    tokio::task::yield_now().await;

    let ticket = pool.submit(false, TestItem::new("job-a")).await;
    let handle = timeout(ticket.await_job()).await.expect("accepted");
    assert_eq!(handle.worker.as_str(), "w1");

    let popped = timeout(popper).await.expect("task").expect("pop");
    assert_eq!(popped.label, "job-a");
}

#[tokio::test]
async fn submission_before_any_worker_sits_in_the_backlog_until_registration() {
    let pool = test_pool();
    let ticket = pool.submit(false, TestItem::new("job-b")).await;

    let worker = pool.register(WorkerName::parse("w1").expect("valid")).await.expect("register");
    worker.set_active(true).await.expect("activate");

    let popped = timeout(worker.pop()).await.expect("pop");
    assert_eq!(popped.label, "job-b");
    let handle = timeout(ticket.await_job()).await.expect("accepted");
    assert_eq!(handle.worker.as_str(), "w1");
}

#[tokio::test]
async fn urgent_items_are_served_before_non_urgent_items() {
    let pool = test_pool();
    let _low = pool.submit(false, TestItem::new("low")).await;
    let _urgent = pool.submit(true, TestItem::new("urgent")).await;

    let worker = pool.register(WorkerName::parse("w1").expect("valid")).await.expect("register");
    worker.set_active(true).await.expect("activate");

    let first = timeout(worker.pop()).await.expect("pop");
    assert_eq!(first.label, "urgent");
    let second = timeout(worker.pop()).await.expect("pop");
    assert_eq!(second.label, "low");
}

#[tokio::test]
async fn cancelling_a_queued_ticket_removes_it_from_the_backlog() {
    let pool = test_pool();
    let ticket = pool.submit(false, TestItem::new("cancel-me")).await;
    ticket.cancel().await.expect("cancel");

    assert!(matches!(ticket.cancel().await, Err(PoolError::NotQueued)));

    let worker = pool.register(WorkerName::parse("w1").expect("valid")).await.expect("register");
    worker.set_active(true).await.expect("activate");

    let kept = pool.submit(false, TestItem::new("kept")).await;
    let popped = timeout(worker.pop()).await.expect("pop");
    assert_eq!(popped.label, "kept");
    timeout(kept.await_job()).await.expect("accepted");
}

#[tokio::test]
async fn deactivating_a_worker_pushes_its_queued_work_back_to_the_backlog() {
    let pool = test_pool();
    let w1 = pool.register(WorkerName::parse("w1").expect("valid")).await.expect("register");
    w1.set_active(true).await.expect("activate");

    let first = pool.submit(false, TestItem::new("a")).await;
    let second = pool.submit(false, TestItem::new("b")).await;
    timeout(first.await_job()).await.expect("accepted");

    let popper = {
        let w1 = w1;
        tokio::spawn(async move {
            let popped = w1.pop().await.expect("pop");
            (w1, popped)
        })
    };
    tokio::task::yield_now().await;
    timeout(second.await_job()).await.expect("accepted");

    let (w1, popped_a) = timeout(popper).await.expect("task");
    assert_eq!(popped_a.label, "a");

    w1.set_active(false).await.expect("deactivate");
    w1.release().await.expect("release");

    let w2 = pool.register(WorkerName::parse("w2").expect("valid")).await.expect("register");
    w2.set_active(true).await.expect("activate");
    let recovered = timeout(w2.pop()).await.expect("pop");
    assert_eq!(recovered.label, "b");
}

#[tokio::test]
async fn release_causes_a_parked_pop_to_resolve_with_finished() {
    let pool = test_pool();
    let name = WorkerName::parse("w1").expect("valid");
    let worker = pool.register(name.clone()).await.expect("register");
    worker.set_active(true).await.expect("activate");

    let popper = tokio::spawn(async move { worker.pop().await });
    tokio::task::yield_now().await;

    pool.release(&name).await.expect("release");

    let result = timeout(popper).await.expect("task");
    assert!(matches!(result, Err(PoolError::Finished)));
}

#[tokio::test]
async fn a_global_pause_blocks_every_pop_until_resumed() {
    let pool = test_pool();
    let worker = pool.register(WorkerName::parse("w1").expect("valid")).await.expect("register");
    worker.set_active(true).await.expect("activate");
    pool.set_gate_active(false).await;

    let ticket = pool.submit(false, TestItem::new("paused")).await;

    let popper = tokio::spawn(async move { worker.pop().await });
    tokio::task::yield_now().await;
    assert!(!popper.is_finished(), "pop should stay parked while the gate is paused");

    pool.set_gate_active(true).await;
    let popped = timeout(popper).await.expect("task").expect("pop");
    assert_eq!(popped.label, "paused");
    timeout(ticket.await_job()).await.expect("accepted");
}

#[tokio::test]
async fn cache_locality_prefers_a_previously_marked_worker_under_the_workload_cap() {
    let (pool, dao) = test_pool_with_dao();
    let w1_name = WorkerName::parse("w1").expect("valid");
    let w2_name = WorkerName::parse("w2").expect("valid");
    let w1 = pool.register(w1_name.clone()).await.expect("register");
    w1.set_active(true).await.expect("activate");
    let w2 = pool.register(w2_name.clone()).await.expect("register");
    w2.set_active(true).await.expect("activate");

    // Drive both workers to the parked `Ready` state (no backlog yet).
    let w1_pop = tokio::spawn(async move { (w1.pop().await, w1) });
    tokio::task::yield_now().await;
    let w2_pop = tokio::spawn(async move { (w2.pop().await, w2) });
    tokio::task::yield_now().await;
    assert!(!w1_pop.is_finished());
    assert!(!w2_pop.is_finished());

    dao.mark_cached(
        PoolName::parse("ci-pool").expect("valid"),
        CacheHint::new("toolchain-a"),
        w1_name.clone(),
    )
    .await
    .expect("seed cache entry");

    let item = TestItem::with_hint("follow-up", "toolchain-a").with_cost(1, 10);
    let ticket = pool.submit(false, item).await;
    let handle = timeout(ticket.await_job()).await.expect("accepted");
    assert_eq!(handle.worker.as_str(), "w1");

    let (result, _w1) = timeout(w1_pop).await.expect("task");
    let popped = result.expect("pop");
    assert_eq!(popped.label, "follow-up");

    w2_pop.abort();
}

#[tokio::test]
async fn unknown_worker_operations_fail_with_unknown_worker() {
    let pool = test_pool();
    let name = WorkerName::parse("ghost").expect("valid");
    assert!(matches!(pool.set_active(&name, true).await, Err(PoolError::UnknownWorker)));
    assert!(matches!(pool.release(&name).await, Err(PoolError::UnknownWorker)));
}

#[tokio::test]
async fn registering_a_name_twice_fails_with_name_taken() {
    let pool = test_pool();
    let name = WorkerName::parse("dup").expect("valid");
    pool.register(name.clone()).await.expect("first register");
    assert!(matches!(pool.register(name).await, Err(PoolError::NameTaken)));
}

#[tokio::test]
async fn worker_departure_reparks_queued_items_preserving_relative_order() {
    let (pool, dao) = test_pool_with_dao();
    let pool_name = PoolName::parse("ci-pool").expect("valid");
    let w1_name = WorkerName::parse("w1").expect("valid");
    let w1 = pool.register(w1_name.clone()).await.expect("register");
    w1.set_active(true).await.expect("activate");

    let w2 = pool.register(WorkerName::parse("w2").expect("valid")).await.expect("register");
    w2.set_active(true).await.expect("activate");

    // Park w2 in the ready list so subsequent submits try `assign_preferred`
    // instead of landing straight in the backlog (§4.3 step 2/3).
    let w2_pop = tokio::spawn({
        let w2 = w2;
        async move { (w2.pop().await, w2) }
    });
    tokio::task::yield_now().await;

    dao.mark_cached(pool_name, CacheHint::new("toolchain-a"), w1_name).await.expect("seed cache entry");

    // Both steer onto w1's own queue via cache locality; w2 stays parked.
    let third = pool.submit(false, TestItem::with_hint("third", "toolchain-a")).await;
    let fourth = pool.submit(false, TestItem::with_hint("fourth", "toolchain-a")).await;
    assert!(!w2_pop.is_finished(), "w2 should not have been handed either item");

    w1.set_active(false).await.expect("deactivate");
    w1.release().await.expect("release");

    // Deactivating w1 re-submits its queued items (main was `Ready`); the
    // first resubmission claims w2 out of the ready list directly, the
    // second lands in the backlog behind it.
    let (result, w2) = timeout(w2_pop).await.expect("task");
    let first_recovered = result.expect("pop");
    assert_eq!(first_recovered.label, "third");
    timeout(third.await_job()).await.expect("accepted");

    let second_recovered = timeout(w2.pop()).await.expect("pop");
    assert_eq!(second_recovered.label, "fourth");
    timeout(fourth.await_job()).await.expect("accepted");
}

#[tokio::test]
async fn cache_locality_survives_across_a_fresh_pool_instance_on_the_same_dao() {
    let dao = Arc::new(InMemoryCacheDao::default());
    let pool_name = PoolName::parse("ci-pool").expect("valid");

    {
        let pool = Pool::new(
            pool_name.clone(),
            Arc::clone(&dao) as Arc<dyn CacheDao>,
            Arc::new(NoopTelemetry),
            Arc::new(NoopLogger),
            Arc::new(ActiveGate::new(true)),
        );
        let w1 = pool.register(WorkerName::parse("w1").expect("valid")).await.expect("register");
        w1.set_active(true).await.expect("activate");

        let popper = {
            let w1 = w1;
            tokio::spawn(async move { w1.pop().await })
        };
        tokio::task::yield_now().await;

        let ticket = pool.submit(false, TestItem::with_hint("first", "toolchain-a")).await;
        timeout(ticket.await_job()).await.expect("accepted");
        timeout(popper).await.expect("task").expect("pop");
        // The accepting worker's `mark_cached` write is spawned off the
        // critical section; give it a turn to land before "restarting".
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // A fresh `Pool` instance, same DAO: cache-locality rows are the only
    // state that survives a restart (per spec.md §1 Non-goals).
    let pool = Pool::new(
        pool_name,
        Arc::clone(&dao) as Arc<dyn CacheDao>,
        Arc::new(NoopTelemetry),
        Arc::new(NoopLogger),
        Arc::new(ActiveGate::new(true)),
    );

    let w2 = pool.register(WorkerName::parse("w2").expect("valid")).await.expect("register");
    w2.set_active(true).await.expect("activate");
    let w1 = pool.register(WorkerName::parse("w1").expect("valid")).await.expect("register");
    w1.set_active(true).await.expect("activate");

    let w1_pop = {
        let w1 = w1;
        tokio::spawn(async move { (w1.pop().await, w1) })
    };
    tokio::task::yield_now().await;
    let w2_pop = {
        let w2 = w2;
        tokio::spawn(async move { (w2.pop().await, w2) })
    };
    tokio::task::yield_now().await;

    let item = TestItem::with_hint("follow-up", "toolchain-a").with_cost(1, 10);
    let ticket = pool.submit(false, item).await;
    let handle = timeout(ticket.await_job()).await.expect("accepted");
    assert_eq!(handle.worker.as_str(), "w1");

    let (result, _w1) = timeout(w1_pop).await.expect("task");
    assert_eq!(result.expect("pop").label, "follow-up");
    w2_pop.abort();
}

#[tokio::test]
async fn snapshot_reflects_backlog_and_worker_state() {
    let pool = test_pool();
    let _ticket = pool.submit(false, TestItem::new("idle")).await;
    let worker = pool.register(WorkerName::parse("w1").expect("valid")).await.expect("register");

    let snapshot = pool.snapshot().await;
    assert_eq!(snapshot.backlog_low, 1);
    assert_eq!(snapshot.workers.len(), 1);
    assert_eq!(snapshot.workers[0].name, *worker.name());
}
