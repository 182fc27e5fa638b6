//! The pool: backlog, worker map, active gate, and the placement policy
//! tying them together.

use crate::active_gate::ActiveGate;
use crate::backlog::{Backlog, BacklogEntry, Priority};
use crate::error::PoolError;
use crate::seq::{SeqId, SeqIdGenerator};
use crate::ticket::{JobHandle, QueuedTicket, Ticket};
use crate::worker::{WorkerEntry, WorkerRecord, WorkerState};
use buildpool_domain::{
    CacheHint, Item, PoolName, PoolSnapshot, WorkerName, WorkerSnapshot, WorkerStatus,
};
use buildpool_ports::{CacheDao, LogFields, LoggerPort, TelemetryPort, TelemetryTags};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex, Notify};

/// `pool.main`: a sum type, never a boolean plus a conditionally-valid
/// pointer (see DESIGN.md).
enum Main<I> {
    /// Zero ready workers; new items land here.
    Backlog(Backlog<QueuedTicket<I>>),
    /// Zero items in backlog; FIFO of workers parked waiting for work.
    Ready(VecDeque<WorkerName>),
}

/// Where a live ticket currently sits, keyed by seq id. The single source
/// of truth cancellation consults instead of an intrusive linked list.
#[derive(Debug, Clone)]
enum Location {
    Backlog(Priority),
    Worker(WorkerName),
}

pub(crate) struct PoolInner<I> {
    main: Main<I>,
    workers: HashMap<WorkerName, WorkerRecord<QueuedTicket<I>>>,
    locations: HashMap<SeqId, Location>,
    seq_gen: SeqIdGenerator,
    connected: u64,
    paused: u64,
}

impl<I> PoolInner<I> {
    fn new() -> Self {
        Self {
            main: Main::Backlog(Backlog::new()),
            workers: HashMap::new(),
            locations: HashMap::new(),
            seq_gen: SeqIdGenerator::new(),
            connected: 0,
            paused: 0,
        }
    }

    /// Pop the named worker's own queue, clearing its location entry.
    fn dequeue_own(&mut self, worker_name: &WorkerName) -> Option<WorkerEntry<QueuedTicket<I>>> {
        let record = self.workers.get_mut(worker_name)?;
        let WorkerState::Running { queue, .. } = &mut record.state else {
            return None;
        };
        let entry = queue.pop_back()?;
        self.locations.remove(&entry.seq);
        Some(entry)
    }

    /// Remove a ticket from wherever `locations` says it lives, refreshing
    /// the gauge for whichever queue lost it. Returns true if something was
    /// actually removed (idempotent-failing).
    fn cancel_by_seq(&mut self, seq: SeqId, telemetry: &dyn TelemetryPort) -> bool {
        let Some(location) = self.locations.remove(&seq) else {
            return false;
        };
        match location {
            Location::Backlog(priority) => {
                if let Main::Backlog(backlog) = &mut self.main {
                    backlog.remove(priority, seq);
                    telemetry.record_gauge("pool.backlog.high", i64_len(backlog.high_len()), None);
                    telemetry.record_gauge("pool.backlog.low", i64_len(backlog.low_len()), None);
                }
            },
            Location::Worker(name) => {
                if let Some(record) = self.workers.get_mut(&name) {
                    if let WorkerState::Running { queue, .. } = &mut record.state {
                        queue.remove(seq);
                        let tags = TelemetryTags::from([(Box::from("worker"), Box::from(name.as_str()))]);
                        telemetry.record_gauge(
                            "pool.worker.workload",
                            i64_workload(queue.workload()),
                            Some(&tags),
                        );
                    }
                }
            },
        }
        true
    }
}

enum WorkerStateKind {
    Inactive(Arc<Notify>),
    Running,
    Finished,
}

enum MainOutcome<I> {
    Accepted(I),
    Redirected,
    ParkSelf(Arc<Notify>),
    Retry,
}

/// A named collection of workers and their queues, plus the cache DAO
/// scoped to that name. Cheap to clone: every field is an `Arc` or a cheap
/// `PoolName`.
pub struct Pool<I: Item> {
    name: PoolName,
    inner: Arc<Mutex<PoolInner<I>>>,
    active_gate: Arc<ActiveGate>,
    cache_dao: Arc<dyn CacheDao>,
    telemetry: Arc<dyn TelemetryPort>,
    logger: Arc<dyn LoggerPort>,
}

impl<I: Item> Clone for Pool<I> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            inner: Arc::clone(&self.inner),
            active_gate: Arc::clone(&self.active_gate),
            cache_dao: Arc::clone(&self.cache_dao),
            telemetry: Arc::clone(&self.telemetry),
            logger: Arc::clone(&self.logger),
        }
    }
}

/// A registered worker's handle: the operations a worker-side client calls.
pub struct WorkerHandle<I: Item> {
    name: WorkerName,
    pool: Pool<I>,
}

impl<I: Item> WorkerHandle<I> {
    /// The registered name.
    #[must_use]
    pub const fn name(&self) -> &WorkerName {
        &self.name
    }

    /// Pull the next assigned item, parking as needed. Fails with
    /// `Finished` once this worker has been released.
    pub async fn pop(&self) -> Result<I, PoolError> {
        self.pool.pop(&self.name).await
    }

    /// Activate or deactivate this worker.
    pub async fn set_active(&self, active: bool) -> Result<(), PoolError> {
        self.pool.set_active(&self.name, active).await
    }

    /// Release this worker: deactivates it (re-parking any assigned work),
    /// then transitions it to `Finished` and removes it from the pool.
    pub async fn release(&self) -> Result<(), PoolError> {
        self.pool.release(&self.name).await
    }
}

impl<I: Item> Pool<I> {
    /// Construct an empty pool. `active_gate` may be shared with other
    /// pools if the composition root wants a single global pause switch
    /// (see DESIGN.md).
    #[must_use]
    pub fn new(
        name: PoolName,
        cache_dao: Arc<dyn CacheDao>,
        telemetry: Arc<dyn TelemetryPort>,
        logger: Arc<dyn LoggerPort>,
        active_gate: Arc<ActiveGate>,
    ) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(PoolInner::new())),
            active_gate,
            cache_dao,
            telemetry,
            logger,
        }
    }

    /// The pool's name.
    #[must_use]
    pub const fn name(&self) -> &PoolName {
        &self.name
    }

    /// Submit an item. Never suspends: only a short, synchronous-feeling
    /// critical section (it may await the cache DAO's `query_cache`, but
    /// that is a bounded lookup, not an indefinite wait; see DESIGN.md).
    pub async fn submit(&self, urgent: bool, item: I) -> Ticket<I> {
        let (accepted_tx, accepted_rx) = oneshot::channel();
        let payload = QueuedTicket { item, urgent, accepted_tx };

        let mut guard = self.inner.lock().await;
        let seq = guard.seq_gen.next();
        self.add(&mut guard, seq, payload).await;
        drop(guard);

        Ticket::new(seq, urgent, Arc::clone(&self.inner), Arc::clone(&self.telemetry), accepted_rx)
    }

    /// Placement policy: §4.3 of the scheduler design.
    async fn add(&self, state: &mut PoolInner<I>, seq: SeqId, mut payload: QueuedTicket<I>) {
        loop {
            if matches!(&state.main, Main::Ready(ready) if ready.is_empty()) {
                state.main = Main::Backlog(Backlog::new());
                continue;
            }

            if let Main::Backlog(backlog) = &mut state.main {
                let priority = Priority::from_urgent(payload.urgent);
                backlog.enqueue(priority, seq, payload);
                state.locations.insert(seq, Location::Backlog(priority));
                self.record_backlog_gauges(state);
                return;
            }

            // main is Ready and non-empty.
            payload = match self.assign_preferred(state, seq, payload).await {
                Ok(()) => return,
                Err(payload) => payload,
            };

            let Main::Ready(ready) = &mut state.main else {
                unreachable!("main cannot change variant without releasing the lock")
            };
            let Some(worker_name) = ready.pop_back() else {
                state.main = Main::Backlog(Backlog::new());
                continue;
            };

            let is_running = matches!(
                state.workers.get(&worker_name).map(|record| &record.state),
                Some(WorkerState::Running { .. })
            );
            if !is_running {
                continue;
            }

            let cost = payload.item.cost_estimate().non_cached;
            let hint = payload.item.cache_hint().clone();
            if let Some(record) = state.workers.get_mut(&worker_name) {
                if let WorkerState::Running { queue, cond } = &mut record.state {
                    queue.push_front(WorkerEntry { seq, cost, payload });
                    state.locations.insert(seq, Location::Worker(worker_name.clone()));
                    cond.notify_waiters();
                }
            }
            if !hint.is_none() {
                self.spawn_mark_cached(hint, worker_name);
            }
            return;
        }
    }

    /// §4.3 `assign_preferred`. Returns the payload back on failure so the
    /// caller can fall through to the "take rear worker" step without a
    /// clone.
    async fn assign_preferred(
        &self,
        state: &mut PoolInner<I>,
        seq: SeqId,
        payload: QueuedTicket<I>,
    ) -> Result<(), QueuedTicket<I>> {
        if payload.item.cache_hint().is_none() {
            return Err(payload);
        }

        let hint = payload.item.cache_hint().clone();
        let candidates = match self.cache_dao.query_cache(self.name.clone(), hint).await {
            Ok(candidates) => candidates,
            Err(error) => {
                self.logger.warn(
                    "pool.cache.query_failed",
                    "cache lookup failed; falling back to no locality preference",
                    Some(LogFields::from([("error".into(), error.to_string().into())])),
                );
                Vec::new()
            },
        };

        let max_workload = u64::from(payload.item.cost_estimate().non_cached);
        let Some(worker_name) = best_worker(&candidates, state, max_workload) else {
            return Err(payload);
        };

        let cost = payload.item.cost_estimate().cached;
        let Some(record) = state.workers.get_mut(&worker_name) else {
            return Err(payload);
        };
        let WorkerState::Running { queue, cond } = &mut record.state else {
            return Err(payload);
        };
        queue.push_front(WorkerEntry { seq, cost, payload });
        state.locations.insert(seq, Location::Worker(worker_name.clone()));
        cond.notify_waiters();
        self.telemetry.increment_counter("pool.assign.preferred", 1, None);
        Ok(())
    }

    /// §4.4 `pop`.
    pub(crate) async fn pop(&self, worker_name: &WorkerName) -> Result<I, PoolError> {
        loop {
            self.active_gate.wait().await;

            let mut guard = self.inner.lock().await;

            let state_kind = guard.workers.get(worker_name).map(|record| match &record.state {
                WorkerState::Inactive { ready } => WorkerStateKind::Inactive(Arc::clone(ready)),
                WorkerState::Running { .. } => WorkerStateKind::Running,
                WorkerState::Finished => WorkerStateKind::Finished,
            });

            match state_kind {
                None | Some(WorkerStateKind::Finished) => return Err(PoolError::Finished),
                Some(WorkerStateKind::Inactive(ready)) => {
                    let notified = ready.notified();
                    drop(guard);
                    notified.await;
                },
                Some(WorkerStateKind::Running) => {
                    if let Some(entry) = guard.dequeue_own(worker_name) {
                        let item = self.finish_accept(worker_name, entry.payload);
                        drop(guard);
                        return Ok(item);
                    }

                    match self.take_from_main(&mut guard, worker_name).await {
                        MainOutcome::Accepted(item) => {
                            drop(guard);
                            return Ok(item);
                        },
                        MainOutcome::Redirected | MainOutcome::Retry => drop(guard),
                        MainOutcome::ParkSelf(cond) => {
                            let notified = cond.notified();
                            drop(guard);
                            notified.await;
                            self.remove_self_from_ready(worker_name).await;
                        },
                    }
                },
            }
        }
    }

    async fn take_from_main(&self, state: &mut PoolInner<I>, worker_name: &WorkerName) -> MainOutcome<I> {
        if let Main::Ready(ready) = &mut state.main {
            ready.push_back(worker_name.clone());
            self.telemetry.record_gauge("pool.ready_workers", i64_len(ready.len()), None);
            let cond = match state.workers.get(worker_name).map(|record| &record.state) {
                Some(WorkerState::Running { cond, .. }) => Arc::clone(cond),
                _ => return MainOutcome::Retry,
            };
            return MainOutcome::ParkSelf(cond);
        }

        let Main::Backlog(backlog) = &mut state.main else {
            unreachable!("main is either Backlog or Ready")
        };
        let Some((_priority, entry)) = backlog.dequeue() else {
            state.main = Main::Ready(VecDeque::new());
            return MainOutcome::Retry;
        };
        state.locations.remove(&entry.seq);
        self.record_backlog_gauges(state);

        let BacklogEntry { seq, payload } = entry;
        match self.assign_preferred(state, seq, payload).await {
            Ok(()) => MainOutcome::Redirected,
            Err(payload) => MainOutcome::Accepted(self.finish_accept(worker_name, payload)),
        }
    }

    /// Remove this worker's own name from the `Ready` parked list, if still
    /// present, and refresh the ready-worker gauge either way. A worker woken
    /// because it was directly assigned work (via `assign_preferred`
    /// targeting a worker still sitting in the ready list, or via the "take
    /// rear worker" step in `add`, which already popped the name off the
    /// list) finds itself already absent here; the gauge still needs
    /// resetting to the list's current length, since the pop that removed
    /// the name never recorded the new count itself.
    async fn remove_self_from_ready(&self, worker_name: &WorkerName) {
        let mut guard = self.inner.lock().await;
        if let Main::Ready(ready) = &mut guard.main {
            if let Some(position) = ready.iter().position(|name| name == worker_name) {
                ready.remove(position);
            }
            self.telemetry.record_gauge("pool.ready_workers", i64_len(ready.len()), None);
        }
    }

    fn finish_accept(&self, worker_name: &WorkerName, payload: QueuedTicket<I>) -> I {
        let QueuedTicket { item, accepted_tx, .. } = payload;
        let hint = item.cache_hint().clone();
        let _ = accepted_tx.send(JobHandle { item: item.clone(), worker: worker_name.clone() });
        self.telemetry.increment_counter("pool.ticket.accepted", 1, None);
        if !hint.is_none() {
            self.spawn_mark_cached(hint, worker_name.clone());
        }
        item
    }

    fn spawn_mark_cached(&self, hint: CacheHint, worker: WorkerName) {
        let dao = Arc::clone(&self.cache_dao);
        let pool_name = self.name.clone();
        let logger = Arc::clone(&self.logger);
        tokio::spawn(async move {
            if let Err(error) = dao.mark_cached(pool_name, hint, worker).await {
                logger.error(
                    "pool.cache.mark_failed",
                    "recording cache locality failed",
                    Some(LogFields::from([("error".into(), error.to_string().into())])),
                );
            }
        });
    }

    fn record_backlog_gauges(&self, state: &PoolInner<I>) {
        if let Main::Backlog(backlog) = &state.main {
            self.telemetry.record_gauge("pool.backlog.high", i64_len(backlog.high_len()), None);
            self.telemetry.record_gauge("pool.backlog.low", i64_len(backlog.low_len()), None);
        }
    }

    /// §4.5 `register`.
    pub async fn register(&self, name: WorkerName) -> Result<WorkerHandle<I>, PoolError> {
        let mut guard = self.inner.lock().await;
        if guard.workers.contains_key(&name) {
            return Err(PoolError::NameTaken);
        }
        guard.workers.insert(name.clone(), WorkerRecord::new());
        guard.connected += 1;
        guard.paused += 1;
        self.telemetry.record_gauge("pool.workers.connected", i64_len(guard.connected as usize), None);
        self.telemetry.record_gauge("pool.workers.paused", i64_len(guard.paused as usize), None);
        drop(guard);

        self.logger.info(
            "pool.worker.registered",
            "worker registered",
            Some(LogFields::from([("worker".into(), name.as_str().into())])),
        );
        Ok(WorkerHandle { name, pool: self.clone() })
    }

    /// §4.5 `set_active`.
    pub async fn set_active(&self, worker_name: &WorkerName, active: bool) -> Result<(), PoolError> {
        if active {
            self.activate(worker_name).await
        } else {
            self.deactivate(worker_name).await
        }
    }

    async fn activate(&self, worker_name: &WorkerName) -> Result<(), PoolError> {
        let mut guard = self.inner.lock().await;
        let Some(record) = guard.workers.get_mut(worker_name) else {
            return Err(PoolError::UnknownWorker);
        };

        if record.shutdown {
            drop(guard);
            self.logger.warn(
                "pool.worker.activate_after_shutdown",
                "ignoring activate request for a shut-down worker",
                Some(LogFields::from([("worker".into(), worker_name.as_str().into())])),
            );
            return Ok(());
        }

        let ready = match &record.state {
            WorkerState::Running { .. } | WorkerState::Finished => None,
            WorkerState::Inactive { ready } => Some(Arc::clone(ready)),
        };
        let Some(ready) = ready else { return Ok(()) };

        record.state = WorkerState::new_running();
        guard.paused = guard.paused.saturating_sub(1);
        self.telemetry.record_gauge("pool.workers.paused", i64_len(guard.paused as usize), None);
        drop(guard);
        ready.notify_waiters();
        Ok(())
    }

    async fn deactivate(&self, worker_name: &WorkerName) -> Result<(), PoolError> {
        let mut guard = self.inner.lock().await;
        let Some(record) = guard.workers.get_mut(worker_name) else {
            return Err(PoolError::UnknownWorker);
        };

        match &record.state {
            WorkerState::Finished => Err(PoolError::Finished),
            WorkerState::Inactive { .. } => Ok(()),
            WorkerState::Running { .. } => {
                self.deactivate_running(&mut guard, worker_name).await;
                Ok(())
            },
        }
    }

    async fn deactivate_running(&self, state: &mut PoolInner<I>, worker_name: &WorkerName) {
        let Some(record) = state.workers.get_mut(worker_name) else { return };
        let old_state = std::mem::replace(&mut record.state, WorkerState::new_inactive());
        let WorkerState::Running { mut queue, cond } = old_state else {
            unreachable!("caller already matched Running")
        };

        state.paused += 1;
        self.telemetry.record_gauge("pool.workers.paused", i64_len(state.paused as usize), None);
        cond.notify_waiters();

        let drained = queue.drain_front_to_back();
        if drained.is_empty() {
            return;
        }

        if matches!(state.main, Main::Backlog(_)) {
            // `drained` is oldest-first; `Backlog::push_back` appends to the
            // rear and `dequeue` serves from the rear, so pushing in reverse
            // (newest first) leaves the oldest entry at the rear, served
            // first, preserving the original relative order.
            for entry in drained.into_iter().rev() {
                let priority = Priority::from_urgent(entry.payload.urgent);
                if let Main::Backlog(backlog) = &mut state.main {
                    backlog.push_back(priority, entry.seq, entry.payload);
                }
                state.locations.insert(entry.seq, Location::Backlog(priority));
            }
            self.record_backlog_gauges(state);
        } else {
            // `drained` is oldest-first; resubmitting in that order gives
            // the oldest entry first crack at whatever `add` finds (a freed
            // ready worker or the backlog head), preserving relative order.
            for entry in drained {
                self.add(state, entry.seq, entry.payload).await;
            }
        }
    }

    /// §4.5 `shutdown`.
    pub async fn shutdown(&self, worker_name: &WorkerName) -> Result<(), PoolError> {
        {
            let mut guard = self.inner.lock().await;
            let Some(record) = guard.workers.get_mut(worker_name) else {
                return Err(PoolError::UnknownWorker);
            };
            record.shutdown = true;
        }
        self.set_active(worker_name, false).await
    }

    /// §4.5 `release`.
    pub async fn release(&self, worker_name: &WorkerName) -> Result<(), PoolError> {
        self.set_active(worker_name, false).await?;

        let mut guard = self.inner.lock().await;
        let Some(record) = guard.workers.get_mut(worker_name) else {
            return Err(PoolError::UnknownWorker);
        };
        let old_state = std::mem::replace(&mut record.state, WorkerState::Finished);
        let WorkerState::Inactive { ready } = old_state else {
            unreachable!("set_active(false) guarantees Inactive")
        };

        guard.connected = guard.connected.saturating_sub(1);
        guard.paused = guard.paused.saturating_sub(1);
        self.telemetry.record_gauge("pool.workers.connected", i64_len(guard.connected as usize), None);
        self.telemetry.record_gauge("pool.workers.paused", i64_len(guard.paused as usize), None);
        guard.workers.remove(worker_name);
        drop(guard);

        ready.notify_waiters();
        self.logger.info(
            "pool.worker.released",
            "worker released",
            Some(LogFields::from([("worker".into(), worker_name.as_str().into())])),
        );
        Ok(())
    }

    /// Admin snapshot: worker names, states, workloads, backlog depth.
    pub async fn snapshot(&self) -> PoolSnapshot {
        let guard = self.inner.lock().await;

        let (backlog_high, backlog_low) = match &guard.main {
            Main::Backlog(backlog) => (backlog.high_len(), backlog.low_len()),
            Main::Ready(_) => (0, 0),
        };
        let ready_workers = match &guard.main {
            Main::Ready(ready) => ready.len(),
            Main::Backlog(_) => 0,
        };

        let workers = guard
            .workers
            .iter()
            .map(|(name, record)| {
                let (status, workload, queued_items) = match &record.state {
                    WorkerState::Inactive { .. } => (WorkerStatus::Inactive, 0, 0),
                    WorkerState::Running { queue, .. } => {
                        (WorkerStatus::Running, queue.workload(), queue.len())
                    },
                    WorkerState::Finished => (WorkerStatus::Finished, 0, 0),
                };
                WorkerSnapshot {
                    name: name.clone(),
                    status,
                    workload,
                    queued_items,
                    shutdown: record.shutdown,
                }
            })
            .collect();

        PoolSnapshot { backlog_high, backlog_low, ready_workers, workers }
    }

    /// Flip the (possibly shared) active gate.
    pub async fn set_gate_active(&self, active: bool) {
        self.active_gate.set(active).await;
    }

    /// Whether the active gate currently lets pops proceed.
    pub async fn gate_is_active(&self) -> bool {
        self.active_gate.is_active().await
    }
}

/// §4.3 `best_worker`: highest-workload candidate under the cap, tie-broken
/// by the (already sorted) order `query_cache` returned.
fn best_worker<I>(candidates: &[WorkerName], state: &PoolInner<I>, max_workload: u64) -> Option<WorkerName> {
    let mut best: Option<(u64, &WorkerName)> = None;
    for name in candidates {
        let Some(record) = state.workers.get(name) else { continue };
        let WorkerState::Running { queue, .. } = &record.state else { continue };
        let workload = queue.workload();
        if workload > max_workload {
            continue;
        }
        match best {
            Some((best_workload, _)) if best_workload >= workload => {},
            _ => best = Some((workload, name)),
        }
    }
    best.map(|(_, name)| name.clone())
}

fn i64_len(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX)
}

fn i64_workload(workload: u64) -> i64 {
    i64::try_from(workload).unwrap_or(i64::MAX)
}
