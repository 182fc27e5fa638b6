//! Read-only snapshots of scheduler state, for admin surfaces.
//!
//! These mirror the pool's internal worker state machine (see the `pool`
//! crate) but carry no synchronization primitives: they are plain data for
//! admin snapshots, logs, and API responses.

use crate::primitives::WorkerName;
use serde::{Deserialize, Serialize};

/// External view of a worker's run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Registered but not currently accepting work.
    Inactive,
    /// Accepting and executing assigned work.
    Running,
    /// Released; no longer part of the pool.
    Finished,
}

/// A point-in-time view of one worker, for admin `workers` listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    /// The worker's unique name.
    pub name: WorkerName,
    /// Current run state.
    pub status: WorkerStatus,
    /// Sum of the costs of items currently assigned to this worker.
    pub workload: u64,
    /// Number of items currently queued on this worker.
    pub queued_items: usize,
    /// Whether the worker has requested shutdown (forbids returning to `Running`).
    pub shutdown: bool,
}

/// A point-in-time view of a pool, for the admin `show` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Number of tickets waiting in the urgent backlog.
    pub backlog_high: usize,
    /// Number of tickets waiting in the non-urgent backlog.
    pub backlog_low: usize,
    /// Number of workers parked waiting for work (`Ready`).
    pub ready_workers: usize,
    /// Per-worker snapshots, sorted by name.
    pub workers: Vec<WorkerSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_status_serializes_snake_case() {
        let json = serde_json::to_string(&WorkerStatus::Running).expect("serialize");
        assert_eq!(json, "\"running\"");
    }
}
