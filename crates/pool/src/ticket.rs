//! `Ticket`: the handle returned to submitters by `Pool::submit`.

use crate::error::PoolError;
use crate::pool::PoolInner;
use crate::seq::SeqId;
use buildpool_domain::{Item, WorkerName};
use buildpool_ports::TelemetryPort;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// What a ticket resolves to once a worker accepts it.
#[derive(Debug, Clone)]
pub struct JobHandle<I> {
    /// The accepted item.
    pub item: I,
    /// The worker that accepted it.
    pub worker: WorkerName,
}

/// An entry queued in the backlog or a worker queue: the item, its urgency,
/// and the sender half used to resolve `Ticket::await_job` once accepted.
pub struct QueuedTicket<I> {
    pub(crate) item: I,
    pub(crate) urgent: bool,
    pub(crate) accepted_tx: oneshot::Sender<JobHandle<I>>,
}

/// Handle returned to submitters by `Pool::submit`.
///
/// Invariant: a live ticket sits in exactly one queue and can be cancelled;
/// once accepted or cancelled, a second `cancel` call fails with
/// `NotQueued`. There is no client-visible detach-hook type: the pool's
/// `locations` table (see `pool.rs`) is the single source of truth, and
/// `cancel` simply asks the pool to look the ticket up by its seq id.
pub struct Ticket<I: Item> {
    seq: SeqId,
    urgent: bool,
    inner: Arc<Mutex<PoolInner<I>>>,
    telemetry: Arc<dyn TelemetryPort>,
    accepted_rx: Mutex<Option<oneshot::Receiver<JobHandle<I>>>>,
}

impl<I: Item> Ticket<I> {
    pub(crate) fn new(
        seq: SeqId,
        urgent: bool,
        inner: Arc<Mutex<PoolInner<I>>>,
        telemetry: Arc<dyn TelemetryPort>,
        accepted_rx: oneshot::Receiver<JobHandle<I>>,
    ) -> Self {
        Self {
            seq,
            urgent,
            inner,
            telemetry,
            accepted_rx: Mutex::new(Some(accepted_rx)),
        }
    }

    /// The ticket's internal sequence id (for diagnostics/tests).
    #[must_use]
    pub const fn seq(&self) -> SeqId {
        self.seq
    }

    /// The urgency fixed at submission.
    #[must_use]
    pub const fn is_urgent(&self) -> bool {
        self.urgent
    }

    /// Detach this ticket from whichever queue currently holds it. Fails
    /// with `NotQueued` if the ticket has already been accepted, already
    /// cancelled, or was never queued under this id (a second call).
    pub async fn cancel(&self) -> Result<(), PoolError> {
        let removed = {
            let mut guard = self.inner.lock().await;
            guard.cancel_by_seq(self.seq, self.telemetry.as_ref())
        };

        if removed {
            self.telemetry.increment_counter("pool.ticket.cancelled", 1, None);
            Ok(())
        } else {
            Err(PoolError::NotQueued)
        }
    }

    /// Wait for this ticket to be accepted by a worker.
    ///
    /// Resolves with `NotQueued` if the ticket was cancelled first, or if
    /// `await_job` is called a second time (the receiver is single-use).
    pub async fn await_job(&self) -> Result<JobHandle<I>, PoolError> {
        let receiver = {
            let mut guard = self.accepted_rx.lock().await;
            guard.take()
        };
        let Some(receiver) = receiver else {
            return Err(PoolError::NotQueued);
        };
        receiver.await.map_err(|_| PoolError::NotQueued)
    }
}
