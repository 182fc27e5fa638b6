//! Pool-wide pause switch: when paused, every worker `pop` blocks before
//! consuming any queue.

use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

enum GateState {
    Active,
    Paused(Arc<Notify>),
}

/// Either `Active` or `Paused(ready)`. `set(true)` on a paused gate resolves
/// `ready` and flips to `Active`; `set(false)` on an active gate allocates a
/// fresh unresolved `ready`. `wait` returns immediately when active, else
/// waits on the current `ready`.
///
/// A `Pool` owns one via `Arc<ActiveGate>`, shared across every `Pool`
/// instance that should pause together (the composition root decides what
/// "together" means; see DESIGN.md).
pub struct ActiveGate {
    state: Mutex<GateState>,
}

impl ActiveGate {
    /// Create a gate starting active or paused.
    #[must_use]
    pub fn new(active: bool) -> Self {
        let state = if active {
            GateState::Active
        } else {
            GateState::Paused(Arc::new(Notify::new()))
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Return immediately if active; otherwise wait for the next
    /// `set(true)`. The wait handle is captured while still holding the
    /// gate's own lock, so a `set(true)` racing the lock release cannot be
    /// missed.
    pub async fn wait(&self) {
        loop {
            let guard = self.state.lock().await;
            let notify = match &*guard {
                GateState::Active => return,
                GateState::Paused(notify) => Arc::clone(notify),
            };
            let notified = notify.notified();
            drop(guard);
            notified.await;
        }
    }

    /// Flip the gate. A no-op if already in the requested state.
    pub async fn set(&self, active: bool) {
        let mut guard = self.state.lock().await;
        match (&*guard, active) {
            (GateState::Paused(notify), true) => {
                let notify = Arc::clone(notify);
                *guard = GateState::Active;
                drop(guard);
                notify.notify_waiters();
            },
            (GateState::Active, false) => {
                *guard = GateState::Paused(Arc::new(Notify::new()));
            },
            _ => {},
        }
    }

    /// Returns true if the gate is currently active.
    pub async fn is_active(&self) -> bool {
        matches!(&*self.state.lock().await, GateState::Active)
    }
}

impl Default for ActiveGate {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_returns_immediately_when_active() {
        let gate = ActiveGate::new(true);
        tokio::time::timeout(Duration::from_millis(50), gate.wait())
            .await
            .expect("wait should not block while active");
    }

    #[tokio::test]
    async fn wait_unblocks_on_set_active() {
        let gate = Arc::new(ActiveGate::new(false));
        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait().await })
        };

        tokio::task::yield_now().await;
        assert!(!gate.is_active().await);
        gate.set(true).await;

        tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .expect("waiter should complete")
            .expect("task should not panic");
        assert!(gate.is_active().await);
    }

    #[tokio::test]
    async fn set_false_then_true_is_idempotent_when_already_in_state() {
        let gate = ActiveGate::new(true);
        gate.set(true).await;
        assert!(gate.is_active().await);
        gate.set(false).await;
        gate.set(false).await;
        assert!(!gate.is_active().await);
    }
}
