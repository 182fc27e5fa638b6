//! # buildpool-pool
//!
//! The pool scheduler core: backlog, worker lifecycle, cache-aware
//! placement, and ticket cancellation.
//!
//! This crate holds no I/O. It depends on `buildpool-ports` for the cache
//! DAO, logger, and telemetry boundary traits, and on `buildpool-domain`
//! for the `Item` contract and the shared identifier newtypes. Concrete
//! adapters, use-cases, and the CLI live in the crates above this one.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod active_gate;
mod backlog;
mod error;
mod pool;
mod seq;
mod ticket;
mod worker;

pub use active_gate::ActiveGate;
pub use backlog::Priority;
pub use error::PoolError;
pub use pool::{Pool, WorkerHandle};
pub use seq::SeqId;
pub use ticket::{JobHandle, Ticket};

/// Returns the pool crate version.
#[must_use]
pub const fn pool_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
