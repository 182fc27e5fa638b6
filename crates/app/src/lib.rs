//! # buildpool-app
//!
//! Application use cases for the build-pool scheduler: submitting jobs,
//! registering workers, and the admin surface over pools, workers, and the
//! active gate.
//!
//! This crate owns no I/O of its own; it composes `buildpool-pool`'s core
//! against the `buildpool-ports` boundary traits via [`PoolRegistry`] and
//! exposes one function per use case for `buildpool-facade`/the CLI to call.

pub mod admin_gate;
pub mod admin_pools;
pub mod admin_worker;
pub mod register_worker;
pub mod registry;
pub mod submit_job;

pub use admin_gate::{admin_gate_is_active, admin_set_gate_active};
pub use admin_pools::{admin_list_pools, admin_pool_snapshot};
pub use admin_worker::{admin_set_worker_active, admin_update_worker};
pub use register_worker::register_worker;
pub use registry::PoolRegistry;
pub use submit_job::submit_job;

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
