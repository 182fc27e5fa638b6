//! # buildpool-domain
//!
//! Domain entities and value objects for the build-pool scheduler.
//!
//! This crate contains the pure domain model with no infrastructure
//! dependencies:
//!
//! - **Primitives**: `PoolName`, `WorkerName`, `CacheHint`
//! - **Item contract**: `CostEstimate`, the `Item` trait
//! - **Snapshots**: `WorkerStatus`, `WorkerSnapshot`, `PoolSnapshot` for admin surfaces
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared`
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use buildpool_shared::shared_crate_version;

pub mod build_job;
pub mod item;
pub mod primitives;
pub mod status;

pub use build_job::BuildJob;
pub use item::{CostEstimate, Item};
pub use primitives::{CacheHint, PoolName, PrimitiveError, WorkerName};
pub use status::{PoolSnapshot, WorkerSnapshot, WorkerStatus};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
