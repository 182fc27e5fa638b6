//! # buildpool-ports
//!
//! Port traits for the build-pool scheduler's hexagonal architecture.
//!
//! This crate defines the interfaces between the pool core/domain and
//! infrastructure layers. It depends only on `domain` and `shared`.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by port traits.
///
/// We deliberately use boxed futures for boundary traits (I/O-bound work),
/// keeping the traits object-safe so adapters can be selected at runtime.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod cache_dao;
pub mod logger;
pub mod telemetry;

pub use cache_dao::CacheDao;
pub use logger::*;
pub use telemetry::*;
