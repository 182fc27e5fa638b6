//! The submitted-item contract: cost estimation and cache locality.

use crate::primitives::CacheHint;
use std::fmt;

/// Expected duration in the two placement regimes, in opaque cost units.
///
/// `cached` is what the item should cost on a worker that already holds its
/// cache hint; `non_cached` is the cost anywhere else (including the
/// locality cap used by [`crate::Item`]-aware placement).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CostEstimate {
    /// Expected cost when run on a worker that already holds the relevant cache state.
    pub cached: u32,
    /// Expected cost when run on a worker with no relevant cache state.
    pub non_cached: u32,
}

impl CostEstimate {
    /// Build a cost estimate.
    #[must_use]
    pub const fn new(cached: u32, non_cached: u32) -> Self {
        Self { cached, non_cached }
    }

    /// A cost estimate with no locality benefit at all.
    #[must_use]
    pub const fn uniform(cost: u32) -> Self {
        Self {
            cached: cost,
            non_cached: cost,
        }
    }
}

/// Contract required of a submitted payload.
///
/// Implementors are typically a thin wrapper (or `Arc`) around a build
/// request descriptor; the trait requires `Clone` because both the
/// submitter's [`crate::Item`] handle and the worker that eventually accepts
/// it need their own owned copy.
pub trait Item: Clone + Send + Sync + fmt::Debug + 'static {
    /// Cache-locality hint; [`CacheHint::is_none`] means "no preference".
    fn cache_hint(&self) -> &CacheHint;

    /// Expected duration in the cached/non-cached regimes.
    fn cost_estimate(&self) -> CostEstimate;

    /// Human-readable form suitable for logs and admin snapshots.
    fn display_form(&self) -> String;
}
