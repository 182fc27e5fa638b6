//! `BuildJob`: the concrete [`Item`] implementation used by the ambient
//! stack (API DTOs, the app layer, and the CLI smoke harness).
//!
//! The pool core is generic over any [`Item`] implementor; real deployments
//! are free to plug in their own request type. This crate still needs one
//! concrete, serializable payload to carry across the would-be RPC boundary
//! and to drive the CLI, so it lives here rather than in `api` (which must
//! not depend on `pool`).

use crate::item::{CostEstimate, Item};
use crate::primitives::CacheHint;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A submitted build job: a free-form target description plus the
/// placement hints the pool scheduler consults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildJob {
    /// Submitter-supplied description of what to build (e.g. a target
    /// path or image tag). Opaque to the scheduler.
    target: Arc<str>,
    hint: CacheHint,
    cost: CostEstimate,
}

impl BuildJob {
    /// Build a job with an explicit cost estimate.
    #[must_use]
    pub fn new(target: impl Into<Arc<str>>, hint: CacheHint, cost: CostEstimate) -> Self {
        Self {
            target: target.into(),
            hint,
            cost,
        }
    }

    /// Build a job with no cache preference and a uniform cost.
    #[must_use]
    pub fn uncached(target: impl Into<Arc<str>>, cost: u32) -> Self {
        Self::new(target, CacheHint::none(), CostEstimate::uniform(cost))
    }

    /// The submitter-supplied build target description.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Item for BuildJob {
    fn cache_hint(&self) -> &CacheHint {
        &self.hint
    }

    fn cost_estimate(&self) -> CostEstimate {
        self.cost
    }

    fn display_form(&self) -> String {
        if self.hint.is_none() {
            self.target.to_string()
        } else {
            format!("{} (hint={})", self.target, self.hint)
        }
    }
}
