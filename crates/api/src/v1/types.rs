//! API v1 DTO types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error kind exposed in API v1 responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiV1ErrorKind {
    /// Expected, user-facing errors (validation, unknown worker, timeout).
    Expected,
    /// Invariant violations that indicate a bug.
    Invariant,
}

/// API v1 error code string (stable contract value).
pub type ApiV1ErrorCode = String;

/// Metadata map attached to API v1 errors.
pub type ApiV1ErrorMeta = BTreeMap<String, String>;

/// API v1 error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1ErrorDto {
    /// Stable error code (e.g. `ERR_POOL_NAME_TAKEN`).
    pub code: ApiV1ErrorCode,
    /// Human-readable message for the caller.
    pub message: String,
    /// Error category.
    pub kind: ApiV1ErrorKind,
    /// Optional metadata for debugging and correlation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ApiV1ErrorMeta>,
}

/// API v1 result wrapper for success or failure payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiV1Result<T> {
    /// Success response.
    Ok {
        /// Indicates success.
        ok: bool,
        /// Success payload.
        data: T,
    },
    /// Error response.
    Err {
        /// Indicates failure.
        ok: bool,
        /// Error payload.
        error: ApiV1ErrorDto,
    },
}

impl<T> ApiV1Result<T> {
    /// Build a success response wrapper.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self::Ok { ok: true, data }
    }

    /// Build an error response wrapper.
    #[must_use]
    pub const fn err(error: ApiV1ErrorDto) -> Self {
        Self::Err { ok: false, error }
    }
}

/// API v1 job submission request payload.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    buildpool_validate_derive::Validate,
)]
#[serde(rename_all = "camelCase")]
#[validate(error = "crate::v1::validation::ApiV1ValidationIssue")]
pub struct ApiV1SubmitJobRequestDto {
    /// Name of the pool to submit into.
    #[validate(non_empty)]
    pub pool: String,
    /// Whether this item should be served ahead of non-urgent work.
    #[serde(default)]
    pub urgent: bool,
    /// Submitter-supplied build target description.
    #[validate(non_empty)]
    pub target: String,
    /// Optional cache locality hint; empty/absent means no preference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_hint: Option<String>,
    /// Cost if assigned to a cache-warm worker.
    #[serde(default)]
    #[validate(field = "costCached", range(min = 0, max = 1_000_000))]
    pub cost_cached: u32,
    /// Cost if assigned to a cold worker.
    #[serde(default)]
    #[validate(field = "costNonCached", range(min = 0, max = 1_000_000))]
    pub cost_non_cached: u32,
}

/// API v1 job acceptance payload, returned once a worker accepts the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1JobAcceptedDto {
    /// Pool the job was submitted into.
    pub pool: String,
    /// Worker that accepted the item.
    pub worker: String,
    /// The accepted item's display form.
    pub target: String,
}

/// API v1 worker registration request payload.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    buildpool_validate_derive::Validate,
)]
#[serde(rename_all = "camelCase")]
#[validate(error = "crate::v1::validation::ApiV1ValidationIssue")]
pub struct ApiV1RegisterWorkerRequestDto {
    /// Pool the worker joins.
    #[validate(non_empty)]
    pub pool: String,
    /// The worker's unique name within the pool.
    #[validate(non_empty)]
    pub worker: String,
}

/// API v1 worker activation request payload.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    buildpool_validate_derive::Validate,
)]
#[serde(rename_all = "camelCase")]
#[validate(error = "crate::v1::validation::ApiV1ValidationIssue")]
pub struct ApiV1SetWorkerActiveRequestDto {
    /// Pool the worker belongs to.
    #[validate(non_empty)]
    pub pool: String,
    /// The worker's name.
    #[validate(non_empty)]
    pub worker: String,
    /// Desired active state.
    pub active: bool,
}

/// API v1 worker reconnect-wait request payload (the admin "update" operation).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    buildpool_validate_derive::Validate,
)]
#[serde(rename_all = "camelCase")]
#[validate(error = "crate::v1::validation::ApiV1ValidationIssue")]
pub struct ApiV1UpdateWorkerRequestDto {
    /// Pool the worker belongs to.
    #[validate(non_empty)]
    pub pool: String,
    /// The worker's name; it must re-register under this same name.
    #[validate(non_empty)]
    pub worker: String,
}

/// API v1 global active-gate request payload.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    buildpool_validate_derive::Validate,
)]
#[serde(rename_all = "camelCase")]
#[validate(error = "crate::v1::validation::ApiV1ValidationIssue")]
pub struct ApiV1SetGateActiveRequestDto {
    /// Pool whose gate is being toggled.
    #[validate(non_empty)]
    pub pool: String,
    /// Desired active state.
    pub active: bool,
}

/// API v1 pool listing payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiV1PoolListDto {
    /// Every known pool name, sorted.
    pub pools: Vec<String>,
}
