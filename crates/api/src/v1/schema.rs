//! JSON Schema exports for API v1 request DTOs.

use crate::v1::{
    ApiV1RegisterWorkerRequestDto, ApiV1SetGateActiveRequestDto, ApiV1SetWorkerActiveRequestDto,
    ApiV1SubmitJobRequestDto,
};
use schemars::schema::RootSchema;
use schemars::schema_for;

/// JSON Schema for `ApiV1SubmitJobRequestDto`.
#[must_use]
pub fn api_v1_submit_job_request_schema() -> RootSchema {
    schema_for!(ApiV1SubmitJobRequestDto)
}

/// JSON Schema for `ApiV1RegisterWorkerRequestDto`.
#[must_use]
pub fn api_v1_register_worker_request_schema() -> RootSchema {
    schema_for!(ApiV1RegisterWorkerRequestDto)
}

/// JSON Schema for `ApiV1SetWorkerActiveRequestDto`.
#[must_use]
pub fn api_v1_set_worker_active_request_schema() -> RootSchema {
    schema_for!(ApiV1SetWorkerActiveRequestDto)
}

/// JSON Schema for `ApiV1SetGateActiveRequestDto`.
#[must_use]
pub fn api_v1_set_gate_active_request_schema() -> RootSchema {
    schema_for!(ApiV1SetGateActiveRequestDto)
}
