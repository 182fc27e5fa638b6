//! API v1 DTOs and helpers.

mod mappers;
mod schema;
mod types;
mod validation;

pub use mappers::{error_code_to_api_v1, error_envelope_to_api_v1_error, result_to_api_v1_result};
pub use schema::{
    api_v1_register_worker_request_schema, api_v1_set_gate_active_request_schema,
    api_v1_set_worker_active_request_schema, api_v1_submit_job_request_schema,
};
pub use types::*;
pub use validation::{
    ApiV1ValidationIssue, validate_register_worker_request, validate_set_worker_active_request,
    validate_submit_job_request,
};
