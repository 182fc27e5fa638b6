//! API v1 DTO validation helpers (shape and limit checks only).

use crate::v1::{
    ApiV1RegisterWorkerRequestDto, ApiV1SetWorkerActiveRequestDto, ApiV1SubmitJobRequestDto,
};
use buildpool_shared::{Validate, ValidationError};
use std::fmt;

/// Validation failure details for API v1 DTOs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiV1ValidationIssue {
    /// Field name that failed validation.
    pub field: &'static str,
    /// Human-readable validation error message.
    pub message: Box<str>,
}

impl ApiV1ValidationIssue {
    fn new(field: &'static str, message: impl Into<Box<str>>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiV1ValidationIssue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ApiV1ValidationIssue {}

impl ValidationError for ApiV1ValidationIssue {
    fn empty(field: &'static str) -> Self {
        Self::new(field, "value must be non-empty")
    }

    fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::new(field, reason)
    }

    fn out_of_range(field: &'static str, _value: String, min: String, max: String) -> Self {
        Self::new(field, format!("value must be between {min} and {max}"))
    }
}

/// Validate a submit-job request DTO.
pub fn validate_submit_job_request(
    dto: &ApiV1SubmitJobRequestDto,
) -> Result<(), ApiV1ValidationIssue> {
    dto.validate()
}

/// Validate a register-worker request DTO.
pub fn validate_register_worker_request(
    dto: &ApiV1RegisterWorkerRequestDto,
) -> Result<(), ApiV1ValidationIssue> {
    dto.validate()
}

/// Validate a set-worker-active request DTO.
pub fn validate_set_worker_active_request(
    dto: &ApiV1SetWorkerActiveRequestDto,
) -> Result<(), ApiV1ValidationIssue> {
    dto.validate()
}
