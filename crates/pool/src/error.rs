//! Pool-local error types.

use buildpool_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use std::fmt;

/// Errors produced directly by the pool core, distinct from the shared
/// [`ErrorEnvelope`] used at adapter/app/facade boundaries.
///
/// See the `From<PoolError> for ErrorEnvelope` impl for the `pool:*` code
/// mapping applied once these cross into the app layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// `register` was called with a name already present in the worker map.
    NameTaken,
    /// `cancel` was called on a ticket that is not (or is no longer) queued.
    NotQueued,
    /// `pop` was called by a worker that has been `release`d.
    Finished,
    /// An admin operation named a worker that is not in the pool.
    UnknownWorker,
    /// `admin_update_worker` did not see a reconnect within its deadline.
    Timeout,
}

impl PoolError {
    /// The stable `pool:*` error code identifier for this variant.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NameTaken => "name_taken",
            Self::NotQueued => "not_queued",
            Self::Finished => "finished",
            Self::UnknownWorker => "unknown_worker",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::NameTaken => "worker name already registered",
            Self::NotQueued => "ticket is not queued",
            Self::Finished => "worker has been released",
            Self::UnknownWorker => "worker not found in pool",
            Self::Timeout => "worker did not reconnect before the deadline",
        };
        formatter.write_str(message)
    }
}

impl std::error::Error for PoolError {}

impl From<PoolError> for ErrorEnvelope {
    fn from(error: PoolError) -> Self {
        let code = ErrorCode::new("pool", error.code());
        Self::expected_with_class(code, error.to_string(), ErrorClass::NonRetriable)
    }
}
