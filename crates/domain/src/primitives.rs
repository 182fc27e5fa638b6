//! Validated identifier newtypes used throughout the scheduler.

use buildpool_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

fn trimmed_non_empty(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// Validation failures for domain primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// `PoolName` is empty after trimming.
    InvalidPoolName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
    /// `WorkerName` is empty after trimming.
    InvalidWorkerName {
        /// Length of the raw input before trimming.
        input_length: usize,
    },
}

impl PrimitiveError {
    /// Stable error code for this failure.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidPoolName { .. } => ErrorCode::new("domain", "invalid_pool_name"),
            Self::InvalidWorkerName { .. } => ErrorCode::new("domain", "invalid_worker_name"),
        }
    }
}

impl fmt::Display for PrimitiveError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPoolName { .. } => formatter.write_str("PoolName must be non-empty"),
            Self::InvalidWorkerName { .. } => formatter.write_str("WorkerName must be non-empty"),
        }
    }
}

impl std::error::Error for PrimitiveError {}

impl From<PrimitiveError> for ErrorEnvelope {
    fn from(error: PrimitiveError) -> Self {
        let code = error.error_code();
        ErrorEnvelope::expected(code, error.to_string())
    }
}

/// Unique name identifying a pool within the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolName(Arc<str>);

impl PoolName {
    /// Parse a `PoolName` from user input, trimming surrounding whitespace.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::InvalidPoolName {
                input_length: raw.len(),
            });
        };
        Ok(Self(Arc::from(trimmed)))
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PoolName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PoolName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Unique name identifying a worker within a pool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerName(Arc<str>);

impl WorkerName {
    /// Parse a `WorkerName` from user input, trimming surrounding whitespace.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, PrimitiveError> {
        let raw = input.as_ref();
        let Some(trimmed) = trimmed_non_empty(raw) else {
            return Err(PrimitiveError::InvalidWorkerName {
                input_length: raw.len(),
            });
        };
        Ok(Self(Arc::from(trimmed)))
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for WorkerName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for WorkerName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Opaque cache-locality hint attached to a submitted item.
///
/// An empty hint (the default) means "no locality preference"; unlike
/// [`PoolName`]/[`WorkerName`] it is never rejected for being empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CacheHint(Arc<str>);

impl CacheHint {
    /// The "no locality preference" hint.
    #[must_use]
    pub fn none() -> Self {
        Self(Arc::from(""))
    }

    /// Build a hint from a raw string. Whitespace is preserved; callers decide
    /// what constitutes "empty" for their own hint vocabulary.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(Arc::from(raw.as_ref()))
    }

    /// Returns true when this hint carries no locality preference.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheHint {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CacheHint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl From<&str> for CacheHint {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for CacheHint {
    fn from(raw: String) -> Self {
        Self(Arc::from(raw.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_name_rejects_blank() {
        assert!(PoolName::parse("   ").is_err());
        assert!(PoolName::parse("ci-pool").is_ok());
    }

    #[test]
    fn worker_name_trims_whitespace() {
        let name = WorkerName::parse("  worker-1  ").expect("valid");
        assert_eq!(name.as_str(), "worker-1");
    }

    #[test]
    fn cache_hint_empty_means_none() {
        assert!(CacheHint::none().is_none());
        assert!(CacheHint::new("").is_none());
        assert!(!CacheHint::new("a").is_none());
    }

    #[test]
    fn names_sort_deterministically() {
        let mut names = vec![
            WorkerName::parse("worker-2").expect("valid"),
            WorkerName::parse("worker-1").expect("valid"),
        ];
        names.sort();
        assert_eq!(names[0].as_str(), "worker-1");
    }
}
