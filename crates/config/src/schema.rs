//! Scheduler configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (TOML or JSON).
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.

use buildpool_shared::{BoundedU64, ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

const ADMIN_TIMEOUT_MIN_MS: u64 = 1_000;
const ADMIN_TIMEOUT_MAX_MS: u64 = 600_000;
const ADMIN_TIMEOUT_DEFAULT_MS: u64 = 600_000;

/// Where a sink (logging or telemetry) writes its lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Write JSON lines to stdout (the default).
    Stdout,
    /// Write JSON lines to stderr.
    Stderr,
}

impl Default for SinkKind {
    fn default() -> Self {
        Self::Stdout
    }
}

/// Minimum severity a log event must reach to be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinLogLevel {
    /// Emit everything, including debug events.
    Debug,
    /// Emit info and above (the default).
    Info,
    /// Emit warnings and above.
    Warn,
    /// Emit only errors.
    Error,
}

impl Default for MinLogLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LogConfig {
    /// Where log lines are written.
    pub sink: SinkKind,
    /// Minimum severity emitted.
    pub min_level: MinLogLevel,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            min_level: MinLogLevel::default(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct TelemetryConfig {
    /// Where metric/span lines are written.
    pub sink: SinkKind,
    /// Fraction of timers that also emit start/end span lines, in `[0.0, 1.0]`.
    pub span_sample_rate: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            span_sample_rate: 1.0,
        }
    }
}

/// Top-level scheduler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SchedulerConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// Path to the cache-locality SQLite database.
    pub cache_db_path: PathBuf,
    /// Timeout (ms) the admin "update" operation waits for a worker to
    /// reconnect under the same name, bounded to `[1_000, 600_000]`.
    pub admin_update_timeout_ms: u64,
    /// Structured logging configuration.
    pub log: LogConfig,
    /// Telemetry configuration.
    pub telemetry: TelemetryConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            cache_db_path: PathBuf::from("buildpool-cache.sqlite3"),
            admin_update_timeout_ms: ADMIN_TIMEOUT_DEFAULT_MS,
            log: LogConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Validate and normalize the config, producing a wrapper that carries
    /// the bounded admin timeout.
    pub fn validate_and_normalize(self) -> Result<ValidatedSchedulerConfig, ConfigSchemaError> {
        self.validate_version()?;

        let admin_update_timeout_ms =
            BoundedU64::<ADMIN_TIMEOUT_MIN_MS, ADMIN_TIMEOUT_MAX_MS>::try_new(
                self.admin_update_timeout_ms,
            )
            .map_err(|_error| ConfigSchemaError::TimeoutOutOfRange {
                section: "admin",
                field: "updateTimeoutMs",
                value_ms: self.admin_update_timeout_ms,
                min_ms: ADMIN_TIMEOUT_MIN_MS,
                max_ms: ADMIN_TIMEOUT_MAX_MS,
            })?;

        if !(0.0..=1.0).contains(&self.telemetry.span_sample_rate)
            || !self.telemetry.span_sample_rate.is_finite()
        {
            return Err(ConfigSchemaError::SampleRateOutOfRange {
                value: self.telemetry.span_sample_rate,
            });
        }

        Ok(ValidatedSchedulerConfig {
            admin_update_timeout_ms,
            raw: self,
        })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }
}

/// Validated config wrapper carrying the bounded admin timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSchedulerConfig {
    raw: SchedulerConfig,
    admin_update_timeout_ms: BoundedU64<ADMIN_TIMEOUT_MIN_MS, ADMIN_TIMEOUT_MAX_MS>,
}

impl ValidatedSchedulerConfig {
    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &SchedulerConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> SchedulerConfig {
        self.raw
    }

    /// The bounded admin reconnect-wait timeout, in milliseconds.
    #[must_use]
    pub const fn admin_update_timeout_ms(&self) -> u64 {
        self.admin_update_timeout_ms.get()
    }
}

/// Configuration validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A timeout value is out of bounds.
    TimeoutOutOfRange {
        /// Schema section (e.g. `admin`).
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Value provided (ms).
        value_ms: u64,
        /// Minimum allowed value (ms).
        min_ms: u64,
        /// Maximum allowed value (ms).
        max_ms: u64,
    },
    /// The telemetry span sample rate is outside `[0.0, 1.0]`.
    SampleRateOutOfRange {
        /// Value provided.
        value: f64,
    },
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => write!(
                formatter,
                "unsupported config version: {found} (supported: {supported})"
            ),
            Self::TimeoutOutOfRange {
                section,
                field,
                value_ms,
                min_ms,
                max_ms,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min_ms}, {max_ms}] ms (got {value_ms})"
            ),
            Self::SampleRateOutOfRange { value } => write!(
                formatter,
                "telemetry.spanSampleRate must be within [0.0, 1.0] (got {value})"
            ),
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        Self::expected(code, message)
    }
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::TimeoutOutOfRange { .. } => ErrorCode::new("config", "timeout_out_of_range"),
            Self::SampleRateOutOfRange { .. } => {
                ErrorCode::new("config", "sample_rate_out_of_range")
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        let validated = SchedulerConfig::default()
            .validate_and_normalize()
            .expect("defaults should validate");
        assert_eq!(validated.admin_update_timeout_ms(), 600_000);
    }

    #[test]
    fn rejects_admin_timeout_below_minimum() {
        let mut config = SchedulerConfig::default();
        config.admin_update_timeout_ms = 500;
        let error = config
            .validate_and_normalize()
            .expect_err("timeout below minimum should fail");
        assert!(matches!(error, ConfigSchemaError::TimeoutOutOfRange { .. }));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut config = SchedulerConfig::default();
        config.version = 99;
        let error = config
            .validate_and_normalize()
            .expect_err("unsupported version should fail");
        assert!(matches!(error, ConfigSchemaError::UnsupportedVersion { .. }));
    }

    #[test]
    fn rejects_out_of_range_sample_rate() {
        let mut config = SchedulerConfig::default();
        config.telemetry.span_sample_rate = 1.5;
        let error = config
            .validate_and_normalize()
            .expect_err("sample rate above 1.0 should fail");
        assert!(matches!(error, ConfigSchemaError::SampleRateOutOfRange { .. }));
    }
}
