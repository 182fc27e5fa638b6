//! Environment variable parsing and env-to-config merging.
//!
//! Env parsing is strict (invalid values fail fast) and safe (the raw
//! value is never echoed back for a var that looks secret).

use crate::schema::{MinLogLevel, SchedulerConfig, SinkKind, ValidatedSchedulerConfig};
use buildpool_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;
use std::fmt;

/// Env var: cache database path.
pub const ENV_CACHE_DB_PATH: &str = "BUILDPOOL_CACHE_DB_PATH";
/// Env var: admin update timeout in milliseconds.
pub const ENV_ADMIN_UPDATE_TIMEOUT_MS: &str = "BUILDPOOL_ADMIN_UPDATE_TIMEOUT_MS";
/// Env var: log sink (`stdout` | `stderr`).
pub const ENV_LOG_SINK: &str = "BUILDPOOL_LOG_SINK";
/// Env var: minimum log level (`debug` | `info` | `warn` | `error`).
pub const ENV_LOG_MIN_LEVEL: &str = "BUILDPOOL_LOG_MIN_LEVEL";
/// Env var: telemetry sink (`stdout` | `stderr`).
pub const ENV_TELEMETRY_SINK: &str = "BUILDPOOL_TELEMETRY_SINK";
/// Env var: telemetry span sample rate, in `[0.0, 1.0]`.
pub const ENV_TELEMETRY_SPAN_SAMPLE_RATE: &str = "BUILDPOOL_TELEMETRY_SPAN_SAMPLE_RATE";

const ALL_ENV_VARS: &[&str] = &[
    ENV_CACHE_DB_PATH,
    ENV_ADMIN_UPDATE_TIMEOUT_MS,
    ENV_LOG_SINK,
    ENV_LOG_MIN_LEVEL,
    ENV_TELEMETRY_SINK,
    ENV_TELEMETRY_SPAN_SAMPLE_RATE,
];

/// Parsed environment overrides for the scheduler config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerEnv {
    cache_db_path: Option<Box<str>>,
    admin_update_timeout_ms: Option<u64>,
    log_sink: Option<SinkKind>,
    log_min_level: Option<MinLogLevel>,
    telemetry_sink: Option<SinkKind>,
    telemetry_span_sample_rate: Option<f64>,
}

impl SchedulerEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            cache_db_path: parse_optional_trimmed_string(map, ENV_CACHE_DB_PATH)?,
            admin_update_timeout_ms: parse_optional_u64(map, ENV_ADMIN_UPDATE_TIMEOUT_MS)?,
            log_sink: parse_optional_sink(map, ENV_LOG_SINK)?,
            log_min_level: parse_optional_log_level(map, ENV_LOG_MIN_LEVEL)?,
            telemetry_sink: parse_optional_sink(map, ENV_TELEMETRY_SINK)?,
            telemetry_span_sample_rate: parse_optional_f64(
                map,
                ENV_TELEMETRY_SPAN_SAMPLE_RATE,
            )?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in ALL_ENV_VARS {
            if let Ok(value) = std::env::var(name) {
                map.insert((*name).to_string(), value);
            }
        }
        Self::from_map(&map)
    }
}

/// Apply parsed env overrides onto a base config, then validate.
pub fn apply_env_overrides(
    base: SchedulerConfig,
    env: &SchedulerEnv,
) -> Result<ValidatedSchedulerConfig, ErrorEnvelope> {
    let mut config = base;

    if let Some(path) = &env.cache_db_path {
        config.cache_db_path = path.as_ref().into();
    }
    if let Some(timeout_ms) = env.admin_update_timeout_ms {
        config.admin_update_timeout_ms = timeout_ms;
    }
    if let Some(sink) = env.log_sink {
        config.log.sink = sink;
    }
    if let Some(min_level) = env.log_min_level {
        config.log.min_level = min_level;
    }
    if let Some(sink) = env.telemetry_sink {
        config.telemetry.sink = sink;
    }
    if let Some(rate) = env.telemetry_span_sample_rate {
        config.telemetry.span_sample_rate = rate;
    }

    config.validate_and_normalize().map_err(Into::into)
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.to_owned().into_boxed_str()))
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_error| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_f64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<f64>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_error| EnvParseError::InvalidFloat {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_sink(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SinkKind>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "stdout" => Ok(Some(SinkKind::Stdout)),
        "stderr" => Ok(Some(SinkKind::Stderr)),
        _ => Err(EnvParseError::InvalidEnum {
            var,
            value: raw.clone(),
        }),
    }
}

fn parse_optional_log_level(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<MinLogLevel>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "debug" => Ok(Some(MinLogLevel::Debug)),
        "info" => Ok(Some(MinLogLevel::Info)),
        "warn" => Ok(Some(MinLogLevel::Warn)),
        "error" => Ok(Some(MinLogLevel::Error)),
        _ => Err(EnvParseError::InvalidEnum {
            var,
            value: raw.clone(),
        }),
    }
}

/// Env var parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Float env var had an invalid value.
    InvalidFloat {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Enum env var had an unsupported value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "empty_env_var"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidFloat { .. } => ErrorCode::new("config", "invalid_env_float"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } => write!(formatter, "{var} must be non-empty"),
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::InvalidFloat { var, .. } => write!(formatter, "{var} must be a number"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } => {
                envelope = envelope.with_metadata("env_var", var);
            },
            EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidFloat { var, value }
            | EnvParseError::InvalidEnum { var, value } => {
                envelope = envelope
                    .with_metadata("env_var", var)
                    .with_metadata("value", value);
            },
        }

        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_vars_from_map() {
        let mut map = BTreeMap::new();
        map.insert(ENV_ADMIN_UPDATE_TIMEOUT_MS.to_string(), "30000".to_string());
        map.insert(ENV_LOG_SINK.to_string(), "stderr".to_string());
        map.insert(ENV_LOG_MIN_LEVEL.to_string(), "warn".to_string());

        let env = SchedulerEnv::from_map(&map).expect("map should parse");
        assert_eq!(env.admin_update_timeout_ms, Some(30_000));
        assert_eq!(env.log_sink, Some(SinkKind::Stderr));
        assert_eq!(env.log_min_level, Some(MinLogLevel::Warn));
    }

    #[test]
    fn rejects_invalid_integers() {
        let mut map = BTreeMap::new();
        map.insert(
            ENV_ADMIN_UPDATE_TIMEOUT_MS.to_string(),
            "not-a-number".to_string(),
        );
        let error = SchedulerEnv::from_map(&map).expect_err("invalid int should fail");
        assert!(matches!(error, EnvParseError::InvalidInt { .. }));
    }

    #[test]
    fn apply_env_overrides_merges_onto_defaults() {
        let mut map = BTreeMap::new();
        map.insert(ENV_CACHE_DB_PATH.to_string(), "/tmp/cache.sqlite3".to_string());
        let env = SchedulerEnv::from_map(&map).expect("map should parse");

        let validated =
            apply_env_overrides(SchedulerConfig::default(), &env).expect("overrides should apply");
        assert_eq!(
            validated.as_ref().cache_db_path.to_string_lossy(),
            "/tmp/cache.sqlite3"
        );
    }
}
