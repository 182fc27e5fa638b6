//! # buildpool-config
//!
//! Configuration schema, validation, and normalization logic for the
//! scheduler. This crate depends on `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file + overrides).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use env::{ENV_ADMIN_UPDATE_TIMEOUT_MS, ENV_CACHE_DB_PATH, EnvParseError, SchedulerEnv, apply_env_overrides};
pub use load::{
    load_scheduler_config_from_path, load_scheduler_config_from_sources,
    load_scheduler_config_std_env, to_pretty_json, to_pretty_toml,
};
pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigSchemaError, LogConfig, MinLogLevel, SchedulerConfig, SinkKind,
    TelemetryConfig, ValidatedSchedulerConfig,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
