//! # buildpool-infra
//!
//! Infrastructure wiring and runtime composition.
//!
//! This crate is the composition root: it reads a [`ValidatedSchedulerConfig`]
//! and builds the concrete adapters (`buildpool-adapters`) that back a
//! [`buildpool_app::PoolRegistry<BuildJob>`], ready for the CLI or any other
//! surface to drive.

use buildpool_adapters::{JsonLogger, JsonTelemetry, SqliteCacheDao, StderrLogSink, StdoutLogSink};
use buildpool_app::PoolRegistry;
use buildpool_config::{MinLogLevel, SinkKind, ValidatedSchedulerConfig};
use buildpool_domain::BuildJob;
use buildpool_ports::{CacheDao, LogLevel, LoggerPort, TelemetryPort};
use std::sync::Arc;

/// Everything a running scheduler process needs: the pool registry plus the
/// configuration it was built from, kept around for introspection (e.g. the
/// CLI's `config` command).
pub struct Scheduler {
    registry: PoolRegistry<BuildJob>,
    config: ValidatedSchedulerConfig,
}

impl Scheduler {
    /// Build a scheduler runtime from a validated configuration.
    #[must_use]
    pub fn build(config: ValidatedSchedulerConfig) -> Self {
        let raw = config.as_ref();

        let cache_dao: Arc<dyn CacheDao> = Arc::new(SqliteCacheDao::new(raw.cache_db_path.clone()));
        let logger: Arc<dyn LoggerPort> = Arc::new(build_logger(&raw.log));
        let telemetry: Arc<dyn TelemetryPort> = Arc::new(build_telemetry(&raw.telemetry));

        let registry = PoolRegistry::new(cache_dao, telemetry, logger);
        Self { registry, config }
    }

    /// The pool registry this scheduler composed.
    #[must_use]
    pub const fn registry(&self) -> &PoolRegistry<BuildJob> {
        &self.registry
    }

    /// The configuration this scheduler was built from.
    #[must_use]
    pub const fn config(&self) -> &ValidatedSchedulerConfig {
        &self.config
    }
}

fn build_logger(log: &buildpool_config::LogConfig) -> JsonLogger {
    let sink = build_sink(log.sink);
    JsonLogger::new(sink).with_min_level(map_min_level(log.min_level))
}

fn build_telemetry(telemetry: &buildpool_config::TelemetryConfig) -> JsonTelemetry {
    let sink = build_sink(telemetry.sink);
    JsonTelemetry::new(sink).with_span_sample_rate(telemetry.span_sample_rate)
}

fn build_sink(kind: SinkKind) -> Arc<dyn buildpool_adapters::LogSink> {
    match kind {
        SinkKind::Stdout => Arc::new(StdoutLogSink),
        SinkKind::Stderr => Arc::new(StderrLogSink),
    }
}

const fn map_min_level(level: MinLogLevel) -> LogLevel {
    match level {
        MinLogLevel::Debug => LogLevel::Debug,
        MinLogLevel::Info => LogLevel::Info,
        MinLogLevel::Warn => LogLevel::Warn,
        MinLogLevel::Error => LogLevel::Error,
    }
}

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
