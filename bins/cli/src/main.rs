//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::{
    DemoOptions, run_config_show, run_config_validate, run_demo, run_info,
};
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode};
use buildpool_api::v1::{
    ApiV1ErrorDto, ApiV1ErrorKind, ApiV1Result, ApiV1SetGateActiveRequestDto,
    ApiV1SetWorkerActiveRequestDto, ApiV1UpdateWorkerRequestDto,
};
use buildpool_config::load_scheduler_config_std_env;
use buildpool_facade::Scheduler;
use buildpool_shared::{ErrorEnvelope, RequestContext};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "buildpool",
    version,
    about = "Build-cluster pool scheduler CLI",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show build and version details.
    Info,
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Run an in-process demo of the scheduler (register, submit, pop, pause/resume).
    Demo {
        /// Pool name to exercise.
        #[arg(long, default_value = "demo")]
        pool: String,
        /// Number of workers to register and activate.
        #[arg(long, default_value_t = 2)]
        workers: usize,
        /// Number of jobs to submit.
        #[arg(long, default_value_t = 6)]
        jobs: usize,
        /// How long an idle worker waits for more work before it's drained.
        #[arg(long, default_value_t = 200)]
        pop_idle_timeout_ms: u64,
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// List every pool the scheduler has created so far.
    Pools {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// Show a pool's backlog depth and worker states.
    Show {
        /// Pool name.
        #[arg(long)]
        pool: String,
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// Force a worker active or inactive from the admin surface.
    SetWorkerActive {
        /// Pool the worker belongs to.
        #[arg(long)]
        pool: String,
        /// The worker's name.
        #[arg(long)]
        worker: String,
        /// Desired active state.
        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// Open or close a pool's global active gate.
    SetGateActive {
        /// Pool whose gate is being toggled.
        #[arg(long)]
        pool: String,
        /// Desired active state.
        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// Ask a worker to self-update: deactivate it and wait for it to re-register.
    UpdateWorker {
        /// Pool the worker belongs to.
        #[arg(long)]
        pool: String,
        /// The worker's name; it must re-register under this same name.
        #[arg(long)]
        worker: String,
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Show the effective config after applying overrides.
    Show {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// Validate config loading and overrides without printing them.
    Validate {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => return exit_with_error(&CliError::from(error)),
    };

    match runtime.block_on(run(&cli.command, mode)) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

async fn run(command: &Commands, mode: OutputMode) -> Result<CliOutput, CliError> {
    match command {
        Commands::Info => run_info(mode),
        Commands::Config { command } => match command {
            ConfigCommands::Show {
                path,
                overrides_json,
            } => run_config_show(mode, path.as_deref(), overrides_json.as_deref()),
            ConfigCommands::Validate {
                path,
                overrides_json,
            } => run_config_validate(mode, path.as_deref(), overrides_json.as_deref()),
        },
        Commands::Demo {
            pool,
            workers,
            jobs,
            pop_idle_timeout_ms,
            config,
            overrides_json,
        } => {
            run_demo(
                mode,
                DemoOptions {
                    pool,
                    workers: *workers,
                    jobs: *jobs,
                    pop_idle_timeout_ms: *pop_idle_timeout_ms,
                    config_path: config.as_deref(),
                    overrides_json: overrides_json.as_deref(),
                },
            )
            .await
        },
        Commands::Pools {
            config,
            overrides_json,
        } => pools_list(mode, config.as_deref(), overrides_json.as_deref()).await,
        Commands::Show {
            pool,
            config,
            overrides_json,
        } => pool_show(mode, config.as_deref(), overrides_json.as_deref(), pool).await,
        Commands::SetWorkerActive {
            pool,
            worker,
            active,
            config,
            overrides_json,
        } => {
            set_worker_active(
                mode,
                config.as_deref(),
                overrides_json.as_deref(),
                pool,
                worker,
                *active,
            )
            .await
        },
        Commands::SetGateActive {
            pool,
            active,
            config,
            overrides_json,
        } => set_gate_active(mode, config.as_deref(), overrides_json.as_deref(), pool, *active).await,
        Commands::UpdateWorker {
            pool,
            worker,
            config,
            overrides_json,
        } => update_worker(mode, config.as_deref(), overrides_json.as_deref(), pool, worker).await,
    }
}

fn build_scheduler(config: Option<&std::path::Path>, overrides_json: Option<&str>) -> Result<Scheduler, ErrorEnvelope> {
    let validated = load_scheduler_config_std_env(config, overrides_json)?;
    Ok(Scheduler::build(validated))
}

async fn pools_list(
    mode: OutputMode,
    config: Option<&std::path::Path>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    let scheduler = match build_scheduler(config, overrides_json) {
        Ok(scheduler) => scheduler,
        Err(error) => return Ok(format_error_output(mode, &error, exit_code_for(&error))),
    };

    let pools = buildpool_facade::list_pools(&scheduler).await;

    let stdout = if mode.is_ndjson() {
        let mut out = serde_json::to_string(&serde_json::json!({
            "type": "summary",
            "status": "ok",
            "kind": "pools",
            "pools": pools.pools,
        }))?;
        out.push('\n');
        out
    } else if mode.is_json() {
        let mut out = serde_json::to_string_pretty(&serde_json::json!({
            "status": "ok",
            "pools": pools.pools,
        }))?;
        out.push('\n');
        out
    } else {
        let mut out = String::from("status: ok\npools:\n");
        for pool in &pools.pools {
            out.push_str("  ");
            out.push_str(pool);
            out.push('\n');
        }
        out
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

async fn pool_show(
    mode: OutputMode,
    config: Option<&std::path::Path>,
    overrides_json: Option<&str>,
    pool: &str,
) -> Result<CliOutput, CliError> {
    let scheduler = match build_scheduler(config, overrides_json) {
        Ok(scheduler) => scheduler,
        Err(error) => return Ok(format_error_output(mode, &error, exit_code_for(&error))),
    };

    match buildpool_facade::pool_snapshot(&scheduler, pool).await {
        ApiV1Result::Ok { data, .. } => {
            let stdout = if mode.is_ndjson() {
                let mut out = serde_json::to_string(&serde_json::json!({
                    "type": "summary",
                    "status": "ok",
                    "kind": "show",
                    "snapshot": data,
                }))?;
                out.push('\n');
                out
            } else if mode.is_json() {
                let mut out = serde_json::to_string_pretty(&serde_json::json!({
                    "status": "ok",
                    "snapshot": data,
                }))?;
                out.push('\n');
                out
            } else {
                format!(
                    "status: ok\npool: {pool}\nbacklogHigh: {}\nbacklogLow: {}\nreadyWorkers: {}\nworkers: {}\n",
                    data.backlog_high,
                    data.backlog_low,
                    data.ready_workers,
                    data.workers.len()
                )
            };
            Ok(CliOutput {
                stdout,
                stderr: String::new(),
                exit_code: ExitCode::Ok,
            })
        },
        ApiV1Result::Err { error, .. } => Ok(format_api_error_output(mode, &error, api_exit_code(error.kind))),
    }
}

async fn set_worker_active(
    mode: OutputMode,
    config: Option<&std::path::Path>,
    overrides_json: Option<&str>,
    pool: &str,
    worker: &str,
    active: bool,
) -> Result<CliOutput, CliError> {
    let scheduler = match build_scheduler(config, overrides_json) {
        Ok(scheduler) => scheduler,
        Err(error) => return Ok(format_error_output(mode, &error, exit_code_for(&error))),
    };

    let request = ApiV1SetWorkerActiveRequestDto {
        pool: pool.to_owned(),
        worker: worker.to_owned(),
        active,
    };
    match buildpool_facade::set_worker_active(&scheduler, &request).await {
        ApiV1Result::Ok { .. } => Ok(ok_summary(mode, "setWorkerActive")?),
        ApiV1Result::Err { error, .. } => Ok(format_api_error_output(mode, &error, api_exit_code(error.kind))),
    }
}

async fn set_gate_active(
    mode: OutputMode,
    config: Option<&std::path::Path>,
    overrides_json: Option<&str>,
    pool: &str,
    active: bool,
) -> Result<CliOutput, CliError> {
    let scheduler = match build_scheduler(config, overrides_json) {
        Ok(scheduler) => scheduler,
        Err(error) => return Ok(format_error_output(mode, &error, exit_code_for(&error))),
    };

    let request = ApiV1SetGateActiveRequestDto {
        pool: pool.to_owned(),
        active,
    };
    match buildpool_facade::set_gate_active(&scheduler, &request).await {
        ApiV1Result::Ok { .. } => Ok(ok_summary(mode, "setGateActive")?),
        ApiV1Result::Err { error, .. } => Ok(format_api_error_output(mode, &error, api_exit_code(error.kind))),
    }
}

async fn update_worker(
    mode: OutputMode,
    config: Option<&std::path::Path>,
    overrides_json: Option<&str>,
    pool: &str,
    worker: &str,
) -> Result<CliOutput, CliError> {
    let scheduler = match build_scheduler(config, overrides_json) {
        Ok(scheduler) => scheduler,
        Err(error) => return Ok(format_error_output(mode, &error, exit_code_for(&error))),
    };

    let request = ApiV1UpdateWorkerRequestDto {
        pool: pool.to_owned(),
        worker: worker.to_owned(),
    };
    let ctx = RequestContext::new_request();
    match buildpool_facade::update_worker(&scheduler, &ctx, &request).await {
        ApiV1Result::Ok { .. } => Ok(ok_summary(mode, "updateWorker")?),
        ApiV1Result::Err { error, .. } => Ok(format_api_error_output(mode, &error, api_exit_code(error.kind))),
    }
}

fn ok_summary(mode: OutputMode, kind: &str) -> Result<CliOutput, CliError> {
    let stdout = if mode.is_ndjson() {
        let mut out = serde_json::to_string(&serde_json::json!({
            "type": "summary",
            "status": "ok",
            "kind": kind,
        }))?;
        out.push('\n');
        out
    } else if mode.is_json() {
        let mut out = serde_json::to_string_pretty(&serde_json::json!({
            "status": "ok",
            "kind": kind,
        }))?;
        out.push('\n');
        out
    } else {
        format!("status: ok\nkind: {kind}\n")
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

/// Map a raw `ErrorEnvelope` (e.g. from config loading) to a CLI exit code,
/// by funneling it through the same API v1 error-kind classification the
/// facade uses for its own responses.
pub(crate) fn exit_code_for(error: &ErrorEnvelope) -> ExitCode {
    api_exit_code(buildpool_facade::error_to_api_v1(error).kind)
}

pub(crate) const fn api_exit_code(kind: ApiV1ErrorKind) -> ExitCode {
    match kind {
        ApiV1ErrorKind::Expected => ExitCode::InvalidInput,
        ApiV1ErrorKind::Invariant => ExitCode::Internal,
    }
}

pub(crate) fn format_error_output(mode: OutputMode, error: &ErrorEnvelope, exit_code: ExitCode) -> CliOutput {
    format_api_error_output(mode, &buildpool_facade::error_to_api_v1(error), exit_code)
}

pub(crate) fn format_api_error_output(mode: OutputMode, error: &ApiV1ErrorDto, exit_code: ExitCode) -> CliOutput {
    let stdout = if mode.is_ndjson() {
        let mut out = serde_json::to_string(&serde_json::json!({
            "type": "error",
            "status": "error",
            "error": error,
        }))
        .unwrap_or_else(|_| "{\"type\":\"error\",\"status\":\"error\"}".to_owned());
        out.push('\n');
        out
    } else if mode.is_json() {
        let mut out = serde_json::to_string_pretty(&serde_json::json!({
            "status": "error",
            "error": error,
        }))
        .unwrap_or_else(|_| "{\"status\":\"error\"}".to_owned());
        out.push('\n');
        out
    } else {
        format_api_error_text(error)
    };

    CliOutput {
        stdout,
        stderr: String::new(),
        exit_code,
    }
}

fn format_api_error_text(error: &ApiV1ErrorDto) -> String {
    let mut out = String::new();
    out.push_str("status: error\n");
    out.push_str("code: ");
    out.push_str(&error.code);
    out.push('\n');
    out.push_str("message: ");
    out.push_str(&error.message);
    out.push('\n');
    out.push_str("kind: ");
    out.push_str(match error.kind {
        ApiV1ErrorKind::Expected => "EXPECTED",
        ApiV1ErrorKind::Invariant => "INVARIANT",
    });
    out.push('\n');

    if let Some(meta) = error.meta.as_ref()
        && !meta.is_empty()
    {
        out.push_str("meta:\n");
        for (key, value) in meta {
            out.push_str("  ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }

    out
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}
