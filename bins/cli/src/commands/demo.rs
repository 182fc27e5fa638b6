//! Demo command handler: exercises a scheduler end-to-end in-process.
//!
//! There is no daemon or RPC layer (see the pool crate's design notes), so a
//! CLI process cannot split register/submit/pop across separate invocations
//! with shared in-memory state. This command instead drives one scheduler
//! through a full register -> activate -> submit -> pop -> release cycle,
//! plus a gate pause/resume round trip, and reports what happened.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{api_exit_code, exit_code_for, format_api_error_output, format_error_output};
use buildpool_api::v1::{
    ApiV1RegisterWorkerRequestDto, ApiV1Result, ApiV1SetGateActiveRequestDto,
    ApiV1SubmitJobRequestDto,
};
use buildpool_config::load_scheduler_config_std_env;
use buildpool_facade::Scheduler;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Options for the demo command.
pub struct DemoOptions<'a> {
    /// Pool name to exercise.
    pub pool: &'a str,
    /// Number of workers to register and activate.
    pub workers: usize,
    /// Number of jobs to submit.
    pub jobs: usize,
    /// How long an idle worker waits for more work before it's considered drained.
    pub pop_idle_timeout_ms: u64,
    /// Optional config file path.
    pub config_path: Option<&'a Path>,
    /// Optional partial-config overrides, as JSON.
    pub overrides_json: Option<&'a str>,
}

#[derive(Debug, Clone, serde::Serialize)]
struct AcceptedJobReport {
    worker: String,
    target: String,
    urgent: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
struct GateReport {
    active_before_pause: bool,
    active_while_paused: bool,
    active_after_resume: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
struct DemoReport {
    pool: String,
    workers: Vec<String>,
    accepted: Vec<AcceptedJobReport>,
    submit_errors: usize,
    backlog_high: usize,
    backlog_low: usize,
    ready_workers: usize,
    gate: GateReport,
}

/// Run the demo: register workers, submit jobs, drain them through the
/// workers' own `pop` loop, then report an end-of-run snapshot.
pub async fn run_demo(mode: OutputMode, options: DemoOptions<'_>) -> Result<CliOutput, CliError> {
    let validated =
        match load_scheduler_config_std_env(options.config_path, options.overrides_json) {
            Ok(validated) => validated,
            Err(error) => return Ok(format_error_output(mode, &error, exit_code_for(&error))),
        };

    let scheduler = Arc::new(Scheduler::build(validated));
    let worker_count = options.workers.max(1);

    let mut handles = Vec::with_capacity(worker_count);
    for index in 0..worker_count {
        let register = ApiV1RegisterWorkerRequestDto {
            pool: options.pool.to_string(),
            worker: format!("w{index}"),
        };
        let handle = match buildpool_facade::register_worker(&scheduler, &register).await {
            Ok(handle) => handle,
            Err(error) => return Ok(format_api_error_output(mode, &error, api_exit_code(error.kind))),
        };
        handle
            .set_active(true)
            .await
            .map_err(|error| CliError::InvalidInput(format!("failed to activate worker: {error}")))?;
        handles.push(handle);
    }

    let pop_timeout = Duration::from_millis(options.pop_idle_timeout_ms);
    let mut poppers = Vec::with_capacity(handles.len());
    for handle in handles {
        poppers.push(tokio::spawn(async move {
            loop {
                match tokio::time::timeout(pop_timeout, handle.pop()).await {
                    Ok(Ok(_item)) => continue,
                    Ok(Err(_finished)) | Err(_elapsed) => break,
                }
            }
            handle
        }));
    }

    let mut submit_tasks = Vec::with_capacity(options.jobs);
    for index in 0..options.jobs {
        let scheduler = Arc::clone(&scheduler);
        let pool = options.pool.to_string();
        let urgent = index % 3 == 0;
        let target = format!("//demo/target:{index}");
        let cache_hint = if index % 2 == 0 {
            Some(format!("shard-{}", index % worker_count))
        } else {
            None
        };
        submit_tasks.push(tokio::spawn(async move {
            let request = ApiV1SubmitJobRequestDto {
                pool,
                urgent,
                target,
                cache_hint,
                cost_cached: 1,
                cost_non_cached: 4,
            };
            buildpool_facade::submit_job(&scheduler, &request).await
        }));
    }

    let mut accepted = Vec::with_capacity(submit_tasks.len());
    let mut submit_errors = 0usize;
    for (index, task) in submit_tasks.into_iter().enumerate() {
        let result = task
            .await
            .map_err(|error| CliError::InvalidInput(format!("submit task panicked: {error}")))?;
        match result {
            ApiV1Result::Ok { data, .. } => accepted.push(AcceptedJobReport {
                worker: data.worker,
                target: data.target,
                urgent: index % 3 == 0,
            }),
            ApiV1Result::Err { .. } => submit_errors += 1,
        }
    }

    let mut worker_names = Vec::with_capacity(poppers.len());
    for popper in poppers {
        let handle = popper
            .await
            .map_err(|error| CliError::InvalidInput(format!("popper task panicked: {error}")))?;
        worker_names.push(handle.name().as_str().to_owned());
        handle
            .release()
            .await
            .map_err(|error| CliError::InvalidInput(format!("failed to release worker: {error}")))?;
    }
    worker_names.sort_unstable();

    let gate_report = match gate_round_trip(&scheduler, options.pool).await {
        Ok(report) => report,
        Err(error) => return Ok(format_api_error_output(mode, &error, api_exit_code(error.kind))),
    };

    let snapshot = match buildpool_facade::pool_snapshot(&scheduler, options.pool).await {
        ApiV1Result::Ok { data, .. } => data,
        ApiV1Result::Err { error, .. } => {
            return Ok(format_api_error_output(mode, &error, api_exit_code(error.kind)));
        },
    };

    let report = DemoReport {
        pool: options.pool.to_string(),
        workers: worker_names,
        accepted,
        submit_errors,
        backlog_high: snapshot.backlog_high,
        backlog_low: snapshot.backlog_low,
        ready_workers: snapshot.ready_workers,
        gate: gate_report,
    };

    let stdout = if mode.is_ndjson() {
        format_demo_ndjson(&report)?
    } else if mode.is_json() {
        format_demo_json(&report)?
    } else {
        format_demo_text(&report)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

async fn gate_round_trip(
    scheduler: &Scheduler,
    pool: &str,
) -> Result<GateReport, buildpool_api::v1::ApiV1ErrorDto> {
    let active_before_pause = read_gate(scheduler, pool).await?;
    set_gate(scheduler, pool, false).await?;
    let active_while_paused = read_gate(scheduler, pool).await?;
    set_gate(scheduler, pool, true).await?;
    let active_after_resume = read_gate(scheduler, pool).await?;

    Ok(GateReport {
        active_before_pause,
        active_while_paused,
        active_after_resume,
    })
}

async fn read_gate(scheduler: &Scheduler, pool: &str) -> Result<bool, buildpool_api::v1::ApiV1ErrorDto> {
    match buildpool_facade::gate_is_active(scheduler, pool).await {
        ApiV1Result::Ok { data, .. } => Ok(data),
        ApiV1Result::Err { error, .. } => Err(error),
    }
}

async fn set_gate(
    scheduler: &Scheduler,
    pool: &str,
    active: bool,
) -> Result<(), buildpool_api::v1::ApiV1ErrorDto> {
    let request = ApiV1SetGateActiveRequestDto {
        pool: pool.to_string(),
        active,
    };
    match buildpool_facade::set_gate_active(scheduler, &request).await {
        ApiV1Result::Ok { .. } => Ok(()),
        ApiV1Result::Err { error, .. } => Err(error),
    }
}

fn format_demo_json(report: &DemoReport) -> Result<String, CliError> {
    let payload = serde_json::json!({
        "status": "ok",
        "demo": report,
    });
    let mut output = serde_json::to_string_pretty(&payload)?;
    output.push('\n');
    Ok(output)
}

fn format_demo_ndjson(report: &DemoReport) -> Result<String, CliError> {
    let mut output = String::new();
    for job in &report.accepted {
        let line = serde_json::json!({
            "type": "accepted",
            "pool": report.pool,
            "worker": job.worker,
            "target": job.target,
            "urgent": job.urgent,
        });
        output.push_str(&serde_json::to_string(&line)?);
        output.push('\n');
    }
    let summary = serde_json::json!({
        "type": "summary",
        "status": "ok",
        "kind": "demo",
        "demo": report,
    });
    output.push_str(&serde_json::to_string(&summary)?);
    output.push('\n');
    Ok(output)
}

fn format_demo_text(report: &DemoReport) -> String {
    let mut out = String::new();
    out.push_str("status: ok\n");
    out.push_str("pool: ");
    out.push_str(&report.pool);
    out.push('\n');
    out.push_str("workers: ");
    out.push_str(&report.workers.join(","));
    out.push('\n');
    out.push_str("jobsAccepted: ");
    out.push_str(&report.accepted.len().to_string());
    out.push('\n');
    out.push_str("submitErrors: ");
    out.push_str(&report.submit_errors.to_string());
    out.push('\n');
    for job in &report.accepted {
        out.push_str("  accepted: worker=");
        out.push_str(&job.worker);
        out.push_str(" urgent=");
        out.push_str(if job.urgent { "true" } else { "false" });
        out.push_str(" target=");
        out.push_str(&job.target);
        out.push('\n');
    }
    out.push_str("backlogHigh: ");
    out.push_str(&report.backlog_high.to_string());
    out.push('\n');
    out.push_str("backlogLow: ");
    out.push_str(&report.backlog_low.to_string());
    out.push('\n');
    out.push_str("readyWorkers: ");
    out.push_str(&report.ready_workers.to_string());
    out.push('\n');
    out.push_str("gateActiveBeforePause: ");
    out.push_str(&report.gate.active_before_pause.to_string());
    out.push('\n');
    out.push_str("gateActiveWhilePaused: ");
    out.push_str(&report.gate.active_while_paused.to_string());
    out.push('\n');
    out.push_str("gateActiveAfterResume: ");
    out.push_str(&report.gate.active_after_resume.to_string());
    out.push('\n');
    out
}
