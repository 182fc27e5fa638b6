//! # buildpool-facade
//!
//! Facade API for consumers (CLI and future services): maps API v1 DTOs to
//! and from `buildpool-app` use cases run against an `buildpool-infra`
//! [`Scheduler`].
//!
//! This crate depends on `infra`, `api`, and `app`.

use buildpool_api::v1::{
    ApiV1ErrorDto, ApiV1JobAcceptedDto, ApiV1PoolListDto, ApiV1RegisterWorkerRequestDto,
    ApiV1Result, ApiV1SetGateActiveRequestDto, ApiV1SetWorkerActiveRequestDto,
    ApiV1SubmitJobRequestDto, ApiV1UpdateWorkerRequestDto, error_envelope_to_api_v1_error,
    result_to_api_v1_result, validate_register_worker_request, validate_set_worker_active_request,
    validate_submit_job_request,
};
use buildpool_domain::{BuildJob, CacheHint, CostEstimate, Item, PoolName, PoolSnapshot, WorkerName};
use buildpool_pool::WorkerHandle;
use buildpool_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};

pub use buildpool_api::v1::{ApiV1ErrorDto, ApiV1ErrorKind};
pub use buildpool_infra::Scheduler;

/// Submit a job described by `request`, waiting for a worker to accept it.
///
/// Returns once some worker pops the item, not once it finishes running
/// (this mirrors `buildpool_pool::Ticket::await_job`'s own contract).
pub async fn submit_job(scheduler: &Scheduler, request: &ApiV1SubmitJobRequestDto) -> ApiV1Result<ApiV1JobAcceptedDto> {
    result_to_api_v1_result(submit_job_inner(scheduler, request).await, None)
}

async fn submit_job_inner(scheduler: &Scheduler, request: &ApiV1SubmitJobRequestDto) -> Result<ApiV1JobAcceptedDto> {
    validate_submit_job_request(request).map_err(|issue| ErrorEnvelope::expected(ErrorCode::invalid_input(), issue.to_string()))?;

    let pool_name = PoolName::parse(&request.pool)?;
    let hint = request.cache_hint.as_deref().map_or_else(CacheHint::none, CacheHint::new);
    let cost = CostEstimate::new(request.cost_cached, request.cost_non_cached);
    let job = BuildJob::new(request.target.clone(), hint, cost);

    let ticket = buildpool_app::submit_job(scheduler.registry(), &pool_name, request.urgent, job).await;
    let accepted = ticket.await_job().await?;

    Ok(ApiV1JobAcceptedDto {
        pool: request.pool.clone(),
        worker: accepted.worker.as_str().to_owned(),
        target: accepted.item.display_form(),
    })
}

/// Register a worker in `request.pool` under `request.worker`.
///
/// Returns the live [`WorkerHandle`] rather than an `ApiV1Result` payload:
/// the handle is the stateful object the caller uses for subsequent
/// `pop`/`set_active`/`release` calls within this same process, not
/// something that crosses a wire boundary.
pub async fn register_worker(
    scheduler: &Scheduler,
    request: &ApiV1RegisterWorkerRequestDto,
) -> std::result::Result<WorkerHandle<BuildJob>, ApiV1ErrorDto> {
    register_worker_inner(scheduler, request).await.map_err(|error| error_envelope_to_api_v1_error(&error, None))
}

async fn register_worker_inner(
    scheduler: &Scheduler,
    request: &ApiV1RegisterWorkerRequestDto,
) -> Result<WorkerHandle<BuildJob>> {
    validate_register_worker_request(request).map_err(|issue| buildpool_shared::ErrorEnvelope::expected(
        buildpool_shared::ErrorCode::invalid_input(),
        issue.to_string(),
    ))?;

    let pool_name = PoolName::parse(&request.pool)?;
    let worker_name = WorkerName::parse(&request.worker)?;
    let handle = buildpool_app::register_worker(scheduler.registry(), &pool_name, worker_name).await?;
    Ok(handle)
}

/// Force a worker active or inactive from an admin surface.
pub async fn set_worker_active(scheduler: &Scheduler, request: &ApiV1SetWorkerActiveRequestDto) -> ApiV1Result<()> {
    result_to_api_v1_result(set_worker_active_inner(scheduler, request).await, None)
}

async fn set_worker_active_inner(scheduler: &Scheduler, request: &ApiV1SetWorkerActiveRequestDto) -> Result<()> {
    validate_set_worker_active_request(request).map_err(|issue| buildpool_shared::ErrorEnvelope::expected(
        buildpool_shared::ErrorCode::invalid_input(),
        issue.to_string(),
    ))?;

    let pool_name = PoolName::parse(&request.pool)?;
    let worker_name = WorkerName::parse(&request.worker)?;
    buildpool_app::admin_set_worker_active(scheduler.registry(), &pool_name, &worker_name, request.active).await
}

/// Ask a worker to self-update: deactivate it and wait (bounded by the
/// scheduler's configured `admin_update_timeout_ms`) for it to re-register
/// under the same name.
pub async fn update_worker(
    scheduler: &Scheduler,
    ctx: &RequestContext,
    request: &ApiV1UpdateWorkerRequestDto,
) -> ApiV1Result<()> {
    result_to_api_v1_result(update_worker_inner(scheduler, ctx, request).await, None)
}

async fn update_worker_inner(scheduler: &Scheduler, ctx: &RequestContext, request: &ApiV1UpdateWorkerRequestDto) -> Result<()> {
    let pool_name = PoolName::parse(&request.pool)?;
    let worker_name = WorkerName::parse(&request.worker)?;
    let timeout_ms = scheduler.config().admin_update_timeout_ms();
    buildpool_app::admin_update_worker(scheduler.registry(), ctx, &pool_name, &worker_name, timeout_ms).await
}

/// Open or close a pool's active gate (shared process-wide, see
/// `buildpool_app::registry`).
pub async fn set_gate_active(scheduler: &Scheduler, request: &ApiV1SetGateActiveRequestDto) -> ApiV1Result<()> {
    result_to_api_v1_result(set_gate_active_inner(scheduler, request).await, None)
}

async fn set_gate_active_inner(scheduler: &Scheduler, request: &ApiV1SetGateActiveRequestDto) -> Result<()> {
    let pool_name = PoolName::parse(&request.pool)?;
    buildpool_app::admin_set_gate_active(scheduler.registry(), &pool_name, request.active).await;
    Ok(())
}

/// Read the current state of a pool's active gate.
pub async fn gate_is_active(scheduler: &Scheduler, pool: &str) -> ApiV1Result<bool> {
    result_to_api_v1_result(gate_is_active_inner(scheduler, pool).await, None)
}

async fn gate_is_active_inner(scheduler: &Scheduler, pool: &str) -> Result<bool> {
    let pool_name = PoolName::parse(pool)?;
    Ok(buildpool_app::admin_gate_is_active(scheduler.registry(), &pool_name).await)
}

/// List every pool name the scheduler has created so far, sorted.
pub async fn list_pools(scheduler: &Scheduler) -> ApiV1PoolListDto {
    let pools = buildpool_app::admin_list_pools(scheduler.registry())
        .await
        .into_iter()
        .map(|name| name.as_str().to_owned())
        .collect();
    ApiV1PoolListDto { pools }
}

/// Snapshot a pool's backlog and worker state for an admin `show` call.
pub async fn pool_snapshot(scheduler: &Scheduler, pool: &str) -> ApiV1Result<PoolSnapshot> {
    result_to_api_v1_result(pool_snapshot_inner(scheduler, pool).await, None)
}

async fn pool_snapshot_inner(scheduler: &Scheduler, pool: &str) -> Result<PoolSnapshot> {
    let pool_name = PoolName::parse(pool)?;
    Ok(buildpool_app::admin_pool_snapshot(scheduler.registry(), &pool_name).await)
}

/// Convert any `ErrorEnvelope` into an API v1 error payload (stable code + meta).
#[must_use]
pub fn error_to_api_v1(error: &ErrorEnvelope) -> ApiV1ErrorDto {
    error_envelope_to_api_v1_error(error, None)
}

/// Returns the facade crate version.
#[must_use]
pub const fn facade_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildpool_api::api_crate_version;
    use buildpool_app::app_crate_version;
    use buildpool_config::SchedulerConfig;
    use buildpool_infra::infra_crate_version;

    #[test]
    fn facade_crate_compiles() {
        let version = facade_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn facade_can_use_infra_api_app() {
        let infra_version = infra_crate_version();
        let api_version = api_crate_version();
        let app_version_value = app_crate_version();

        assert!(!infra_version.is_empty());
        assert!(!api_version.is_empty());
        assert!(!app_version_value.is_empty());
    }

    fn scheduler() -> Scheduler {
        let config = SchedulerConfig {
            cache_db_path: std::env::temp_dir().join("buildpool-facade-test-cache.sqlite3"),
            ..Default::default()
        }
        .validate_and_normalize()
        .expect("default config should validate");
        Scheduler::build(config)
    }

    #[tokio::test]
    async fn submitting_and_popping_round_trips_through_the_facade() {
        let scheduler = scheduler();

        let register = ApiV1RegisterWorkerRequestDto {
            pool: "ci".to_string(),
            worker: "w1".to_string(),
        };
        let handle = register_worker(&scheduler, &register).await.expect("register should succeed");
        handle.set_active(true).await.expect("activate should succeed");

        let submit = ApiV1SubmitJobRequestDto {
            pool: "ci".to_string(),
            urgent: false,
            target: "//svc/api:build".to_string(),
            cache_hint: None,
            cost_cached: 1,
            cost_non_cached: 4,
        };
        let submit_task = tokio::spawn({
            let scheduler_registry = scheduler.registry().clone();
            let submit = submit.clone();
            async move {
                let ticket = buildpool_app::submit_job(
                    &scheduler_registry,
                    &PoolName::parse(&submit.pool).expect("valid"),
                    submit.urgent,
                    BuildJob::new(submit.target.clone(), CacheHint::none(), CostEstimate::new(submit.cost_cached, submit.cost_non_cached)),
                )
                .await;
                ticket.await_job().await
            }
        });

        let popped = tokio::time::timeout(std::time::Duration::from_secs(1), handle.pop())
            .await
            .expect("pop should not hang")
            .expect("pop should succeed");
        assert_eq!(popped.target(), "//svc/api:build");

        let accepted = tokio::time::timeout(std::time::Duration::from_secs(1), submit_task)
            .await
            .expect("join should not hang")
            .expect("join")
            .expect("ticket should resolve");
        assert_eq!(accepted.worker.as_str(), "w1");
    }

    #[tokio::test]
    async fn pools_are_empty_until_something_uses_them() {
        let scheduler = scheduler();
        let pools = list_pools(&scheduler).await;
        assert!(pools.pools.is_empty());
    }

    #[tokio::test]
    async fn gate_starts_active_for_a_freshly_named_pool() {
        let scheduler = scheduler();
        let result = gate_is_active(&scheduler, "ci").await;
        assert!(matches!(result, ApiV1Result::Ok { ok: true, data: true }));
    }
}
