//! Control API handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alerts::Alert;
use crate::breaker::state::BreakerRecord;
use crate::clock::now_ms;
use crate::config::validation::validate_monitor_config;
use crate::config::{effective_config, MonitorConfig};
use crate::probe::HealthCheckResult;
use crate::stats::RollingMetrics;
use crate::store::StateStore;

use super::error::ApiError;
use super::ApiState;

const MAX_HISTORY_PAGE: usize = 500;

#[derive(Serialize)]
pub struct StatusResponse {
    pub resource: String,
    pub circuit: BreakerRecord,
    pub metrics: Option<RollingMetrics>,
}

/// GET /health — current breaker record plus the latest metrics summary.
pub async fn get_status(
    State(state): State<ApiState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let circuit = state.breaker.status().await?;
    let metrics = state
        .latest_metrics
        .load_full()
        .map(|snapshot| (*snapshot).clone());
    Ok(Json(StatusResponse {
        resource: state.breaker.resource().to_string(),
        circuit,
        metrics,
    }))
}

/// POST /health/check — run a full probe cycle synchronously.
pub async fn run_check(
    State(state): State<ApiState>,
) -> Result<Json<Vec<HealthCheckResult>>, ApiError> {
    let config = effective_config(&state.store, state.breaker.resource()).await?;
    let results = state.scheduler.tick(&config).await?;
    Ok(Json(results))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// GET /health/history — paginated probe results, most recent first.
pub async fn get_history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HealthCheckResult>>, ApiError> {
    let limit = query.limit.min(MAX_HISTORY_PAGE);
    let results = state.store.recent_results(limit, query.offset).await?;
    Ok(Json(results))
}

#[derive(Deserialize)]
pub struct MetricsQuery {
    #[serde(default = "default_window_hours")]
    pub window_hours: u64,
}

fn default_window_hours() -> u64 {
    1
}

/// GET /health/metrics — rolling metrics for the requested window.
pub async fn get_metrics(
    State(state): State<ApiState>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<RollingMetrics>, ApiError> {
    let window_ms = query.window_hours.max(1).saturating_mul(3_600_000);
    let metrics = state.aggregator.compute_window(window_ms, now_ms()).await?;
    Ok(Json(metrics))
}

/// GET /health/circuit-breaker — current breaker state and counters.
pub async fn get_breaker(State(state): State<ApiState>) -> Result<Json<BreakerRecord>, ApiError> {
    Ok(Json(state.breaker.status().await?))
}

/// POST /health/circuit-breaker/reset — administrative force-close.
pub async fn reset_breaker(
    State(state): State<ApiState>,
) -> Result<Json<BreakerRecord>, ApiError> {
    Ok(Json(state.breaker.force_reset().await?))
}

#[derive(Deserialize)]
pub struct AlertsQuery {
    #[serde(default)]
    pub include_resolved: bool,
    #[serde(default = "default_alerts_limit")]
    pub limit: usize,
}

fn default_alerts_limit() -> usize {
    100
}

/// GET /health/alerts — alerts for the resource, most recently seen first.
pub async fn get_alerts(
    State(state): State<ApiState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let alerts = state
        .store
        .list_alerts(
            state.breaker.resource(),
            query.include_resolved,
            query.limit,
        )
        .await?;
    Ok(Json(alerts))
}

#[derive(Deserialize, Default)]
pub struct ResolveBody {
    pub note: Option<String>,
}

/// POST /health/alerts/{id}/resolve — manual resolution with optional note.
pub async fn resolve_alert(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ResolveBody>>,
) -> Result<Json<Alert>, ApiError> {
    let note = body.and_then(|Json(b)| b.note);
    Ok(Json(state.alerts.resolve(id, note).await?))
}

/// GET /health/config — monitoring config currently in effect.
pub async fn get_config(State(state): State<ApiState>) -> Result<Json<MonitorConfig>, ApiError> {
    Ok(Json(
        effective_config(&state.store, state.breaker.resource()).await?,
    ))
}

/// PUT /health/config — validate and replace the monitoring config.
///
/// The scheduler re-reads the config at the start of every tick, so the
/// update applies on the next cycle without losing in-flight state. A
/// rejected update retains the previous config.
pub async fn put_config(
    State(state): State<ApiState>,
    Json(config): Json<MonitorConfig>,
) -> Result<Json<MonitorConfig>, ApiError> {
    validate_monitor_config(&config).map_err(|errors| ApiError::bad_configuration(&errors))?;
    state
        .store
        .save_monitor_config(state.breaker.resource(), config.clone())
        .await?;
    tracing::info!(resource = %state.breaker.resource(), "Monitoring config updated");
    Ok(Json(config))
}

#[derive(Serialize)]
pub struct MonitoringToggle {
    pub enabled: bool,
}

/// POST /health/monitoring/start — enable the scheduled loop.
pub async fn start_monitoring(
    State(state): State<ApiState>,
) -> Result<Json<MonitoringToggle>, ApiError> {
    set_enabled(&state, true).await
}

/// POST /health/monitoring/stop — disable the scheduled loop.
pub async fn stop_monitoring(
    State(state): State<ApiState>,
) -> Result<Json<MonitoringToggle>, ApiError> {
    set_enabled(&state, false).await
}

async fn set_enabled(state: &ApiState, enabled: bool) -> Result<Json<MonitoringToggle>, ApiError> {
    let mut config = effective_config(&state.store, state.breaker.resource()).await?;
    config.enabled = enabled;
    state
        .store
        .save_monitor_config(state.breaker.resource(), config)
        .await?;
    tracing::info!(resource = %state.breaker.resource(), enabled, "Scheduled monitoring toggled");
    Ok(Json(MonitoringToggle { enabled }))
}
