//! Control API.
//!
//! Read-only and administrative surface for operators and for calling code
//! that wants to short-circuit its own retries.
//!
//! | Method   | Path                            | Purpose                        |
//! |----------|---------------------------------|--------------------------------|
//! | GET      | /health                         | Status + summary metrics       |
//! | POST     | /health/check                   | Force an immediate probe cycle |
//! | GET      | /health/history                 | Paginated raw probe results    |
//! | GET      | /health/metrics                 | Rolling metrics for a window   |
//! | GET      | /health/circuit-breaker         | Breaker state and counters     |
//! | POST     | /health/circuit-breaker/reset   | Force-close the breaker        |
//! | GET      | /health/alerts                  | List alerts                    |
//! | POST     | /health/alerts/{id}/resolve     | Resolve with optional note     |
//! | GET/PUT  | /health/config                  | Read/update MonitorConfig      |
//! | POST     | /health/monitoring/start\|stop  | Toggle the scheduler           |
//!
//! All error responses carry a stable `error_kind` field so dashboards can
//! branch on semantics rather than string matching.

pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::alerts::AlertManager;
use crate::breaker::CircuitBreaker;
use crate::scheduler::MonitorScheduler;
use crate::stats::{MetricsAggregator, RollingMetrics};
use crate::store::StateStore;

use self::handlers::*;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn StateStore>,
    pub breaker: Arc<CircuitBreaker>,
    pub aggregator: Arc<MetricsAggregator>,
    pub alerts: Arc<AlertManager>,
    pub scheduler: Arc<MonitorScheduler>,
    pub latest_metrics: Arc<ArcSwapOption<RollingMetrics>>,
}

/// Build the Control API router.
pub fn router(state: ApiState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(get_status))
        .route("/health/check", post(run_check))
        .route("/health/history", get(get_history))
        .route("/health/metrics", get(get_metrics))
        .route("/health/circuit-breaker", get(get_breaker))
        .route("/health/circuit-breaker/reset", post(reset_breaker))
        .route("/health/alerts", get(get_alerts))
        .route("/health/alerts/{id}/resolve", post(resolve_alert))
        .route("/health/config", get(get_config).put(put_config))
        .route("/health/monitoring/start", post(start_monitoring))
        .route("/health/monitoring/stop", post(stop_monitoring))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}
