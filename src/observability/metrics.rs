//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sentinel_calls_total` (counter): backend calls by resource, outcome
//! - `sentinel_rejections_total` (counter): fail-fast rejections by resource
//! - `sentinel_call_latency_ms` (histogram): latency of executed calls
//! - `sentinel_probes_total` (counter): probe results by operation, outcome
//! - `sentinel_probe_latency_ms` (histogram): probe latency by operation
//! - `sentinel_breaker_state` (gauge): 0=closed, 1=open, 2=half_open

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::breaker::state::CircuitState;

/// Install the Prometheus recorder and exposition endpoint.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        return;
    }
    tracing::info!(address = %addr, "Metrics exposition endpoint started");
}

/// Record one executed backend call (probes included).
pub fn record_call(resource: &str, success: bool, latency_ms: u64) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        "sentinel_calls_total",
        "resource" => resource.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
    metrics::histogram!(
        "sentinel_call_latency_ms",
        "resource" => resource.to_string(),
    )
    .record(latency_ms as f64);
}

/// Record a fail-fast rejection (no backend call occurred).
pub fn record_rejection(resource: &str) {
    metrics::counter!(
        "sentinel_rejections_total",
        "resource" => resource.to_string(),
    )
    .increment(1);
}

/// Record one probe result.
pub fn record_probe(operation: &str, success: bool, latency_ms: u64) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        "sentinel_probes_total",
        "operation" => operation.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
    metrics::histogram!(
        "sentinel_probe_latency_ms",
        "operation" => operation.to_string(),
    )
    .record(latency_ms as f64);
}

/// Publish the breaker state as a gauge.
pub fn record_breaker_state(resource: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    metrics::gauge!(
        "sentinel_breaker_state",
        "resource" => resource.to_string(),
    )
    .set(value);
}
