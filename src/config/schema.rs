//! Configuration schema definitions.
//!
//! All types derive Serde traits so the bootstrap file (TOML) and the
//! Control API (JSON) share one schema.

use serde::{Deserialize, Serialize};

use crate::probe::ProbeOperation;

/// Root configuration for the sentinel service binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name of the monitored resource, used as the key for breaker state,
    /// alerts, and config records.
    pub resource: ResourceConfig,

    /// Control API listener.
    pub listener: ListenerConfig,

    /// Initial monitoring parameters, seeded into the shared store on
    /// startup if no record exists yet.
    pub monitoring: MonitorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Identity of the monitored backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Resource key (e.g. "object-storage").
    pub name: String,

    /// Key prefix used for throwaway probe objects.
    pub probe_prefix: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            name: "object-storage".to_string(),
            probe_prefix: "health-probe/".to_string(),
        }
    }
}

/// Control API listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g. "127.0.0.1:8088").
    pub bind_address: String,

    /// Per-request timeout for the Control API in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8088".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Tunable monitoring parameters for one resource.
///
/// Stored in the shared store and re-read by the scheduler every tick, so
/// updates through the Control API take effect without a restart.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Enable the scheduled probe loop.
    pub enabled: bool,

    /// Interval between probe cycles in milliseconds.
    pub check_interval_ms: u64,

    /// Per-call timeout in milliseconds; an exceeded call counts as a
    /// failure classified `timeout`.
    pub timeout_ms: u64,

    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,

    /// How long the breaker stays open before allowing a half-open trial.
    pub recovery_timeout_ms: u64,

    /// p95 latency above this opens a `slow_response` alert.
    pub slow_call_threshold_ms: u64,

    /// Error rate above this opens a `high_error_rate` alert (medium).
    pub error_rate_threshold: f64,

    /// Error rate above this escalates `high_error_rate` to critical.
    pub error_rate_critical_threshold: f64,

    /// Window over which rolling metrics feed alert evaluation.
    pub metrics_window_ms: u64,

    /// Probe results older than this are purged each tick.
    pub history_retention_ms: u64,

    /// Which synthetic operations each probe cycle issues.
    pub probed_operations: Vec<ProbeOperation>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_ms: 30_000,
            timeout_ms: 5_000,
            failure_threshold: 5,
            recovery_timeout_ms: 60_000,
            slow_call_threshold_ms: 2_000,
            error_rate_threshold: 0.20,
            error_rate_critical_threshold: 0.50,
            metrics_window_ms: 300_000,
            history_retention_ms: 7 * 24 * 3_600_000,
            probed_operations: ProbeOperation::all().to_vec(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus exposition endpoint.
    pub metrics_enabled: bool,

    /// Prometheus exposition bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
