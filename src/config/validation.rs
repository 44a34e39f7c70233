//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, rates within [0, 1])
//! - Reject empty probe sets
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure functions: config in, Result out; runs before a config is
//!   accepted into the store

use crate::config::schema::{MonitorConfig, ServiceConfig};

/// A single semantic problem with a config value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn require(errors: &mut Vec<ValidationError>, ok: bool, field: &'static str, message: &str) {
    if !ok {
        errors.push(ValidationError {
            field,
            message: message.to_string(),
        });
    }
}

/// Validate runtime monitoring parameters.
pub fn validate_monitor_config(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    require(
        &mut errors,
        config.check_interval_ms > 0,
        "check_interval_ms",
        "must be greater than zero",
    );
    require(
        &mut errors,
        config.timeout_ms > 0,
        "timeout_ms",
        "must be greater than zero",
    );
    require(
        &mut errors,
        config.failure_threshold >= 1,
        "failure_threshold",
        "must be at least 1",
    );
    require(
        &mut errors,
        config.recovery_timeout_ms > 0,
        "recovery_timeout_ms",
        "must be greater than zero",
    );
    require(
        &mut errors,
        config.slow_call_threshold_ms > 0,
        "slow_call_threshold_ms",
        "must be greater than zero",
    );
    require(
        &mut errors,
        config.error_rate_threshold > 0.0 && config.error_rate_threshold <= 1.0,
        "error_rate_threshold",
        "must be within (0, 1]",
    );
    require(
        &mut errors,
        config.error_rate_critical_threshold >= config.error_rate_threshold
            && config.error_rate_critical_threshold <= 1.0,
        "error_rate_critical_threshold",
        "must be within [error_rate_threshold, 1]",
    );
    require(
        &mut errors,
        config.metrics_window_ms > 0,
        "metrics_window_ms",
        "must be greater than zero",
    );
    require(
        &mut errors,
        !config.probed_operations.is_empty(),
        "probed_operations",
        "must name at least one operation",
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the full bootstrap config.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    require(
        &mut errors,
        !config.resource.name.is_empty(),
        "resource.name",
        "must not be empty",
    );
    require(
        &mut errors,
        !config.resource.probe_prefix.is_empty(),
        "resource.probe_prefix",
        "must not be empty",
    );
    require(
        &mut errors,
        config.listener.bind_address.parse::<std::net::SocketAddr>().is_ok(),
        "listener.bind_address",
        "must be a valid socket address",
    );

    if let Err(mut monitor_errors) = validate_monitor_config(&config.monitoring) {
        errors.append(&mut monitor_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
