//! Alert rule evaluation.
//!
//! Pure functions from (metrics, breaker state, config) to fired triggers.
//! Each rule fires independently; the manager handles de-duplication.

use crate::breaker::state::{BreakerRecord, CircuitState};
use crate::config::MonitorConfig;
use crate::stats::RollingMetrics;

use super::{AlertType, Severity};

/// One fired rule, ready to become (or refresh) an alert row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
}

/// Evaluate every rule. Any subset may fire.
pub fn evaluate_rules(
    metrics: &RollingMetrics,
    breaker: &BreakerRecord,
    config: &MonitorConfig,
) -> Vec<Trigger> {
    let mut triggers = Vec::new();

    if breaker.state == CircuitState::Open {
        triggers.push(Trigger {
            alert_type: AlertType::CircuitOpen,
            severity: Severity::High,
            message: format!(
                "circuit open after {} consecutive failures",
                breaker.consecutive_failures
            ),
        });
    }

    if metrics.total_calls > 0 && metrics.error_rate > config.error_rate_threshold {
        let severity = if metrics.error_rate > config.error_rate_critical_threshold {
            Severity::Critical
        } else {
            Severity::Medium
        };
        triggers.push(Trigger {
            alert_type: AlertType::HighErrorRate,
            severity,
            message: format!(
                "error rate {:.1}% over {} calls",
                metrics.error_rate * 100.0,
                metrics.total_calls
            ),
        });
    }

    if let Some(p95) = metrics.p95_latency_ms {
        if p95 > config.slow_call_threshold_ms {
            triggers.push(Trigger {
                alert_type: AlertType::SlowResponse,
                severity: Severity::Medium,
                message: format!(
                    "p95 latency {p95}ms exceeds {}ms threshold",
                    config.slow_call_threshold_ms
                ),
            });
        }
    }

    if metrics.failed_operations.len() > 1 {
        let names: Vec<&str> = metrics
            .failed_operations
            .iter()
            .map(|op| op.as_str())
            .collect();
        triggers.push(Trigger {
            alert_type: AlertType::ServiceDegraded,
            severity: Severity::High,
            message: format!("multiple operation types failing: {}", names.join(", ")),
        });
    }

    triggers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeOperation;

    fn metrics(total: u64, failed: u64, p95: Option<u64>) -> RollingMetrics {
        RollingMetrics {
            window_start_ms: 0,
            window_end_ms: 60_000,
            total_calls: total,
            failed_calls: failed,
            error_rate: if total == 0 {
                0.0
            } else {
                failed as f64 / total as f64
            },
            p50_latency_ms: p95,
            p95_latency_ms: p95,
            p99_latency_ms: p95,
            failed_operations: Vec::new(),
        }
    }

    #[test]
    fn error_rate_severity_scales_with_magnitude() {
        let config = MonitorConfig::default();
        let breaker = BreakerRecord::new("r2");

        let medium = evaluate_rules(&metrics(10, 3, Some(100)), &breaker, &config);
        assert_eq!(medium.len(), 1);
        assert_eq!(medium[0].alert_type, AlertType::HighErrorRate);
        assert_eq!(medium[0].severity, Severity::Medium);

        let critical = evaluate_rules(&metrics(10, 6, Some(100)), &breaker, &config);
        assert_eq!(critical[0].severity, Severity::Critical);
    }

    #[test]
    fn no_rules_fire_on_healthy_window() {
        let config = MonitorConfig::default();
        let breaker = BreakerRecord::new("r2");
        assert!(evaluate_rules(&metrics(10, 0, Some(100)), &breaker, &config).is_empty());
        // Empty window never divides by zero or fires.
        assert!(evaluate_rules(&metrics(0, 0, None), &breaker, &config).is_empty());
    }

    #[test]
    fn slow_response_uses_p95() {
        let config = MonitorConfig::default();
        let breaker = BreakerRecord::new("r2");
        let fired = evaluate_rules(&metrics(10, 0, Some(2_500)), &breaker, &config);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].alert_type, AlertType::SlowResponse);
        assert_eq!(fired[0].severity, Severity::Medium);
    }

    #[test]
    fn degraded_needs_multiple_failing_operations() {
        let config = MonitorConfig::default();
        let breaker = BreakerRecord::new("r2");

        let mut single = metrics(10, 2, Some(100));
        single.error_rate = 0.0; // isolate the degraded rule
        single.failed_operations = vec![ProbeOperation::Write];
        assert!(evaluate_rules(&single, &breaker, &config).is_empty());

        let mut multi = single.clone();
        multi.failed_operations = vec![ProbeOperation::Read, ProbeOperation::Write];
        let fired = evaluate_rules(&multi, &breaker, &config);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].alert_type, AlertType::ServiceDegraded);
        assert_eq!(fired[0].severity, Severity::High);
    }

    #[test]
    fn circuit_open_fires_high() {
        let config = MonitorConfig::default();
        let mut breaker = BreakerRecord::new("r2");
        breaker.state = CircuitState::Open;
        breaker.consecutive_failures = 5;
        let fired = evaluate_rules(&metrics(0, 0, None), &breaker, &config);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].alert_type, AlertType::CircuitOpen);
        assert_eq!(fired[0].severity, Severity::High);
    }
}
