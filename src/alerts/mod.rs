//! Alerting subsystem.
//!
//! # Data Flow
//! ```text
//! RollingMetrics + BreakerRecord
//!     → rules.rs (pure rule evaluation, any rule may fire)
//!     → AlertManager (open / refresh / resolve alert rows in the store)
//!     → external notifier polls GET /health/alerts
//! ```
//!
//! # Design Decisions
//! - At most one open alert per (type, resource): a still-true condition
//!   refreshes the existing row instead of duplicating it
//! - Recovery resolves every open alert for the resource and emits one
//!   informational `service_recovered` record, already resolved
//! - Notification delivery is out of scope; this subsystem only mutates
//!   alert state

pub mod rules;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::breaker::state::{BreakerRecord, CircuitState};
use crate::clock::now_ms;
use crate::config::effective_config;
use crate::error::StoreError;
use crate::stats::RollingMetrics;
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    CircuitOpen,
    HighErrorRate,
    SlowResponse,
    ServiceDegraded,
    ServiceRecovered,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::CircuitOpen => "circuit_open",
            AlertType::HighErrorRate => "high_error_rate",
            AlertType::SlowResponse => "slow_response",
            AlertType::ServiceDegraded => "service_degraded",
            AlertType::ServiceRecovered => "service_recovered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Open,
    Resolved,
}

/// An actionable, de-duplicated alert record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub resource: String,
    pub severity: Severity,
    pub status: AlertStatus,
    pub message: String,
    pub opened_at_ms: u64,
    /// Refreshed each time the triggering condition re-fires.
    pub last_seen_ms: u64,
    pub resolved_at_ms: Option<u64>,
    pub note: Option<String>,
}

impl Alert {
    fn open(resource: &str, trigger: &rules::Trigger, now: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type: trigger.alert_type,
            resource: resource.to_string(),
            severity: trigger.severity,
            status: AlertStatus::Open,
            message: trigger.message.clone(),
            opened_at_ms: now,
            last_seen_ms: now,
            resolved_at_ms: None,
            note: None,
        }
    }
}

/// Evaluates alert rules and reconciles alert rows in the store.
pub struct AlertManager {
    store: Arc<dyn StateStore>,
    resource: String,
}

impl AlertManager {
    pub fn new(store: Arc<dyn StateStore>, resource: impl Into<String>) -> Self {
        Self {
            store,
            resource: resource.into(),
        }
    }

    /// Evaluate all rules against the current metrics and breaker state.
    ///
    /// Returns every alert row created or updated by this pass. A transient
    /// store failure here is surfaced so the scheduler can retry on the next
    /// tick; it never reaches operators as an error.
    pub async fn evaluate(
        &self,
        metrics: &RollingMetrics,
        breaker: &BreakerRecord,
    ) -> Result<Vec<Alert>, StoreError> {
        let config = effective_config(&self.store, &self.resource).await?;
        let triggers = rules::evaluate_rules(metrics, breaker, &config);
        let now = now_ms();
        let mut changed = Vec::new();

        for trigger in &triggers {
            match self
                .store
                .find_open_alert(&self.resource, trigger.alert_type)
                .await?
            {
                Some(mut existing) => {
                    // Still-true condition: refresh, never duplicate.
                    existing.last_seen_ms = now;
                    existing.severity = trigger.severity;
                    existing.message = trigger.message.clone();
                    self.store.put_alert(existing.clone()).await?;
                    changed.push(existing);
                }
                None => {
                    let alert = Alert::open(&self.resource, trigger, now);
                    tracing::warn!(
                        resource = %self.resource,
                        alert_type = alert.alert_type.as_str(),
                        severity = ?alert.severity,
                        message = %alert.message,
                        "Alert opened"
                    );
                    self.store.put_alert(alert.clone()).await?;
                    changed.push(alert);
                }
            }
        }

        // Healthy metrics with a closed circuit resolve everything open.
        if triggers.is_empty() && breaker.state == CircuitState::Closed {
            let open = self.store.open_alerts(&self.resource).await?;
            if !open.is_empty() {
                for mut alert in open {
                    alert.status = AlertStatus::Resolved;
                    alert.resolved_at_ms = Some(now);
                    alert.note = Some("auto-resolved: service recovered".to_string());
                    self.store.put_alert(alert.clone()).await?;
                    changed.push(alert);
                }
                let recovered = Alert {
                    id: Uuid::new_v4(),
                    alert_type: AlertType::ServiceRecovered,
                    resource: self.resource.clone(),
                    severity: Severity::Low,
                    status: AlertStatus::Resolved,
                    message: "service recovered: circuit closed and metrics healthy".to_string(),
                    opened_at_ms: now,
                    last_seen_ms: now,
                    resolved_at_ms: Some(now),
                    note: None,
                };
                tracing::info!(resource = %self.resource, "Service recovered, open alerts resolved");
                self.store.put_alert(recovered.clone()).await?;
                changed.push(recovered);
            }
        }

        Ok(changed)
    }

    /// Manually resolve one alert with an optional operator note.
    pub async fn resolve(&self, id: Uuid, note: Option<String>) -> Result<Alert, StoreError> {
        let mut alert = self
            .store
            .get_alert(id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                what: format!("alert {id}"),
            })?;

        if alert.status == AlertStatus::Open {
            alert.status = AlertStatus::Resolved;
            alert.resolved_at_ms = Some(now_ms());
            alert.note = note;
            self.store.put_alert(alert.clone()).await?;
            tracing::info!(alert_id = %id, "Alert manually resolved");
        }
        Ok(alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::store::memory::MemoryStore;

    fn unhealthy_metrics() -> RollingMetrics {
        RollingMetrics {
            window_start_ms: 0,
            window_end_ms: 60_000,
            total_calls: 10,
            failed_calls: 4,
            error_rate: 0.4,
            p50_latency_ms: Some(50),
            p95_latency_ms: Some(120),
            p99_latency_ms: Some(150),
            failed_operations: vec![crate::probe::ProbeOperation::Write],
        }
    }

    fn healthy_metrics() -> RollingMetrics {
        RollingMetrics {
            window_start_ms: 0,
            window_end_ms: 60_000,
            total_calls: 10,
            failed_calls: 0,
            error_rate: 0.0,
            p50_latency_ms: Some(40),
            p95_latency_ms: Some(90),
            p99_latency_ms: Some(100),
            failed_operations: Vec::new(),
        }
    }

    async fn manager() -> (AlertManager, Arc<dyn StateStore>) {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        store
            .save_monitor_config("r2", MonitorConfig::default())
            .await
            .unwrap();
        (AlertManager::new(store.clone(), "r2"), store)
    }

    #[tokio::test]
    async fn re_evaluation_does_not_duplicate() {
        let (manager, store) = manager().await;
        let mut breaker = BreakerRecord::new("r2");
        breaker.state = CircuitState::Open;

        manager
            .evaluate(&unhealthy_metrics(), &breaker)
            .await
            .unwrap();
        manager
            .evaluate(&unhealthy_metrics(), &breaker)
            .await
            .unwrap();

        let open = store.open_alerts("r2").await.unwrap();
        let circuit_open: Vec<_> = open
            .iter()
            .filter(|a| a.alert_type == AlertType::CircuitOpen)
            .collect();
        assert_eq!(circuit_open.len(), 1);
    }

    #[tokio::test]
    async fn recovery_resolves_all_and_fires_once() {
        let (manager, store) = manager().await;
        let mut breaker = BreakerRecord::new("r2");
        breaker.state = CircuitState::Open;
        manager
            .evaluate(&unhealthy_metrics(), &breaker)
            .await
            .unwrap();
        assert!(!store.open_alerts("r2").await.unwrap().is_empty());

        breaker.state = CircuitState::Closed;
        manager
            .evaluate(&healthy_metrics(), &breaker)
            .await
            .unwrap();
        // A second healthy pass must not fire service_recovered again.
        manager
            .evaluate(&healthy_metrics(), &breaker)
            .await
            .unwrap();

        assert!(store.open_alerts("r2").await.unwrap().is_empty());
        let all = store.list_alerts("r2", true, 100).await.unwrap();
        let recovered = all
            .iter()
            .filter(|a| a.alert_type == AlertType::ServiceRecovered)
            .count();
        assert_eq!(recovered, 1);
    }

    #[tokio::test]
    async fn manual_resolve_records_note() {
        let (manager, store) = manager().await;
        let mut breaker = BreakerRecord::new("r2");
        breaker.state = CircuitState::Open;
        let changed = manager
            .evaluate(&unhealthy_metrics(), &breaker)
            .await
            .unwrap();
        let id = changed[0].id;

        let resolved = manager
            .resolve(id, Some("backend maintenance".to_string()))
            .await
            .unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert_eq!(resolved.note.as_deref(), Some("backend maintenance"));
        assert!(store
            .open_alerts("r2")
            .await
            .unwrap()
            .iter()
            .all(|a| a.id != id));
    }
}
