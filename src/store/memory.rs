//! In-memory reference store.
//!
//! Backs the reference binary and the test suite. Deployments with real
//! short-lived invocations plug a durable `StateStore` implementation in
//! its place; the semantics here (version-checked breaker writes, the
//! open-alert uniqueness constraint) are the contract that implementation
//! must keep.

use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::alerts::{Alert, AlertStatus, AlertType};
use crate::breaker::state::BreakerRecord;
use crate::config::MonitorConfig;
use crate::error::StoreError;
use crate::probe::HealthCheckResult;

use super::StateStore;

#[derive(Default)]
pub struct MemoryStore {
    breakers: DashMap<String, BreakerRecord>,
    configs: DashMap<String, MonitorConfig>,
    results: RwLock<Vec<HealthCheckResult>>,
    alerts: RwLock<Vec<Alert>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn results_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<HealthCheckResult>>, StoreError> {
        self.results
            .write()
            .map_err(|_| StoreError::Unavailable("results lock poisoned".to_string()))
    }

    fn alerts_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<Alert>>, StoreError> {
        self.alerts
            .write()
            .map_err(|_| StoreError::Unavailable("alerts lock poisoned".to_string()))
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load_breaker(&self, resource: &str) -> Result<Option<BreakerRecord>, StoreError> {
        Ok(self.breakers.get(resource).map(|r| r.clone()))
    }

    async fn save_breaker(&self, mut record: BreakerRecord) -> Result<BreakerRecord, StoreError> {
        match self.breakers.entry(record.resource.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().version != record.version {
                    return Err(StoreError::Conflict {
                        resource: record.resource,
                    });
                }
                record.version += 1;
                occupied.insert(record.clone());
                Ok(record)
            }
            Entry::Vacant(vacant) => {
                if record.version != 0 {
                    return Err(StoreError::Conflict {
                        resource: record.resource,
                    });
                }
                record.version = 1;
                vacant.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn append_result(&self, result: HealthCheckResult) -> Result<(), StoreError> {
        self.results_lock()?.push(result);
        Ok(())
    }

    async fn results_since(&self, since_ms: u64) -> Result<Vec<HealthCheckResult>, StoreError> {
        let results = self
            .results
            .read()
            .map_err(|_| StoreError::Unavailable("results lock poisoned".to_string()))?;
        Ok(results
            .iter()
            .filter(|r| r.timestamp_ms >= since_ms)
            .cloned()
            .collect())
    }

    async fn recent_results(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<HealthCheckResult>, StoreError> {
        let results = self
            .results
            .read()
            .map_err(|_| StoreError::Unavailable("results lock poisoned".to_string()))?;
        Ok(results
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn purge_results_before(&self, cutoff_ms: u64) -> Result<usize, StoreError> {
        let mut results = self.results_lock()?;
        let before = results.len();
        results.retain(|r| r.timestamp_ms >= cutoff_ms);
        Ok(before - results.len())
    }

    async fn find_open_alert(
        &self,
        resource: &str,
        alert_type: AlertType,
    ) -> Result<Option<Alert>, StoreError> {
        let alerts = self
            .alerts
            .read()
            .map_err(|_| StoreError::Unavailable("alerts lock poisoned".to_string()))?;
        Ok(alerts
            .iter()
            .find(|a| {
                a.resource == resource
                    && a.alert_type == alert_type
                    && a.status == AlertStatus::Open
            })
            .cloned())
    }

    async fn open_alerts(&self, resource: &str) -> Result<Vec<Alert>, StoreError> {
        let alerts = self
            .alerts
            .read()
            .map_err(|_| StoreError::Unavailable("alerts lock poisoned".to_string()))?;
        Ok(alerts
            .iter()
            .filter(|a| a.resource == resource && a.status == AlertStatus::Open)
            .cloned()
            .collect())
    }

    async fn list_alerts(
        &self,
        resource: &str,
        include_resolved: bool,
        limit: usize,
    ) -> Result<Vec<Alert>, StoreError> {
        let alerts = self
            .alerts
            .read()
            .map_err(|_| StoreError::Unavailable("alerts lock poisoned".to_string()))?;
        let mut matching: Vec<Alert> = alerts
            .iter()
            .filter(|a| {
                a.resource == resource && (include_resolved || a.status == AlertStatus::Open)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.last_seen_ms.cmp(&a.last_seen_ms));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn get_alert(&self, id: Uuid) -> Result<Option<Alert>, StoreError> {
        let alerts = self
            .alerts
            .read()
            .map_err(|_| StoreError::Unavailable("alerts lock poisoned".to_string()))?;
        Ok(alerts.iter().find(|a| a.id == id).cloned())
    }

    async fn put_alert(&self, alert: Alert) -> Result<(), StoreError> {
        let mut alerts = self.alerts_lock()?;
        if let Some(existing) = alerts.iter_mut().find(|a| a.id == alert.id) {
            *existing = alert;
            return Ok(());
        }
        // Uniqueness constraint: one open alert per (type, resource).
        if alert.status == AlertStatus::Open
            && alerts.iter().any(|a| {
                a.resource == alert.resource
                    && a.alert_type == alert.alert_type
                    && a.status == AlertStatus::Open
            })
        {
            return Err(StoreError::Conflict {
                resource: alert.resource,
            });
        }
        alerts.push(alert);
        Ok(())
    }

    async fn load_monitor_config(
        &self,
        resource: &str,
    ) -> Result<Option<MonitorConfig>, StoreError> {
        Ok(self.configs.get(resource).map(|c| c.clone()))
    }

    async fn save_monitor_config(
        &self,
        resource: &str,
        config: MonitorConfig,
    ) -> Result<(), StoreError> {
        self.configs.insert(resource.to_string(), config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::now_ms;
    use crate::probe::ProbeOperation;

    fn result_at(ts: u64) -> HealthCheckResult {
        HealthCheckResult {
            id: Uuid::new_v4(),
            operation: ProbeOperation::Read,
            success: true,
            latency_ms: 10,
            error_kind: None,
            timestamp_ms: ts,
        }
    }

    #[tokio::test]
    async fn breaker_version_check_rejects_stale_writer() {
        let store = MemoryStore::new();
        let record = BreakerRecord::new("r2");

        let saved = store.save_breaker(record.clone()).await.unwrap();
        assert_eq!(saved.version, 1);

        // A concurrent invocation still holding version 0 loses the race.
        let stale = store.save_breaker(record).await;
        assert!(matches!(stale, Err(StoreError::Conflict { .. })));

        let fresh = store.save_breaker(saved).await.unwrap();
        assert_eq!(fresh.version, 2);
    }

    #[tokio::test]
    async fn history_pagination_is_most_recent_first() {
        let store = MemoryStore::new();
        for ts in 0..5 {
            store.append_result(result_at(ts)).await.unwrap();
        }
        let page = store.recent_results(2, 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].timestamp_ms, 3);
        assert_eq!(page[1].timestamp_ms, 2);
    }

    #[tokio::test]
    async fn purge_drops_only_old_results() {
        let store = MemoryStore::new();
        for ts in [10, 20, 30] {
            store.append_result(result_at(ts)).await.unwrap();
        }
        let purged = store.purge_results_before(25).await.unwrap();
        assert_eq!(purged, 2);
        assert_eq!(store.results_since(0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_open_alert_of_same_type_conflicts() {
        let store = MemoryStore::new();
        let now = now_ms();
        let alert = Alert {
            id: Uuid::new_v4(),
            alert_type: AlertType::CircuitOpen,
            resource: "r2".to_string(),
            severity: crate::alerts::Severity::High,
            status: AlertStatus::Open,
            message: "circuit open".to_string(),
            opened_at_ms: now,
            last_seen_ms: now,
            resolved_at_ms: None,
            note: None,
        };
        store.put_alert(alert.clone()).await.unwrap();

        let duplicate = Alert {
            id: Uuid::new_v4(),
            ..alert.clone()
        };
        assert!(matches!(
            store.put_alert(duplicate).await,
            Err(StoreError::Conflict { .. })
        ));

        // Updating the existing row by id is fine.
        let mut refreshed = alert;
        refreshed.last_seen_ms = now + 1;
        store.put_alert(refreshed).await.unwrap();
    }
}
