//! Shared persistent store seam.
//!
//! # Data Flow
//! ```text
//! breaker / probe runner / alert manager / Control API
//!     → StateStore trait (single-record upserts, no multi-row transactions)
//!     → memory.rs (reference implementation)
//!     → or a durable implementation supplied by the deployment (SQL, KV)
//! ```
//!
//! # Design Decisions
//! - Invocations do not share memory, so every durable record lives here:
//!   breaker state, probe history, alerts, monitoring config
//! - Breaker writes are version-checked; a losing writer gets `Conflict`
//!   and treats its call as rejected rather than retrying
//! - Each entity type owns its invariant independently, so single-row
//!   upserts suffice
//! - The store enforces the one-open-alert-per-(type, resource) invariant
//!   itself, the way a DB uniqueness constraint would

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::alerts::{Alert, AlertType};
use crate::breaker::state::BreakerRecord;
use crate::config::MonitorConfig;
use crate::error::StoreError;
use crate::probe::HealthCheckResult;

/// The shared store every invocation reads and writes.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the breaker record for a resource, if one has been persisted.
    async fn load_breaker(&self, resource: &str) -> Result<Option<BreakerRecord>, StoreError>;

    /// Version-checked upsert of a breaker record.
    ///
    /// The record's `version` must match the stored one (0 creates). On
    /// success the stored record is returned with its version bumped; a
    /// mismatch returns `StoreError::Conflict`.
    async fn save_breaker(&self, record: BreakerRecord) -> Result<BreakerRecord, StoreError>;

    /// Append one probe result. Results are immutable once written.
    async fn append_result(&self, result: HealthCheckResult) -> Result<(), StoreError>;

    /// All results with `timestamp_ms >= since_ms`, oldest first.
    async fn results_since(&self, since_ms: u64) -> Result<Vec<HealthCheckResult>, StoreError>;

    /// Paginated results, most recent first.
    async fn recent_results(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<HealthCheckResult>, StoreError>;

    /// Delete results older than the cutoff; returns how many were removed.
    async fn purge_results_before(&self, cutoff_ms: u64) -> Result<usize, StoreError>;

    /// The open alert for (resource, type), if any. At most one exists.
    async fn find_open_alert(
        &self,
        resource: &str,
        alert_type: AlertType,
    ) -> Result<Option<Alert>, StoreError>;

    /// Every open alert for the resource.
    async fn open_alerts(&self, resource: &str) -> Result<Vec<Alert>, StoreError>;

    /// Alerts for the resource, most recently seen first.
    async fn list_alerts(
        &self,
        resource: &str,
        include_resolved: bool,
        limit: usize,
    ) -> Result<Vec<Alert>, StoreError>;

    async fn get_alert(&self, id: Uuid) -> Result<Option<Alert>, StoreError>;

    /// Insert or replace an alert row by id.
    ///
    /// Inserting a second open alert for the same (type, resource) is a
    /// `Conflict`; callers refresh the existing row instead.
    async fn put_alert(&self, alert: Alert) -> Result<(), StoreError>;

    async fn load_monitor_config(
        &self,
        resource: &str,
    ) -> Result<Option<MonitorConfig>, StoreError>;

    async fn save_monitor_config(
        &self,
        resource: &str,
        config: MonitorConfig,
    ) -> Result<(), StoreError>;
}
