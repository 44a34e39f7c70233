//! Rolling metrics aggregation.
//!
//! # Responsibilities
//! - Reduce recent probe results to call counts, error rate, and latency
//!   percentiles over a requested window
//! - Feed the alert rules and the Control API metrics endpoint
//!
//! # Design Decisions
//! - Percentiles use the nearest-rank method over sorted latencies
//! - An empty window yields a defined "no data" record, never a division
//!   by zero
//! - Fail-fast rejections count toward the error rate but are excluded
//!   from latency percentiles (no call was made, so there is no latency)

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, StoreError};
use crate::probe::ProbeOperation;
use crate::store::StateStore;

/// Derived statistics over one time window. Recomputable from probe
/// results; never a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingMetrics {
    pub window_start_ms: u64,
    pub window_end_ms: u64,
    pub total_calls: u64,
    pub failed_calls: u64,
    pub error_rate: f64,
    pub p50_latency_ms: Option<u64>,
    pub p95_latency_ms: Option<u64>,
    pub p99_latency_ms: Option<u64>,
    /// Distinct operation types with at least one failure in the window.
    pub failed_operations: Vec<ProbeOperation>,
}

impl RollingMetrics {
    /// The defined "no data yet" record for an empty window.
    pub fn empty(window_start_ms: u64, window_end_ms: u64) -> Self {
        Self {
            window_start_ms,
            window_end_ms,
            total_calls: 0,
            failed_calls: 0,
            error_rate: 0.0,
            p50_latency_ms: None,
            p95_latency_ms: None,
            p99_latency_ms: None,
            failed_operations: Vec::new(),
        }
    }
}

/// Computes rolling windows from stored probe results.
pub struct MetricsAggregator {
    store: Arc<dyn StateStore>,
}

impl MetricsAggregator {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Aggregate all results in `[now - window_ms, now]`.
    pub async fn compute_window(
        &self,
        window_ms: u64,
        now_ms: u64,
    ) -> Result<RollingMetrics, StoreError> {
        let window_start = now_ms.saturating_sub(window_ms);
        let results = self.store.results_since(window_start).await?;

        if results.is_empty() {
            return Ok(RollingMetrics::empty(window_start, now_ms));
        }

        let total_calls = results.len() as u64;
        let failed_calls = results.iter().filter(|r| !r.success).count() as u64;

        let failed_operations: BTreeSet<ProbeOperation> = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.operation)
            .collect();

        let mut latencies: Vec<u64> = results
            .iter()
            .filter(|r| r.error_kind != Some(ErrorKind::CircuitOpen))
            .map(|r| r.latency_ms)
            .collect();
        latencies.sort_unstable();

        Ok(RollingMetrics {
            window_start_ms: window_start,
            window_end_ms: now_ms,
            total_calls,
            failed_calls,
            error_rate: failed_calls as f64 / total_calls as f64,
            p50_latency_ms: percentile(&latencies, 0.50),
            p95_latency_ms: percentile(&latencies, 0.95),
            p99_latency_ms: percentile(&latencies, 0.99),
            failed_operations: failed_operations.into_iter().collect(),
        })
    }
}

/// Nearest-rank percentile: index ⌈p·n⌉−1 into the sorted sample.
fn percentile(sorted: &[u64], p: f64) -> Option<u64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    Some(sorted[rank.saturating_sub(1).min(sorted.len() - 1)])
}
