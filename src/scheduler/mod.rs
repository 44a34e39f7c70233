//! Scheduled monitoring loop.
//!
//! # Data Flow
//! ```text
//! tick (interval from MonitorConfig, jittered)
//!     → re-read config from the store (updates apply without restart)
//!     → ProbeRunner::run_all()
//!     → MetricsAggregator::compute_window()
//!     → AlertManager::evaluate()
//!     → latest metrics snapshot published via arc-swap
//!     → opportunistic history purge per retention policy
//! ```
//!
//! # Design Decisions
//! - The loop is a thin driver around `tick()`; tests and the Control API
//!   call the same entrypoint directly without waiting on real time
//! - A failed tick is logged and retried on the next interval, never
//!   propagated
//! - `enabled=false` keeps the loop alive but idle, so `monitoring/start`
//!   needs no process restart
//! - Tick jitter (±10%) avoids synchronized probes from concurrent
//!   deployments

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::broadcast;

use crate::alerts::AlertManager;
use crate::breaker::CircuitBreaker;
use crate::clock::now_ms;
use crate::config::{effective_config, MonitorConfig};
use crate::error::StoreError;
use crate::probe::runner::ProbeRunner;
use crate::probe::HealthCheckResult;
use crate::stats::{MetricsAggregator, RollingMetrics};
use crate::store::StateStore;

/// Drives the periodic probe-aggregate-alert cycle.
pub struct MonitorScheduler {
    store: Arc<dyn StateStore>,
    runner: Arc<ProbeRunner>,
    aggregator: Arc<MetricsAggregator>,
    alerts: Arc<AlertManager>,
    breaker: Arc<CircuitBreaker>,
    /// Latest window, published for the Control API status view.
    latest: Arc<ArcSwapOption<RollingMetrics>>,
}

impl MonitorScheduler {
    pub fn new(
        store: Arc<dyn StateStore>,
        runner: Arc<ProbeRunner>,
        aggregator: Arc<MetricsAggregator>,
        alerts: Arc<AlertManager>,
        breaker: Arc<CircuitBreaker>,
        latest: Arc<ArcSwapOption<RollingMetrics>>,
    ) -> Self {
        Self {
            store,
            runner,
            aggregator,
            alerts,
            breaker,
            latest,
        }
    }

    /// Run the loop until the shutdown signal fires.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(resource = %self.breaker.resource(), "Monitor scheduler starting");

        loop {
            let config = match effective_config(&self.store, self.breaker.resource()).await {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read monitor config, using defaults");
                    MonitorConfig::default()
                }
            };

            if config.enabled {
                if let Err(e) = self.tick(&config).await {
                    tracing::warn!(error = %e, "Monitor tick failed, retrying next interval");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(jittered(config.check_interval_ms)) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Monitor scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One probe-aggregate-alert cycle. Also the on-demand entrypoint used
    /// by `POST /health/check`; returns the probe results it produced.
    pub async fn tick(
        &self,
        config: &MonitorConfig,
    ) -> Result<Vec<HealthCheckResult>, StoreError> {
        let results = self.runner.run_all().await;

        let metrics = self
            .aggregator
            .compute_window(config.metrics_window_ms, now_ms())
            .await?;
        let breaker_status = self.breaker.status().await?;
        self.alerts.evaluate(&metrics, &breaker_status).await?;
        self.latest.store(Some(Arc::new(metrics)));

        let cutoff = now_ms().saturating_sub(config.history_retention_ms);
        match self.store.purge_results_before(cutoff).await {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "Purged expired probe results"),
            Err(e) => tracing::warn!(error = %e, "History purge failed"),
        }

        Ok(results)
    }
}

/// Interval with ±10% jitter.
fn jittered(interval_ms: u64) -> Duration {
    let spread = interval_ms / 10;
    if spread == 0 {
        return Duration::from_millis(interval_ms.max(1));
    }
    let low = interval_ms - spread / 2;
    Duration::from_millis(low + fastrand::u64(0..=spread))
}
