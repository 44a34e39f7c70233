//! Storage Sentinel reference service.
//!
//! Wires the monitoring subsystem to a filesystem-backed object store and
//! serves the Control API. Deployments embedding the library swap in their
//! own `ObjectStore` and a durable `StateStore`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use storage_sentinel::alerts::AlertManager;
use storage_sentinel::api::{self, ApiState};
use storage_sentinel::breaker::CircuitBreaker;
use storage_sentinel::config::loader::load_config;
use storage_sentinel::config::ServiceConfig;
use storage_sentinel::observability;
use storage_sentinel::probe::runner::ProbeRunner;
use storage_sentinel::probe::target::FsObjectStore;
use storage_sentinel::scheduler::MonitorScheduler;
use storage_sentinel::stats::MetricsAggregator;
use storage_sentinel::store::memory::MemoryStore;
use storage_sentinel::store::StateStore;

#[derive(Parser)]
#[command(name = "storage-sentinel", about = "Object-storage health monitor")]
struct Args {
    /// Path to the bootstrap TOML config. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root directory for the filesystem-backed reference backend.
    #[arg(long, default_value = "./sentinel-data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    observability::logging::init(&config.observability.log_level);

    tracing::info!(
        resource = %config.resource.name,
        bind_address = %config.listener.bind_address,
        check_interval_ms = config.monitoring.check_interval_ms,
        "storage-sentinel starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    let resource = config.resource.name.clone();

    // Seed the runtime config only on first start; a stored record means an
    // operator already tuned it through the API.
    if store.load_monitor_config(&resource).await?.is_none() {
        store
            .save_monitor_config(&resource, config.monitoring.clone())
            .await?;
    }

    let target = Arc::new(FsObjectStore::new(&args.data_dir));
    let breaker = Arc::new(CircuitBreaker::new(store.clone(), resource.clone()));
    let runner = Arc::new(ProbeRunner::new(
        target,
        breaker.clone(),
        store.clone(),
        config.resource.probe_prefix.clone(),
    ));
    let aggregator = Arc::new(MetricsAggregator::new(store.clone()));
    let alerts = Arc::new(AlertManager::new(store.clone(), resource.clone()));
    let latest_metrics = Arc::new(ArcSwapOption::empty());

    let scheduler = Arc::new(MonitorScheduler::new(
        store.clone(),
        runner,
        aggregator.clone(),
        alerts.clone(),
        breaker.clone(),
        latest_metrics.clone(),
    ));

    let (shutdown_tx, _) = broadcast::channel(1);
    tokio::spawn(scheduler.clone().run(shutdown_tx.subscribe()));

    let state = ApiState {
        store,
        breaker,
        aggregator,
        alerts,
        scheduler,
        latest_metrics,
    };
    let app = api::router(
        state,
        Duration::from_secs(config.listener.request_timeout_secs),
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Control API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(());
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
