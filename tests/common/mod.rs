//! Shared test harness: a programmable backend plus a fully wired sentinel
//! stack, optionally served over a real listener.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;

use storage_sentinel::alerts::AlertManager;
use storage_sentinel::api::{self, ApiState};
use storage_sentinel::breaker::CircuitBreaker;
use storage_sentinel::config::MonitorConfig;
use storage_sentinel::error::BackendError;
use storage_sentinel::probe::runner::ProbeRunner;
use storage_sentinel::probe::target::{ObjectMeta, ObjectStore};
use storage_sentinel::scheduler::MonitorScheduler;
use storage_sentinel::stats::{MetricsAggregator, RollingMetrics};
use storage_sentinel::store::memory::MemoryStore;
use storage_sentinel::store::StateStore;

pub const RESOURCE: &str = "object-storage";

/// In-memory backend with injectable failures and latency.
pub struct FlakyBackend {
    objects: DashMap<String, Vec<u8>>,
    pub failing: AtomicBool,
    pub latency_ms: AtomicU64,
    pub invocations: AtomicU32,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            failing: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            invocations: AtomicU32::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn observe(&self) -> Result<(), BackendError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let delay = self.latency_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            Err(BackendError::transient("injected backend failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ObjectStore for FlakyBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>, BackendError> {
        self.observe().await?;
        self.objects
            .get(key)
            .map(|v| v.clone())
            .ok_or_else(|| BackendError::transient(format!("no such key {key}")))
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), BackendError> {
        self.observe().await?;
        self.objects.insert(key.to_string(), body);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.observe().await?;
        self.objects.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>, BackendError> {
        self.observe().await?;
        Ok(self
            .objects
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .take(limit)
            .map(|e| e.key().clone())
            .collect())
    }

    async fn stat(&self, key: &str) -> Result<ObjectMeta, BackendError> {
        self.observe().await?;
        let body = self
            .objects
            .get(key)
            .ok_or_else(|| BackendError::transient(format!("no such key {key}")))?;
        Ok(ObjectMeta {
            size: body.len() as u64,
            last_modified_ms: None,
        })
    }
}

/// Fully wired sentinel stack over a `FlakyBackend` and `MemoryStore`.
pub struct Harness {
    pub store: Arc<dyn StateStore>,
    pub backend: Arc<FlakyBackend>,
    pub breaker: Arc<CircuitBreaker>,
    pub scheduler: Arc<MonitorScheduler>,
    pub latest_metrics: Arc<ArcSwapOption<RollingMetrics>>,
    state: ApiState,
}

impl Harness {
    pub async fn config(&self) -> MonitorConfig {
        self.store
            .load_monitor_config(RESOURCE)
            .await
            .unwrap()
            .unwrap_or_default()
    }

    /// Run one probe-aggregate-alert cycle directly, no timers involved.
    pub async fn tick(&self) {
        let config = self.config().await;
        self.scheduler.tick(&config).await.unwrap();
    }

    /// Serve the Control API on an ephemeral local port.
    pub async fn serve(&self) -> SocketAddr {
        let app = api::router(self.state.clone(), Duration::from_secs(10));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    /// Spawn the real scheduler loop; returns the shutdown trigger.
    pub fn spawn_scheduler(&self) -> broadcast::Sender<()> {
        let (tx, rx) = broadcast::channel(1);
        let scheduler = self.scheduler.clone();
        tokio::spawn(async move {
            scheduler.run(rx).await;
        });
        tx
    }
}

pub async fn harness(config: MonitorConfig) -> Harness {
    let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
    store.save_monitor_config(RESOURCE, config).await.unwrap();

    let backend = Arc::new(FlakyBackend::new());
    let breaker = Arc::new(CircuitBreaker::new(store.clone(), RESOURCE));
    let runner = Arc::new(ProbeRunner::new(
        backend.clone(),
        breaker.clone(),
        store.clone(),
        "health-probe/",
    ));
    let aggregator = Arc::new(MetricsAggregator::new(store.clone()));
    let alerts = Arc::new(AlertManager::new(store.clone(), RESOURCE));
    let latest_metrics = Arc::new(ArcSwapOption::empty());
    let scheduler = Arc::new(MonitorScheduler::new(
        store.clone(),
        runner,
        aggregator.clone(),
        alerts.clone(),
        breaker.clone(),
        latest_metrics.clone(),
    ));

    let state = ApiState {
        store: store.clone(),
        breaker: breaker.clone(),
        aggregator,
        alerts,
        scheduler: scheduler.clone(),
        latest_metrics: latest_metrics.clone(),
    };

    Harness {
        store,
        backend,
        breaker,
        scheduler,
        latest_metrics,
        state,
    }
}
