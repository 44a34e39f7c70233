//! Circuit breaker subsystem.
//!
//! # Data Flow
//! ```text
//! caller (file API, probe runner)
//!     → execute(operation)
//!     → load BreakerRecord + MonitorConfig from the shared store
//!     → admit / claim trial / reject (state.rs)
//!     → backend call bounded by timeout_ms
//!     → outcome persisted with a version-checked write
//! ```
//!
//! # Design Decisions
//! - The breaker never retries; retry policy belongs to the caller
//! - `CircuitOpen` rejections never reach the backend and do not count
//!   toward the failure threshold
//! - Config is re-read from the store on every call so tuning applies to
//!   the very next execution
//! - A post-call write that loses the version race is re-applied once to
//!   the fresh record, then dropped with a warning (accepted trade-off)

pub mod state;

pub use state::{Admission, BreakerRecord, CircuitState};

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::now_ms;
use crate::config::effective_config;
use crate::error::{BackendError, SentinelError, StoreError};
use crate::observability::metrics;
use crate::store::StateStore;

/// Fail-fast wrapper around calls to one backend resource.
pub struct CircuitBreaker {
    store: Arc<dyn StateStore>,
    resource: String,
}

impl CircuitBreaker {
    pub fn new(store: Arc<dyn StateStore>, resource: impl Into<String>) -> Self {
        Self {
            store,
            resource: resource.into(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Current breaker record (a fresh Closed record if none persisted yet).
    pub async fn status(&self) -> Result<BreakerRecord, StoreError> {
        self.load_or_new().await
    }

    /// Administrative override: force Closed and clear counters. Logged as
    /// a transition the same as automatic ones.
    pub async fn force_reset(&self) -> Result<BreakerRecord, StoreError> {
        let mut record = self.load_or_new().await?;
        let transition = record.force_close(now_ms());
        let saved = match self.store.save_breaker(record).await {
            Ok(saved) => saved,
            Err(StoreError::Conflict { .. }) => {
                // Raced a probe write; re-apply the override to the fresh row.
                let mut fresh = self.load_or_new().await?;
                fresh.force_close(now_ms());
                self.store.save_breaker(fresh).await?
            }
            Err(e) => return Err(e),
        };
        if transition.is_some() {
            tracing::warn!(
                resource = %self.resource,
                state = "closed",
                "Circuit force-closed by administrative reset"
            );
        }
        metrics::record_breaker_state(&self.resource, CircuitState::Closed);
        Ok(saved)
    }

    /// Run one backend call under fail-fast protection.
    ///
    /// While the circuit is open the operation is never invoked and the
    /// caller gets `SentinelError::CircuitOpen`; callers should branch to a
    /// degraded path rather than retry.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, SentinelError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, BackendError>> + Send,
        T: Send,
    {
        let config = effective_config(&self.store, &self.resource).await?;
        let mut record = self.load_or_new().await?;

        match record.admit(now_ms(), config.recovery_timeout_ms) {
            Admission::Reject => {
                metrics::record_rejection(&self.resource);
                return Err(SentinelError::CircuitOpen {
                    resource: self.resource.clone(),
                });
            }
            Admission::Trial => {
                // The claim is only real once this write wins the version
                // race; the loser is rejected, never retried.
                record = match self.store.save_breaker(record).await {
                    Ok(saved) => {
                        tracing::info!(
                            resource = %self.resource,
                            state = "half_open",
                            "Recovery timeout elapsed, trial call admitted"
                        );
                        metrics::record_breaker_state(&self.resource, CircuitState::HalfOpen);
                        saved
                    }
                    Err(StoreError::Conflict { .. }) => {
                        metrics::record_rejection(&self.resource);
                        return Err(SentinelError::CircuitOpen {
                            resource: self.resource.clone(),
                        });
                    }
                    Err(e) => return Err(e.into()),
                };
            }
            Admission::Proceed => {}
        }

        let started = Instant::now();
        let outcome =
            tokio::time::timeout(Duration::from_millis(config.timeout_ms), operation()).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let result: Result<T, BackendError> = match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(BackendError::timeout(config.timeout_ms)),
        };

        metrics::record_call(&self.resource, result.is_ok(), latency_ms);
        self.persist_outcome(record, result.is_ok(), latency_ms, config.failure_threshold)
            .await?;

        result.map_err(SentinelError::from)
    }

    async fn load_or_new(&self) -> Result<BreakerRecord, StoreError> {
        Ok(self
            .store
            .load_breaker(&self.resource)
            .await?
            .unwrap_or_else(|| BreakerRecord::new(&self.resource)))
    }

    async fn persist_outcome(
        &self,
        mut record: BreakerRecord,
        success: bool,
        latency_ms: u64,
        failure_threshold: u32,
    ) -> Result<(), StoreError> {
        for attempt in 0..2 {
            let now = now_ms();
            let mut candidate = record.clone();
            let transition = if success {
                candidate.record_success(now, latency_ms)
            } else {
                candidate.record_failure(now, latency_ms, failure_threshold)
            };

            match self.store.save_breaker(candidate).await {
                Ok(saved) => {
                    if let Some(new_state) = transition {
                        match new_state {
                            CircuitState::Open => tracing::warn!(
                                resource = %self.resource,
                                state = new_state.as_str(),
                                consecutive_failures = saved.consecutive_failures,
                                "Circuit opened"
                            ),
                            _ => tracing::info!(
                                resource = %self.resource,
                                state = new_state.as_str(),
                                "Circuit state transition"
                            ),
                        }
                        metrics::record_breaker_state(&self.resource, new_state);
                    }
                    return Ok(());
                }
                Err(StoreError::Conflict { .. }) if attempt == 0 => {
                    record = self.load_or_new().await?;
                }
                Err(StoreError::Conflict { .. }) => {
                    tracing::warn!(
                        resource = %self.resource,
                        "Lost breaker write race twice, dropping outcome update"
                    );
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
