//! Probe execution.
//!
//! # Responsibilities
//! - Issue one synthetic operation per configured type, through the breaker
//! - Capture every outcome as a `HealthCheckResult` row, including
//!   fail-fast rejections
//! - Clean up throwaway probe objects best-effort
//!
//! # Design Decisions
//! - `run_check` is infallible by construction: probe errors become data,
//!   store write failures are logged and swallowed
//! - Cleanup bypasses the breaker and its failure counting; a leaked probe
//!   object is a log line, not a failed probe

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::breaker::CircuitBreaker;
use crate::clock::now_ms;
use crate::config::effective_config;
use crate::error::{BackendError, ErrorKind, SentinelError};
use crate::observability::metrics;
use crate::probe::target::ObjectStore;
use crate::probe::{HealthCheckResult, ProbeOperation};
use crate::store::StateStore;

const PROBE_PAYLOAD: &[u8] = b"storage-sentinel probe object";

/// Runs synthetic operations against the backend through the breaker.
pub struct ProbeRunner {
    target: Arc<dyn ObjectStore>,
    breaker: Arc<CircuitBreaker>,
    store: Arc<dyn StateStore>,
    probe_prefix: String,
}

impl ProbeRunner {
    pub fn new(
        target: Arc<dyn ObjectStore>,
        breaker: Arc<CircuitBreaker>,
        store: Arc<dyn StateStore>,
        probe_prefix: impl Into<String>,
    ) -> Self {
        Self {
            target,
            breaker,
            store,
            probe_prefix: probe_prefix.into(),
        }
    }

    /// Run every configured operation type once, in order.
    pub async fn run_all(&self) -> Vec<HealthCheckResult> {
        let operations = match effective_config(&self.store, self.breaker.resource()).await {
            Ok(config) => config.probed_operations,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load probe config, using defaults");
                ProbeOperation::all().to_vec()
            }
        };

        let mut results = Vec::with_capacity(operations.len());
        for operation in operations {
            results.push(self.run_check(operation).await);
        }
        results
    }

    /// Run one synthetic operation and record its outcome.
    ///
    /// Never returns an error: a failing backend, an open circuit, and an
    /// unavailable store all become (or at worst fail to persist) a result
    /// row.
    pub async fn run_check(&self, operation: ProbeOperation) -> HealthCheckResult {
        let key = format!("{}{}", self.probe_prefix, Uuid::new_v4());
        let started = Instant::now();

        let outcome = self.probe_through_breaker(operation, &key).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let (success, error_kind) = match outcome {
            Ok(()) => (true, None),
            Err(SentinelError::CircuitOpen { .. }) => (false, Some(ErrorKind::CircuitOpen)),
            Err(SentinelError::Backend(e)) => {
                tracing::warn!(
                    operation = operation.as_str(),
                    error_kind = e.kind.as_str(),
                    error = %e,
                    "Probe failed"
                );
                (false, Some(e.kind))
            }
            Err(SentinelError::Store(e)) => {
                tracing::warn!(operation = operation.as_str(), error = %e, "Probe could not reach state store");
                (false, Some(ErrorKind::Internal))
            }
        };

        self.cleanup(operation, &key, error_kind).await;

        let result = HealthCheckResult {
            id: Uuid::new_v4(),
            operation,
            success,
            latency_ms,
            error_kind,
            timestamp_ms: now_ms(),
        };

        metrics::record_probe(operation.as_str(), success, latency_ms);
        if let Err(e) = self.store.append_result(result.clone()).await {
            tracing::warn!(operation = operation.as_str(), error = %e, "Failed to persist probe result");
        }
        result
    }

    async fn probe_through_breaker(
        &self,
        operation: ProbeOperation,
        key: &str,
    ) -> Result<(), SentinelError> {
        let target = self.target.clone();
        let prefix = self.probe_prefix.clone();
        let key = key.to_string();
        self.breaker
            .execute(move || async move { run_operation(&*target, operation, &prefix, &key).await })
            .await
    }

    /// Remove the throwaway object left behind by write-path probes.
    /// Bypasses the breaker: cleanup is not a health signal.
    async fn cleanup(&self, operation: ProbeOperation, key: &str, error_kind: Option<ErrorKind>) {
        // Nothing was created if the call never reached the backend, and
        // delete probes remove their own object.
        if error_kind == Some(ErrorKind::CircuitOpen) {
            return;
        }
        let leaves_object = matches!(
            operation,
            ProbeOperation::Read | ProbeOperation::Write | ProbeOperation::Stat
        );
        if !leaves_object {
            return;
        }
        if let Err(e) = self.target.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Probe cleanup failed, leaving throwaway object");
        }
    }
}

/// The actual synthetic operation. Write-path variants create their own
/// uniquely-named throwaway object so real data is never touched.
async fn run_operation(
    target: &dyn ObjectStore,
    operation: ProbeOperation,
    prefix: &str,
    key: &str,
) -> Result<(), BackendError> {
    match operation {
        ProbeOperation::Write => target.put(key, PROBE_PAYLOAD.to_vec()).await,
        ProbeOperation::Read => {
            target.put(key, PROBE_PAYLOAD.to_vec()).await?;
            let body = target.get(key).await?;
            if body != PROBE_PAYLOAD {
                return Err(BackendError::internal("probe object read back corrupted"));
            }
            Ok(())
        }
        ProbeOperation::Delete => {
            target.put(key, PROBE_PAYLOAD.to_vec()).await?;
            target.delete(key).await
        }
        ProbeOperation::List => target.list(prefix, 1).await.map(|_| ()),
        ProbeOperation::Stat => {
            target.put(key, PROBE_PAYLOAD.to_vec()).await?;
            target.stat(key).await.map(|_| ())
        }
    }
}
