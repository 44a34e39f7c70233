//! Error taxonomy.
//!
//! # Responsibilities
//! - Classify backend failures (timeout vs transient vs internal)
//! - Distinguish fail-fast rejections from genuine backend errors
//! - Keep store failures separate so callers can tell "backend down"
//!   from "monitoring state unavailable"
//!
//! # Design Decisions
//! - `CircuitOpen` is not a backend error: the backend was never called,
//!   so it does not count toward the failure threshold
//! - Probe-internal failures are swallowed by the runner and only ever
//!   appear as failed `HealthCheckResult` rows

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed call, persisted with probe results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The call exceeded the configured timeout and was abandoned.
    Timeout,
    /// The backend answered with a (possibly transient) failure.
    Transient,
    /// The probe itself failed for reasons unrelated to the backend.
    Internal,
    /// Rejected fail-fast; the backend was never called.
    CircuitOpen,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transient => "transient",
            ErrorKind::Internal => "internal",
            ErrorKind::CircuitOpen => "circuit_open",
        }
    }
}

/// Failure reported by (or synthesized around) a backend call.
#[derive(Debug, Clone, Error)]
#[error("backend error ({}): {message}", kind.as_str())]
pub struct BackendError {
    pub kind: ErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            message: format!("call exceeded {timeout_ms}ms timeout"),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
        }
    }
}

/// Error surfaced by `CircuitBreaker::execute` to calling code.
///
/// Callers should branch on the variant: `CircuitOpen` means "apply your
/// degraded path, do not retry"; `Backend` is a real failure the caller may
/// handle with its own fallback.
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("circuit open for resource `{resource}`")]
    CircuitOpen { resource: String },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Shared-store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A version-checked write lost the race to a concurrent invocation.
    #[error("version conflict writing record for `{resource}`")]
    Conflict { resource: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
