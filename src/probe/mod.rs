//! Synthetic probing subsystem.
//!
//! # Data Flow
//! ```text
//! scheduler tick / POST /health/check
//!     → runner.rs (one synthetic operation per configured type)
//!     → breaker (probes respect and inform the fail-fast state)
//!     → target.rs (ObjectStore trait, the real backend seam)
//!     → HealthCheckResult appended to the shared store
//! ```
//!
//! # Design Decisions
//! - Probes never touch real data: write-path probes use throwaway
//!   uniquely-named keys the probe creates and removes itself
//! - A probe error becomes a failed result row, never a panic or an error
//!   returned to the scheduler
//! - Cleanup failures are logged but do not fail the probe

pub mod runner;
pub mod target;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;

/// The synthetic operation types a probe cycle can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOperation {
    Read,
    Write,
    Delete,
    List,
    Stat,
}

impl ProbeOperation {
    /// Every operation type, in probe-cycle order.
    pub fn all() -> [ProbeOperation; 5] {
        [
            ProbeOperation::Read,
            ProbeOperation::Write,
            ProbeOperation::Delete,
            ProbeOperation::List,
            ProbeOperation::Stat,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOperation::Read => "read",
            ProbeOperation::Write => "write",
            ProbeOperation::Delete => "delete",
            ProbeOperation::List => "list",
            ProbeOperation::Stat => "stat",
        }
    }
}

/// Outcome of one synthetic operation. Append-only; never mutated after
/// creation. Purged by the retention pass, not updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub id: Uuid,
    pub operation: ProbeOperation,
    pub success: bool,
    pub latency_ms: u64,
    pub error_kind: Option<ErrorKind>,
    pub timestamp_ms: u64,
}
