//! Storage Sentinel
//!
//! Resilience and health monitoring for a file service's object-storage
//! backend. Wraps backend calls in a circuit breaker, runs synthetic probes
//! on a schedule, aggregates probe results into rolling metrics, and turns
//! those metrics into de-duplicated alert records.
//!
//! # Data Flow
//! ```text
//! scheduler tick / POST /health/check
//!     → probe::ProbeRunner (synthetic read/write/delete/list/stat)
//!     → breaker::CircuitBreaker::execute (fail fast while open)
//!     → ObjectStore backend
//!     → results appended to store::StateStore
//!     → stats::MetricsAggregator (error rate, latency percentiles)
//!     → alerts::AlertManager (open/refresh/resolve alert records)
//!     → api::router (operator surface)
//! ```
//!
//! # Design Decisions
//! - No durable state in process memory: invocations are short-lived and
//!   concurrent, so breaker state, probe history, alerts, and config all
//!   live behind the `StateStore` trait with version-checked writes
//! - The half-open trial is claimed by winning a versioned write; losing
//!   writers are rejected, never retried
//! - Probe failures are data, not errors: the monitoring loop cannot crash
//!   because the thing it monitors is down

pub mod alerts;
pub mod api;
pub mod breaker;
pub mod clock;
pub mod config;
pub mod error;
pub mod observability;
pub mod probe;
pub mod scheduler;
pub mod stats;
pub mod store;

pub use breaker::CircuitBreaker;
pub use config::schema::{MonitorConfig, ServiceConfig};
pub use error::{BackendError, ErrorKind, SentinelError, StoreError};
pub use probe::runner::ProbeRunner;
pub use probe::target::ObjectStore;
pub use store::StateStore;
