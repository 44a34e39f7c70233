//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Prometheus scrape of the exposition endpoint
//! ```
//!
//! # Design Decisions
//! - Structured fields everywhere: resource, operation, state
//! - Metric updates are cheap atomic operations; safe on the hot path
//! - The JSON Control API is the source of truth for operators; the
//!   Prometheus endpoint exists for dashboards and alert routing

pub mod logging;
pub mod metrics;
