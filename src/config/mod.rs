//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! bootstrap file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (listener, observability, initial monitoring params)
//!
//! at runtime:
//!     MonitorConfig lives in the shared store, one record per resource
//!     → PUT /health/config validates then replaces it
//!     → the scheduler re-reads it at the start of every tick, so updates
//!       take effect without a restart and without losing in-flight state
//! ```
//!
//! # Design Decisions
//! - All fields have defaults; the subsystem is safe to start with zero
//!   configuration
//! - Validation is a pure function returning every error, not just the first
//! - A rejected update retains the previous config

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{MonitorConfig, ServiceConfig};

use std::sync::Arc;

use crate::error::StoreError;
use crate::store::StateStore;

/// The monitoring config currently in effect for a resource: the stored
/// record if one exists, built-in defaults otherwise.
pub async fn effective_config(
    store: &Arc<dyn StateStore>,
    resource: &str,
) -> Result<MonitorConfig, StoreError> {
    Ok(store
        .load_monitor_config(resource)
        .await?
        .unwrap_or_default())
}
