//! Wall-clock helpers.
//!
//! All persisted timestamps are epoch milliseconds so records serialize the
//! same way regardless of which invocation wrote them.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
