//! Breaker state machine.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: backend assumed down, calls fail fast
//! - HalfOpen: testing whether the backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → HalfOpen: after recovery timeout, first caller claims the trial
//! HalfOpen → Closed: trial call succeeds (failure streak resets)
//! HalfOpen → Open: trial call fails (opened_at resets)
//! ```
//!
//! # Design Decisions
//! - Transitions are pure functions over the record plus a caller-supplied
//!   clock, so they unit-test without sleeping
//! - Exactly one half-open trial: the claim is only real once the record
//!   write wins the version check in the store
//! - A success while Closed resets the failure streak

use serde::{Deserialize, Serialize};

/// Smoothing factor for the per-record latency moving average.
const LATENCY_EMA_ALPHA: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Decision for a call arriving at the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Normal closed-state call.
    Proceed,
    /// This caller claimed the single half-open trial. The claim must be
    /// persisted (and win the version check) before the call goes out.
    Trial,
    /// Fail fast without touching the backend.
    Reject,
}

/// Durable breaker state for one resource.
///
/// Owned exclusively by the breaker; mutated only through the transition
/// methods below and persisted with a version-checked write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerRecord {
    pub resource: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub last_failure_at_ms: Option<u64>,
    pub last_success_at_ms: Option<u64>,
    pub opened_at_ms: Option<u64>,
    pub half_open_trial_in_flight: bool,
    /// Exponential moving average over observed call latencies.
    pub latency_ema_ms: f64,
    pub total_calls: u64,
    pub total_failures: u64,
    /// Optimistic-concurrency version; 0 means "never persisted".
    pub version: u64,
}

impl BreakerRecord {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at_ms: None,
            last_success_at_ms: None,
            opened_at_ms: None,
            half_open_trial_in_flight: false,
            latency_ema_ms: 0.0,
            total_calls: 0,
            total_failures: 0,
            version: 0,
        }
    }

    /// Decide whether a call may proceed right now.
    ///
    /// May mutate the record (Open → HalfOpen claim); the caller must
    /// persist it before acting on `Admission::Trial`.
    pub fn admit(&mut self, now_ms: u64, recovery_timeout_ms: u64) -> Admission {
        match self.state {
            CircuitState::Closed => Admission::Proceed,
            CircuitState::Open => {
                let opened_at = self.opened_at_ms.unwrap_or(0);
                if now_ms.saturating_sub(opened_at) >= recovery_timeout_ms {
                    self.state = CircuitState::HalfOpen;
                    self.half_open_trial_in_flight = true;
                    Admission::Trial
                } else {
                    Admission::Reject
                }
            }
            CircuitState::HalfOpen => {
                if self.half_open_trial_in_flight {
                    Admission::Reject
                } else {
                    self.half_open_trial_in_flight = true;
                    Admission::Trial
                }
            }
        }
    }

    /// Record a successful call. Returns the new state if a transition
    /// occurred.
    pub fn record_success(&mut self, now_ms: u64, latency_ms: u64) -> Option<CircuitState> {
        self.total_calls += 1;
        self.last_success_at_ms = Some(now_ms);
        self.consecutive_failures = 0;
        self.observe_latency(latency_ms);

        match self.state {
            CircuitState::HalfOpen => {
                self.state = CircuitState::Closed;
                self.half_open_trial_in_flight = false;
                self.opened_at_ms = None;
                Some(CircuitState::Closed)
            }
            CircuitState::Closed => None,
            // A success observed while Open means a stale reader raced the
            // transition; accept it as recovery evidence and close.
            CircuitState::Open => {
                self.state = CircuitState::Closed;
                self.opened_at_ms = None;
                Some(CircuitState::Closed)
            }
        }
    }

    /// Record a failed call. Returns the new state if a transition occurred.
    pub fn record_failure(
        &mut self,
        now_ms: u64,
        latency_ms: u64,
        failure_threshold: u32,
    ) -> Option<CircuitState> {
        self.total_calls += 1;
        self.total_failures += 1;
        self.last_failure_at_ms = Some(now_ms);
        self.observe_latency(latency_ms);

        match self.state {
            CircuitState::HalfOpen => {
                self.state = CircuitState::Open;
                self.half_open_trial_in_flight = false;
                self.opened_at_ms = Some(now_ms);
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                Some(CircuitState::Open)
            }
            CircuitState::Closed => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures >= failure_threshold {
                    self.state = CircuitState::Open;
                    self.opened_at_ms = Some(now_ms);
                    Some(CircuitState::Open)
                } else {
                    None
                }
            }
            // Concurrent invocations may both observe Closed and both fail;
            // the over-count is accepted (eventual consistency).
            CircuitState::Open => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                None
            }
        }
    }

    /// Administrative override: force Closed and clear counters.
    pub fn force_close(&mut self, now_ms: u64) -> Option<CircuitState> {
        let changed = self.state != CircuitState::Closed;
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.half_open_trial_in_flight = false;
        self.opened_at_ms = None;
        self.last_success_at_ms = Some(now_ms);
        changed.then_some(CircuitState::Closed)
    }

    fn observe_latency(&mut self, latency_ms: u64) {
        let sample = latency_ms as f64;
        if self.total_calls <= 1 {
            self.latency_ema_ms = sample;
        } else {
            self.latency_ema_ms =
                LATENCY_EMA_ALPHA * sample + (1.0 - LATENCY_EMA_ALPHA) * self.latency_ema_ms;
        }
    }
}
