use std::time::{Duration, Instant};

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls go through; `failures` counts consecutive failures.
    Closed { failures: u32 },
    /// Calls are refused until `reset_after` has passed since `since`.
    Open { since: Instant },
    /// One probe call is in flight.
    HalfOpen,
}

/// Pauses background sync after repeated failures, then lets a single
/// probe through once the reset period has passed.
///
/// Time is passed in by the caller so the state machine can be tested
/// without sleeping.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: u32,
    reset_after: Duration,
    state: BreakerState,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, reset_after: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            reset_after,
            state: BreakerState::Closed { failures: 0 },
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, BreakerState::Open { .. })
    }

    /// Whether a call may go out now. An open breaker past its reset
    /// period turns half-open and admits exactly one probe.
    pub fn allow(&mut self, now: Instant) -> bool {
        match self.state {
            BreakerState::Closed { .. } => true,
            BreakerState::HalfOpen => false,
            BreakerState::Open { since } => {
                if now.saturating_duration_since(since) >= self.reset_after {
                    self.state = BreakerState::HalfOpen;
                    info!("sync breaker half-open, probing");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&mut self) {
        if self.state != (BreakerState::Closed { failures: 0 }) {
            info!("sync breaker closed");
        }
        self.state = BreakerState::Closed { failures: 0 };
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.state = match self.state {
            BreakerState::Closed { failures } if failures + 1 < self.threshold => {
                BreakerState::Closed { failures: failures + 1 }
            }
            BreakerState::Closed { .. } | BreakerState::HalfOpen => {
                warn!(
                    threshold = self.threshold,
                    retry_in_secs = self.reset_after.as_secs(),
                    "sync breaker open"
                );
                BreakerState::Open { since: now }
            }
            open @ BreakerState::Open { .. } => open,
        };
    }
}
