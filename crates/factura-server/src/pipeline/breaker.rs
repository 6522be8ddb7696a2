//! Per-run circuit breaker for the exchange-rate dependency
//!
//! One instance is constructed for each job run and discarded at run end.
//! It is never shared across jobs, so a failing run cannot trip lookups
//! for unrelated batches.

/// Consecutive failures after which the breaker opens.
pub const BREAKER_THRESHOLD: u32 = 3;

/// Counts consecutive rate-lookup failures and latches open at the
/// threshold. Any intervening success resets the count.
#[derive(Debug)]
pub struct CircuitBreaker {
    consecutive_failures: u32,
    threshold: u32,
    tripped: bool,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::with_threshold(BREAKER_THRESHOLD)
    }

    pub fn with_threshold(threshold: u32) -> Self {
        Self {
            consecutive_failures: 0,
            threshold,
            tripped: false,
        }
    }

    /// A successful lookup resets the consecutive-failure count. Does not
    /// close an already tripped breaker; tripping is latching for the run.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Record a failed lookup; returns whether the breaker is now tripped.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.threshold {
            self.tripped = true;
        }
        self.tripped
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}
