//! Reconnect backoff: exponential with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay before reconnect attempt `attempt` (1-based), capped at `max_ms`
/// plus up to 10% jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(exponential).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

/// Attempt counter driving `calculate_backoff`.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    base_ms: u64,
    max_ms: u64,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            attempt: 0,
            base_ms,
            max_ms,
        }
    }

    /// Delay for the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        calculate_backoff(self.attempt, self.base_ms, self.max_ms)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
