//! Retry policy for claiming queue heads under contention.
//!
//! When two callers race for the same waiting patient, the loser's
//! compare-and-swap fails and it retries against the refreshed queue.
//! Backoff between attempts is exponential with jitter so concurrent
//! callers spread out instead of colliding again.

use std::time::Duration;

/// Retry policy for queue claim attempts.
///
/// # Default Values
///
/// - `max_attempts`: 5
/// - `initial_backoff`: 10ms
/// - `max_backoff`: 200ms
/// - `multiplier`: 2.0 (backoff doubles each attempt)
#[derive(Debug, Clone)]
pub struct ClaimRetry {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ClaimRetry {
    /// Create a policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(200),
            multiplier: 2.0,
        }
    }

    /// Set the maximum number of claim attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the backoff before the second attempt.
    #[must_use]
    pub const fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Set the backoff cap.
    #[must_use]
    pub const fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Set the exponential multiplier.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Calculate the backoff for a given attempt number (0-indexed).
    ///
    /// Uses exponential backoff with jitter:
    /// `delay = min(initial_backoff * multiplier^attempt, max_backoff) * random(0.5..=1.0)`
    ///
    /// Jitter prevents the thundering herd problem.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        use rand::Rng;

        // Cast is safe since max_attempts defaults to 5 (well within i32 range)
        #[allow(clippy::cast_possible_wrap)]
        let base_secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(attempt as i32);

        let capped_secs = base_secs.min(self.max_backoff.as_secs_f64());

        // Multiply by a random value between 0.5 and 1.0 to spread out
        // concurrent retries.
        let jitter = rand::thread_rng().gen_range(0.5..=1.0);

        Duration::from_secs_f64(capped_secs * jitter)
    }

    /// Get the maximum number of attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Check whether another attempt is allowed after `attempt` failures.
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for ClaimRetry {
    fn default() -> Self {
        Self::new()
    }
}
