//! Configuration for the attendance engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::retry::ClaimRetry;
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Engine configuration loaded from environment variables.
///
/// Every field has a default that works for a single-process deployment;
/// `from_env` overrides them from `CAREFLOW_*` variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of claim attempts before `call_next` gives up
    /// (default: 5)
    pub max_claim_attempts: u32,
    /// Initial backoff between claim attempts, in milliseconds (default: 10)
    pub claim_backoff_ms: u64,
    /// Capacity of the record change broadcast feed, applied when the
    /// backing store is constructed (default: 64)
    pub change_feed_capacity: usize,
    /// Clinic offset from UTC in minutes, used for "today" boundaries and
    /// ticket sequence resets (default: 0)
    pub utc_offset_minutes: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_claim_attempts: 5,
            claim_backoff_ms: 10,
            change_feed_capacity: 64,
            utc_offset_minutes: 0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables that are unset or fail to parse fall back to defaults:
    /// `CAREFLOW_MAX_CLAIM_ATTEMPTS`, `CAREFLOW_CLAIM_BACKOFF_MS`,
    /// `CAREFLOW_CHANGE_FEED_CAPACITY`, `CAREFLOW_UTC_OFFSET_MINUTES`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_claim_attempts: env_parse(
                "CAREFLOW_MAX_CLAIM_ATTEMPTS",
                defaults.max_claim_attempts,
            ),
            claim_backoff_ms: env_parse("CAREFLOW_CLAIM_BACKOFF_MS", defaults.claim_backoff_ms),
            change_feed_capacity: env_parse(
                "CAREFLOW_CHANGE_FEED_CAPACITY",
                defaults.change_feed_capacity,
            ),
            utc_offset_minutes: env_parse(
                "CAREFLOW_UTC_OFFSET_MINUTES",
                defaults.utc_offset_minutes,
            ),
        }
    }

    /// Set the maximum number of claim attempts.
    #[must_use]
    pub const fn with_max_claim_attempts(mut self, attempts: u32) -> Self {
        self.max_claim_attempts = attempts;
        self
    }

    /// Set the initial claim backoff in milliseconds.
    #[must_use]
    pub const fn with_claim_backoff_ms(mut self, ms: u64) -> Self {
        self.claim_backoff_ms = ms;
        self
    }

    /// Set the change feed capacity.
    #[must_use]
    pub const fn with_change_feed_capacity(mut self, capacity: usize) -> Self {
        self.change_feed_capacity = capacity;
        self
    }

    /// Set the clinic offset from UTC in minutes.
    #[must_use]
    pub const fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// The clinic's fixed offset from UTC.
    ///
    /// Out-of-range offsets (beyond +/-24h) fall back to UTC rather than
    /// failing engine construction.
    #[must_use]
    pub fn clinic_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// The claim retry policy derived from this configuration.
    #[must_use]
    pub fn claim_retry(&self) -> ClaimRetry {
        ClaimRetry::new()
            .with_max_attempts(self.max_claim_attempts)
            .with_initial_backoff(Duration::from_millis(self.claim_backoff_ms))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
