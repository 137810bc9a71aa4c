//! In-process rate limiter applied to credential-guessing surfaces

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Failed attempts allowed inside one window before a ban
    pub max_attempts: u32,
    /// Window length in seconds
    pub window_seconds: u64,
    /// How long a key stays banned after exceeding the limit
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,
            ban_duration_seconds: 3600,
        }
    }
}

#[derive(Debug)]
struct AttemptRecord {
    attempts: u32,
    window_start: Instant,
    banned_until: Option<Instant>,
}

/// Sliding-window limiter keyed by an opaque identifier (email, username).
///
/// Only failed attempts count toward the limit; callers gate with [`check`],
/// report outcomes with [`record_failure`], and clear the record with
/// [`reset`] on success.
///
/// Process-local; a multi-instance deployment would need a shared backend,
/// which is acceptable for a brute-force slowdown.
///
/// [`check`]: RateLimiter::check
/// [`record_failure`]: RateLimiter::record_failure
/// [`reset`]: RateLimiter::reset
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    records: Arc<Mutex<HashMap<String, AttemptRecord>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Report whether `key` may attempt. Does not count the attempt.
    pub async fn check(&self, key: &str) -> bool {
        let mut records = self.records.lock().await;
        let now = Instant::now();

        let banned_until = match records.get(key) {
            None => return true,
            Some(record) => record.banned_until,
        };

        match banned_until {
            Some(until) if now < until => false,
            Some(_) => {
                records.remove(key);
                true
            }
            None => true,
        }
    }

    /// Count one failed attempt for `key`, banning once the limit is hit.
    pub async fn record_failure(&self, key: &str) {
        let mut records = self.records.lock().await;
        let now = Instant::now();

        let record = records.entry(key.to_string()).or_insert(AttemptRecord {
            attempts: 0,
            window_start: now,
            banned_until: None,
        });

        let ban_expired = record.banned_until.is_some_and(|until| now >= until);
        let window_expired = now.duration_since(record.window_start)
            >= Duration::from_secs(self.config.window_seconds);
        if ban_expired || window_expired {
            record.attempts = 0;
            record.window_start = now;
            record.banned_until = None;
        }

        record.attempts += 1;
        if record.attempts >= self.config.max_attempts && record.banned_until.is_none() {
            record.banned_until =
                Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            warn!(
                "Rate limit exceeded for {}, banned for {}s",
                key, self.config.ban_duration_seconds
            );
        }
    }

    /// Clear the failure record for `key` after a successful attempt.
    pub async fn reset(&self, key: &str) {
        self.records.lock().await.remove(key);
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}
