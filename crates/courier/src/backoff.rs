//! Retry delay schedules
//!
//! Pure functions shared by the fetch and delivery retry loops, kept
//! free of I/O so they can be tested directly.

use std::time::Duration;

/// Delay before retrying after the given zero-based attempt: the base
/// delay doubled once per attempt, saturating instead of overflowing.
pub fn exponential_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Delay before retrying a rate-limited request. The server's
/// Retry-After hint wins when it asks for a longer wait than the
/// exponential schedule.
pub fn rate_limit_delay(base: Duration, attempt: u32, retry_after: Option<u64>) -> Duration {
    let delay = exponential_delay(base, attempt);
    match retry_after {
        Some(secs) => delay.max(Duration::from_secs(secs)),
        None => delay,
    }
}
