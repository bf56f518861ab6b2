//! Tests for the sliding-window limiter.
//!
//! - sliding_window.rs: admission never exceeds the window bound
//! - backoff.rs: multiplier escalation, capping and reset

mod backoff;
mod sliding_window;

use billy_ratelimiter::{RateLimiterConfig, SlidingWindowLimiter};
use std::time::Duration;

/// A limiter without jitter so waits are exact under paused time.
pub fn limiter(max_requests: usize, window: Duration) -> SlidingWindowLimiter {
    RateLimiterConfig::builder()
        .max_requests(max_requests)
        .window(window)
        .jitter(1.0, 1.0)
        .min_wait(Duration::from_millis(10))
        .build_limiter()
}

/// Paused time advances to timer deadlines, which the driver rounds to
/// whole milliseconds.
#[track_caller]
pub fn assert_about(actual: Duration, expected: Duration) {
    let diff = if actual > expected { actual - expected } else { expected - actual };
    assert!(diff <= Duration::from_millis(2), "expected ~{expected:?}, got {actual:?}");
}
