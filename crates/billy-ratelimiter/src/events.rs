use billy_resilience_core::ResilienceEvent;
use std::time::Duration;
use tokio::time::Instant;

/// Events emitted by the sliding-window limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A caller was admitted and its timestamp recorded.
    PermitAcquired {
        pattern_name: String,
        timestamp: Instant,
        waited: Duration,
    },
    /// The window was saturated and the caller is about to sleep.
    Backoff {
        pattern_name: String,
        timestamp: Instant,
        wait: Duration,
        multiplier: f64,
        requests_in_window: usize,
    },
}

impl ResilienceEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::PermitAcquired { .. } => "permit_acquired",
            RateLimiterEvent::Backoff { .. } => "backoff",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::PermitAcquired { timestamp, .. }
            | RateLimiterEvent::Backoff { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            RateLimiterEvent::PermitAcquired { pattern_name, .. }
            | RateLimiterEvent::Backoff { pattern_name, .. } => pattern_name,
        }
    }
}
