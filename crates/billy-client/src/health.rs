use billy_circuitbreaker::{CircuitMetrics, CircuitState};
use billy_ratelimiter::RateLimiterStats;
use serde::Serialize;
use std::time::Duration;

/// Snapshot served by health and monitoring endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    /// False while the circuit is open.
    pub healthy: bool,
    pub dry_run: bool,
    pub circuit: CircuitHealth,
    pub rate_limiter: RateLimiterStats,
    pub fallback_cache_size: usize,
    pub pending_requests: usize,
}

impl HealthStatus {
    pub(crate) fn new(
        circuit: CircuitMetrics,
        rate_limiter: RateLimiterStats,
        fallback_cache_size: usize,
        pending_requests: usize,
        dry_run: bool,
    ) -> Self {
        Self {
            healthy: circuit.state != CircuitState::Open,
            dry_run,
            circuit: CircuitHealth::from(circuit),
            rate_limiter,
            fallback_cache_size,
            pending_requests,
        }
    }
}

/// Circuit statistics over the rolling window, latencies in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitHealth {
    pub state: String,
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub rejects: u64,
    pub fallbacks: u64,
    pub failure_rate: f64,
    pub latency_mean_ms: f64,
    pub latency_p50_ms: f64,
    pub latency_p90_ms: f64,
    pub latency_p99_ms: f64,
    pub time_in_state_ms: u64,
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl From<CircuitMetrics> for CircuitHealth {
    fn from(metrics: CircuitMetrics) -> Self {
        Self {
            state: metrics.state.as_str().to_string(),
            requests: metrics.requests,
            successes: metrics.successes,
            failures: metrics.failures,
            timeouts: metrics.timeouts,
            rejects: metrics.rejects,
            fallbacks: metrics.fallbacks,
            failure_rate: metrics.failure_rate,
            latency_mean_ms: millis(metrics.latency.mean),
            latency_p50_ms: millis(metrics.latency.p50),
            latency_p90_ms: millis(metrics.latency.p90),
            latency_p99_ms: millis(metrics.latency.p99),
            time_in_state_ms: metrics.time_since_state_change.as_millis() as u64,
        }
    }
}
