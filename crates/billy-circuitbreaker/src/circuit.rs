use crate::config::CircuitPolicy;
use crate::events::{CircuitBreakerEvent, FallbackReason};
use crate::window::{LatencySummary, RollingWindow};
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CircuitState {
    /// Calls flow through and outcomes are tallied.
    Closed,
    /// Calls are rejected until the reset timeout elapses.
    Open,
    /// A single probe call is allowed through to test the upstream.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the breaker, taken without mutating it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircuitMetrics {
    pub state: CircuitState,
    /// Calls that reached the wrapped service inside the rolling window.
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub rejects: u64,
    pub fallbacks: u64,
    /// `(failures + timeouts) / requests`, or 0 without traffic.
    pub failure_rate: f64,
    pub latency: LatencySummary,
    pub time_since_state_change: Duration,
}

pub(crate) struct Circuit {
    state: CircuitState,
    last_state_change: Instant,
    window: RollingWindow,
    probe_in_flight: bool,
}

impl Circuit {
    pub(crate) fn new(policy: &CircuitPolicy) -> Self {
        Self {
            state: CircuitState::Closed,
            last_state_change: Instant::now(),
            window: RollingWindow::new(policy.rolling_window, policy.rolling_buckets),
            probe_in_flight: false,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn metrics(&self) -> CircuitMetrics {
        let now = Instant::now();
        let counts = self.window.counts(now);
        CircuitMetrics {
            state: self.state,
            requests: counts.executed(),
            successes: counts.successes,
            failures: counts.failures,
            timeouts: counts.timeouts,
            rejects: counts.rejects,
            fallbacks: counts.fallbacks,
            failure_rate: counts.failure_rate(),
            latency: self.window.latency(now),
            time_since_state_change: now.saturating_duration_since(self.last_state_change),
        }
    }

    /// Decides whether a call may proceed. Moves Open to HalfOpen once the
    /// reset timeout has elapsed, and hands out at most one probe at a time.
    pub(crate) fn try_acquire(&mut self, policy: &CircuitPolicy) -> bool {
        let now = Instant::now();
        let permitted = match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if now.saturating_duration_since(self.last_state_change) >= policy.wait_duration_in_open {
                    self.transition_to(CircuitState::HalfOpen, policy);
                    self.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    false
                } else {
                    self.probe_in_flight = true;
                    true
                }
            }
        };

        if !permitted {
            self.window.record_reject(now);
            policy.event_listeners.emit(&CircuitBreakerEvent::CallRejected {
                pattern_name: policy.name.clone(),
                timestamp: now,
                state: self.state,
            });

            #[cfg(feature = "metrics")]
            counter!("circuitbreaker_calls_total", "circuitbreaker" => policy.name.clone(), "outcome" => "rejected").increment(1);
        }
        permitted
    }

    pub(crate) fn record_success(&mut self, policy: &CircuitPolicy, latency: Duration) {
        let now = Instant::now();
        self.window.record_success(now, latency);
        policy.event_listeners.emit(&CircuitBreakerEvent::SuccessRecorded {
            pattern_name: policy.name.clone(),
            timestamp: now,
            latency,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => policy.name.clone(), "outcome" => "success").increment(1);

        if self.state == CircuitState::HalfOpen {
            self.transition_to(CircuitState::Closed, policy);
        }
    }

    pub(crate) fn record_failure(&mut self, policy: &CircuitPolicy, latency: Duration) {
        let now = Instant::now();
        self.window.record_failure(now, latency);
        policy.event_listeners.emit(&CircuitBreakerEvent::FailureRecorded {
            pattern_name: policy.name.clone(),
            timestamp: now,
            latency,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => policy.name.clone(), "outcome" => "failure").increment(1);

        self.after_failure(policy, now);
    }

    pub(crate) fn record_timeout(&mut self, policy: &CircuitPolicy, latency: Duration) {
        let now = Instant::now();
        self.window.record_timeout(now, latency);
        policy.event_listeners.emit(&CircuitBreakerEvent::TimeoutRecorded {
            pattern_name: policy.name.clone(),
            timestamp: now,
            after: policy.call_timeout,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => policy.name.clone(), "outcome" => "timeout").increment(1);

        self.after_failure(policy, now);
    }

    pub(crate) fn record_fallback(&mut self, policy: &CircuitPolicy, reason: FallbackReason) {
        let now = Instant::now();
        self.window.record_fallback(now);
        policy.event_listeners.emit(&CircuitBreakerEvent::FallbackInvoked {
            pattern_name: policy.name.clone(),
            timestamp: now,
            reason,
        });
    }

    /// Frees the half-open probe slot when the probe was dropped before it
    /// produced an outcome.
    pub(crate) fn release_probe(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.probe_in_flight = false;
        }
    }

    fn after_failure(&mut self, policy: &CircuitPolicy, now: Instant) {
        match self.state {
            CircuitState::HalfOpen => self.transition_to(CircuitState::Open, policy),
            CircuitState::Closed => {
                let counts = self.window.counts(now);
                if counts.executed() >= policy.minimum_number_of_calls
                    && counts.failure_rate() > policy.failure_rate_threshold
                {
                    self.transition_to(CircuitState::Open, policy);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub(crate) fn force_open(&mut self, policy: &CircuitPolicy) {
        self.transition_to(CircuitState::Open, policy);
    }

    pub(crate) fn force_closed(&mut self, policy: &CircuitPolicy) {
        self.transition_to(CircuitState::Closed, policy);
    }

    /// Closes the circuit and forgets every recorded outcome.
    pub(crate) fn reset(&mut self, policy: &CircuitPolicy) {
        self.transition_to(CircuitState::Closed, policy);
        self.window.clear();
        self.probe_in_flight = false;
    }

    fn transition_to(&mut self, state: CircuitState, policy: &CircuitPolicy) {
        if self.state == state {
            return;
        }

        let from_state = self.state;
        let now = Instant::now();

        #[cfg(feature = "tracing")]
        tracing::debug!(circuitbreaker = %policy.name, from = %from_state, to = %state, "circuit state transition");

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => policy.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);
            gauge!("circuitbreaker_state", "circuitbreaker" => policy.name.clone()).set(match state {
                CircuitState::Closed => 0.0,
                CircuitState::Open => 1.0,
                CircuitState::HalfOpen => 2.0,
            });
        }

        self.state = state;
        self.last_state_change = now;
        self.probe_in_flight = false;
        self.window.clear();

        policy.event_listeners.emit(&CircuitBreakerEvent::StateTransition {
            pattern_name: policy.name.clone(),
            timestamp: now,
            from_state,
            to_state: state,
        });
    }
}
