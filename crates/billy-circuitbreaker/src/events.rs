use crate::circuit::CircuitState;
use billy_resilience_core::ResilienceEvent;
use std::time::Duration;
use tokio::time::Instant;

/// Why a fallback ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The breaker refused the call.
    Rejected,
    /// The call was made and failed (error or timeout).
    Failed,
}

/// Events emitted by the circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    StateTransition {
        pattern_name: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    CallRejected {
        pattern_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    SuccessRecorded {
        pattern_name: String,
        timestamp: Instant,
        latency: Duration,
    },
    FailureRecorded {
        pattern_name: String,
        timestamp: Instant,
        latency: Duration,
    },
    TimeoutRecorded {
        pattern_name: String,
        timestamp: Instant,
        after: Duration,
    },
    FallbackInvoked {
        pattern_name: String,
        timestamp: Instant,
        reason: FallbackReason,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
            CircuitBreakerEvent::TimeoutRecorded { .. } => "timeout_recorded",
            CircuitBreakerEvent::FallbackInvoked { .. } => "fallback_invoked",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. }
            | CircuitBreakerEvent::TimeoutRecorded { timestamp, .. }
            | CircuitBreakerEvent::FallbackInvoked { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { pattern_name, .. }
            | CircuitBreakerEvent::CallRejected { pattern_name, .. }
            | CircuitBreakerEvent::SuccessRecorded { pattern_name, .. }
            | CircuitBreakerEvent::FailureRecorded { pattern_name, .. }
            | CircuitBreakerEvent::TimeoutRecorded { pattern_name, .. }
            | CircuitBreakerEvent::FallbackInvoked { pattern_name, .. } => pattern_name,
        }
    }
}
