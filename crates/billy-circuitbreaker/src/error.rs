use std::time::Duration;
use thiserror::Error;

/// Failures produced by the breaker itself.
///
/// The wrapped service's error type must be constructible from this, so the
/// breaker can report rejections and timeouts in the caller's own error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitBreakerError {
    /// The circuit is open (or a half-open probe is already in flight).
    #[error("circuit '{name}' is open; call not permitted")]
    OpenCircuit { name: String },

    /// The call did not complete within the breaker's call timeout.
    #[error("call timed out after {after:?}")]
    Timeout { after: Duration },
}

impl CircuitBreakerError {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::OpenCircuit { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CircuitBreakerError::Timeout { .. })
    }
}
