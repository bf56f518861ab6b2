use crate::circuit::{Circuit, CircuitMetrics, CircuitState};
use crate::config::{CircuitBreakerConfig, CircuitPolicy};
use crate::CircuitBreaker;
use parking_lot::Mutex;
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that wraps services in a circuit breaker.
///
/// The circuit is created with the layer, so every service the layer
/// produces (and every clone of those) shares one state machine. Use
/// [`handle`](Self::handle) to observe or administer it from outside the
/// service stack.
pub struct CircuitBreakerLayer<Req, Res, E> {
    config: Arc<CircuitBreakerConfig<Req, Res, E>>,
    circuit: Arc<Mutex<Circuit>>,
}

impl<Req, Res, E> CircuitBreakerLayer<Req, Res, E> {
    pub fn new(config: CircuitBreakerConfig<Req, Res, E>) -> Self {
        let circuit = Circuit::new(&config.policy);
        Self {
            config: Arc::new(config),
            circuit: Arc::new(Mutex::new(circuit)),
        }
    }

    pub fn handle(&self) -> CircuitBreakerHandle {
        CircuitBreakerHandle {
            circuit: Arc::clone(&self.circuit),
            policy: Arc::clone(&self.config.policy),
        }
    }
}

impl<Req, Res, E> Clone for CircuitBreakerLayer<Req, Res, E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            circuit: Arc::clone(&self.circuit),
        }
    }
}

impl<S, Req, Res, E> Layer<S> for CircuitBreakerLayer<Req, Res, E> {
    type Service = CircuitBreaker<S, Req, Res, E>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(service, Arc::clone(&self.config), Arc::clone(&self.circuit))
    }
}

/// Out-of-band access to a shared circuit: health snapshots and the
/// administrative overrides.
#[derive(Clone)]
pub struct CircuitBreakerHandle {
    circuit: Arc<Mutex<Circuit>>,
    policy: Arc<CircuitPolicy>,
}

impl CircuitBreakerHandle {
    pub(crate) fn new(circuit: Arc<Mutex<Circuit>>, policy: Arc<CircuitPolicy>) -> Self {
        Self { circuit, policy }
    }

    pub fn name(&self) -> &str {
        &self.policy.name
    }

    pub fn state(&self) -> CircuitState {
        self.circuit.lock().state()
    }

    pub fn metrics(&self) -> CircuitMetrics {
        self.circuit.lock().metrics()
    }

    /// Closes the circuit and discards the rolling window.
    pub fn reset(&self) {
        self.circuit.lock().reset(&self.policy);
    }

    pub fn force_open(&self) {
        self.circuit.lock().force_open(&self.policy);
    }

    pub fn force_closed(&self) {
        self.circuit.lock().force_closed(&self.policy);
    }
}

impl std::fmt::Debug for CircuitBreakerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerHandle")
            .field("name", &self.policy.name)
            .field("state", &self.state())
            .finish()
    }
}
