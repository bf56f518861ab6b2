//! Circuit breaker middleware for the Billy API client.
//!
//! The breaker tallies call outcomes over a bucketed rolling window (10
//! seconds in 10 buckets by default) and moves between three states:
//!
//! - **Closed**: calls flow through. Once at least `minimum_number_of_calls`
//!   executed calls are in the window and the share of failures and timeouts
//!   exceeds `failure_rate_threshold`, the circuit opens.
//! - **Open**: calls are rejected without touching the wrapped service. After
//!   `wait_duration_in_open` the next call becomes a probe.
//! - **HalfOpen**: exactly one probe is in flight. Its success closes the
//!   circuit; its failure reopens it. Other callers are rejected meanwhile.
//!
//! Every call runs under a hard `call_timeout`; an expired call counts as a
//! failure. A fallback can answer both rejected and failed calls.
//!
//! # Examples
//!
//! ```
//! use billy_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerError, FallbackCause};
//! use futures::FutureExt;
//! use tower::ServiceBuilder;
//! use std::time::Duration;
//!
//! #[derive(Debug, Clone)]
//! enum ApiError {
//!     Breaker(CircuitBreakerError),
//!     Upstream(String),
//! }
//!
//! impl From<CircuitBreakerError> for ApiError {
//!     fn from(err: CircuitBreakerError) -> Self {
//!         ApiError::Breaker(err)
//!     }
//! }
//!
//! let layer = CircuitBreakerConfig::<String, String, ApiError>::builder()
//!     .failure_rate_threshold(0.5)
//!     .minimum_number_of_calls(5)
//!     .wait_duration_in_open(Duration::from_secs(60))
//!     .call_timeout(Duration::from_secs(30))
//!     .fallback(|_req, cause| {
//!         async move {
//!             match cause {
//!                 FallbackCause::Rejected => Ok("cached".to_string()),
//!                 FallbackCause::Failed(err) => Err(err),
//!             }
//!         }
//!         .boxed()
//!     })
//!     .on_state_transition(|from, to| println!("circuit {from} -> {to}"))
//!     .build();
//! let handle = layer.handle();
//!
//! let service = ServiceBuilder::new()
//!     .layer(layer)
//!     .service(tower::service_fn(|req: String| async move { Ok::<_, ApiError>(req) }));
//!
//! println!("{:?}", handle.metrics());
//! # drop(service);
//! ```

mod circuit;
mod config;
mod error;
mod events;
mod layer;
mod window;

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder, FallbackCause};
pub use error::CircuitBreakerError;
pub use events::{CircuitBreakerEvent, FallbackReason};
pub use layer::{CircuitBreakerHandle, CircuitBreakerLayer};
pub use window::LatencySummary;

use crate::circuit::Circuit;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::time::Instant;
use tower::{Service, ServiceExt};

/// A Tower [`Service`] guarded by a circuit breaker.
pub struct CircuitBreaker<S, Req, Res, E> {
    inner: S,
    config: Arc<CircuitBreakerConfig<Req, Res, E>>,
    circuit: Arc<Mutex<Circuit>>,
}

impl<S, Req, Res, E> CircuitBreaker<S, Req, Res, E> {
    pub(crate) fn new(
        inner: S,
        config: Arc<CircuitBreakerConfig<Req, Res, E>>,
        circuit: Arc<Mutex<Circuit>>,
    ) -> Self {
        Self {
            inner,
            config,
            circuit,
        }
    }

    pub fn handle(&self) -> CircuitBreakerHandle {
        CircuitBreakerHandle::new(Arc::clone(&self.circuit), Arc::clone(&self.config.policy))
    }
}

impl<S: Clone, Req, Res, E> Clone for CircuitBreaker<S, Req, Res, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
            circuit: Arc::clone(&self.circuit),
        }
    }
}

/// Releases the half-open probe slot if a permitted call is dropped before
/// its outcome is recorded.
struct PermitGuard {
    circuit: Arc<Mutex<Circuit>>,
    armed: bool,
}

impl PermitGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PermitGuard {
    fn drop(&mut self) {
        if self.armed {
            self.circuit.lock().release_probe();
        }
    }
}

impl<S, Req, Res, E> Service<Req> for CircuitBreaker<S, Req, Res, E>
where
    S: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Clone + Send + 'static,
    Res: Send + 'static,
    E: From<CircuitBreakerError> + Send + 'static,
{
    type Response = Res;
    type Error = E;
    type Future = BoxFuture<'static, Result<Res, E>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Rejected calls must not wait on (or reserve) inner capacity, so the
        // inner service is readied inside the call, after the circuit agrees.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let config = Arc::clone(&self.config);
        let circuit = Arc::clone(&self.circuit);
        let inner = self.inner.clone();

        Box::pin(async move {
            let policy = &config.policy;
            let permitted = circuit.lock().try_acquire(policy);

            if !permitted {
                #[cfg(feature = "tracing")]
                tracing::debug!(circuitbreaker = %policy.name, "call rejected");

                return match &config.fallback {
                    Some(fallback) => {
                        circuit.lock().record_fallback(policy, FallbackReason::Rejected);
                        fallback(req, FallbackCause::Rejected).await
                    }
                    None => Err(E::from(CircuitBreakerError::OpenCircuit {
                        name: policy.name.clone(),
                    })),
                };
            }

            let guard = PermitGuard {
                circuit: Arc::clone(&circuit),
                armed: true,
            };
            let retry_req = config.fallback.as_ref().map(|_| req.clone());

            let started = Instant::now();
            let outcome = tokio::time::timeout(policy.call_timeout, inner.oneshot(req)).await;
            let latency = started.elapsed();

            let result = match outcome {
                Ok(result) => {
                    let failed = (config.failure_classifier)(&result);
                    {
                        let mut circuit = circuit.lock();
                        if failed {
                            circuit.record_failure(policy, latency);
                        } else {
                            circuit.record_success(policy, latency);
                        }
                    }
                    if !failed {
                        guard.disarm();
                        return result;
                    }
                    result
                }
                Err(_elapsed) => {
                    circuit.lock().record_timeout(policy, latency);

                    #[cfg(feature = "tracing")]
                    tracing::warn!(circuitbreaker = %policy.name, after = ?policy.call_timeout, "call timed out");

                    Err(E::from(CircuitBreakerError::Timeout {
                        after: policy.call_timeout,
                    }))
                }
            };
            guard.disarm();

            match (result, &config.fallback, retry_req) {
                (Err(err), Some(fallback), Some(req)) => {
                    circuit.lock().record_fallback(policy, FallbackReason::Failed);
                    fallback(req, FallbackCause::Failed(err)).await
                }
                (result, _, _) => result,
            }
        })
    }
}
