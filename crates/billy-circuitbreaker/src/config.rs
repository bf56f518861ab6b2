use crate::circuit::CircuitState;
use crate::events::{CircuitBreakerEvent, FallbackReason};
use crate::layer::CircuitBreakerLayer;
use billy_resilience_core::events::{EventListeners, FnListener};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

/// Why the fallback is being asked to answer a request.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackCause<E> {
    /// The breaker refused the call without contacting the service.
    Rejected,
    /// The call was made and failed with this error (timeouts included).
    Failed(E),
}

impl<E> FallbackCause<E> {
    pub fn reason(&self) -> FallbackReason {
        match self {
            FallbackCause::Rejected => FallbackReason::Rejected,
            FallbackCause::Failed(_) => FallbackReason::Failed,
        }
    }
}

pub(crate) type FailureClassifier<Res, E> = dyn Fn(&Result<Res, E>) -> bool + Send + Sync;
pub(crate) type FallbackFn<Req, Res, E> =
    dyn Fn(Req, FallbackCause<E>) -> BoxFuture<'static, Result<Res, E>> + Send + Sync;

/// Thresholds and timing that drive the state machine.
pub(crate) struct CircuitPolicy {
    pub(crate) failure_rate_threshold: f64,
    pub(crate) minimum_number_of_calls: u64,
    pub(crate) rolling_window: Duration,
    pub(crate) rolling_buckets: u32,
    pub(crate) wait_duration_in_open: Duration,
    pub(crate) call_timeout: Duration,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl Default for CircuitPolicy {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            minimum_number_of_calls: 5,
            rolling_window: Duration::from_secs(10),
            rolling_buckets: 10,
            wait_duration_in_open: Duration::from_secs(60),
            call_timeout: Duration::from_secs(30),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }
}

/// Configuration for the circuit breaker.
pub struct CircuitBreakerConfig<Req, Res, E> {
    pub(crate) policy: Arc<CircuitPolicy>,
    pub(crate) failure_classifier: Arc<FailureClassifier<Res, E>>,
    pub(crate) fallback: Option<Arc<FallbackFn<Req, Res, E>>>,
}

impl<Req, Res: 'static, E: 'static> CircuitBreakerConfig<Req, Res, E> {
    pub fn builder() -> CircuitBreakerConfigBuilder<Req, Res, E> {
        CircuitBreakerConfigBuilder::new()
    }
}

impl<Req, Res, E> CircuitBreakerConfig<Req, Res, E> {
    pub fn name(&self) -> &str {
        &self.policy.name
    }

    pub fn call_timeout(&self) -> Duration {
        self.policy.call_timeout
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder<Req, Res, E> {
    policy: CircuitPolicy,
    failure_classifier: Arc<FailureClassifier<Res, E>>,
    fallback: Option<Arc<FallbackFn<Req, Res, E>>>,
}

impl<Req, Res: 'static, E: 'static> Default for CircuitBreakerConfigBuilder<Req, Res, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res: 'static, E: 'static> CircuitBreakerConfigBuilder<Req, Res, E> {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - failure_rate_threshold: 0.5
    /// - minimum_number_of_calls: 5
    /// - rolling_window: 10 seconds in 10 buckets
    /// - wait_duration_in_open: 60 seconds
    /// - call_timeout: 30 seconds
    /// - failure_classifier: any `Err`
    /// - no fallback
    pub fn new() -> Self {
        Self {
            policy: CircuitPolicy::default(),
            failure_classifier: Arc::new(|result: &Result<Res, E>| result.is_err()),
            fallback: None,
        }
    }

    /// Share of failed calls (failures plus timeouts over executed calls) a
    /// closed circuit tolerates; any higher rate opens it. Clamped to
    /// `0.0..=1.0`.
    pub fn failure_rate_threshold(mut self, threshold: f64) -> Self {
        self.policy.failure_rate_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Executed calls required in the window before the failure rate is
    /// evaluated at all.
    pub fn minimum_number_of_calls(mut self, calls: u64) -> Self {
        self.policy.minimum_number_of_calls = calls.max(1);
        self
    }

    /// Length of the rolling statistics window.
    pub fn rolling_window(mut self, window: Duration) -> Self {
        self.policy.rolling_window = window;
        self
    }

    /// Number of buckets the rolling window is split into.
    pub fn rolling_buckets(mut self, buckets: u32) -> Self {
        self.policy.rolling_buckets = buckets.max(1);
        self
    }

    /// How long the circuit stays open before a probe is allowed.
    pub fn wait_duration_in_open(mut self, duration: Duration) -> Self {
        self.policy.wait_duration_in_open = duration;
        self
    }

    /// Hard deadline for each call, independent of the service's own
    /// timeouts. An expired call counts as a failure.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.policy.call_timeout = timeout;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.policy.name = name.into();
        self
    }

    /// Decides which outcomes count as failures.
    ///
    /// Outcomes classified as successes are still returned as-is; an `Err`
    /// classified as a success is passed through without running the
    /// fallback.
    pub fn failure_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&Result<Res, E>) -> bool + Send + Sync + 'static,
    {
        self.failure_classifier = Arc::new(classifier);
        self
    }

    /// Answers rejected calls and calls that failed.
    ///
    /// Without a fallback, rejections surface as
    /// [`CircuitBreakerError::OpenCircuit`](crate::CircuitBreakerError) and
    /// failures as the service's own error.
    pub fn fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(Req, FallbackCause<E>) -> BoxFuture<'static, Result<Res, E>> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Registers a callback invoked synchronously on every state change.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.policy.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::StateTransition {
                from_state,
                to_state,
                ..
            } = event
            {
                f(*from_state, *to_state);
            }
        }));
        self
    }

    /// Registers a callback invoked when a call is refused.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.policy.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::CallRejected { state, .. } = event {
                f(*state);
            }
        }));
        self
    }

    /// Registers a callback invoked when a call exceeds the call timeout.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.policy.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::TimeoutRecorded { after, .. } = event {
                f(*after);
            }
        }));
        self
    }

    /// Registers a callback invoked before the fallback runs.
    pub fn on_fallback<F>(mut self, f: F) -> Self
    where
        F: Fn(FallbackReason) + Send + Sync + 'static,
    {
        self.policy.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::FallbackInvoked { reason, .. } = event {
                f(*reason);
            }
        }));
        self
    }

    pub fn build_config(self) -> CircuitBreakerConfig<Req, Res, E> {
        CircuitBreakerConfig {
            policy: Arc::new(self.policy),
            failure_classifier: self.failure_classifier,
            fallback: self.fallback,
        }
    }

    /// Builds the layer. All services it produces share one circuit.
    pub fn build(self) -> CircuitBreakerLayer<Req, Res, E> {
        CircuitBreakerLayer::new(self.build_config())
    }
}
