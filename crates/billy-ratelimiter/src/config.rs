use crate::events::RateLimiterEvent;
use crate::limiter::SlidingWindowLimiter;
use crate::RateLimiterLayer;
use billy_resilience_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the sliding-window rate limiter.
pub struct RateLimiterConfig {
    pub(crate) max_requests: usize,
    pub(crate) window: Duration,
    pub(crate) backoff_horizon: Duration,
    pub(crate) backoff_factor: f64,
    pub(crate) max_backoff_multiplier: f64,
    pub(crate) min_wait: Duration,
    pub(crate) jitter: (f64, f64),
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
    pub(crate) name: String,
}

impl RateLimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    max_requests: usize,
    window: Duration,
    backoff_horizon: Duration,
    backoff_factor: f64,
    max_backoff_multiplier: f64,
    min_wait: Duration,
    jitter: (f64, f64),
    event_listeners: EventListeners<RateLimiterEvent>,
    name: String,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_requests: 100
    /// - window: 60 seconds
    /// - backoff_horizon: 60 seconds
    /// - backoff_factor: 1.5, capped at 8
    /// - min_wait: 1 second
    /// - jitter: uniform in `[0.75, 1.25]`
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            backoff_horizon: Duration::from_secs(60),
            backoff_factor: 1.5,
            max_backoff_multiplier: 8.0,
            min_wait: Duration::from_secs(1),
            jitter: (0.75, 1.25),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Maximum number of admissions inside any trailing window.
    pub fn max_requests(mut self, max: usize) -> Self {
        self.max_requests = max.max(1);
        self
    }

    /// Length of the sliding window.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Saturation events closer together than this escalate the backoff
    /// multiplier. A longer quiet period resets it to 1.
    pub fn backoff_horizon(mut self, horizon: Duration) -> Self {
        self.backoff_horizon = horizon;
        self
    }

    /// Growth factor applied per escalating saturation event.
    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor.max(1.0);
        self
    }

    /// Upper bound for the backoff multiplier.
    pub fn max_backoff_multiplier(mut self, max: f64) -> Self {
        self.max_backoff_multiplier = max.max(1.0);
        self
    }

    /// Floor applied to every computed wait.
    pub fn min_wait(mut self, min_wait: Duration) -> Self {
        self.min_wait = min_wait;
        self
    }

    /// Bounds of the uniform jitter factor applied to every computed wait.
    pub fn jitter(mut self, low: f64, high: f64) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        self.jitter = (low.max(0.0), high.max(0.0));
        self
    }

    /// Sets the name for this limiter instance (used in events).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked every time a caller is admitted, with
    /// the total time it spent waiting.
    pub fn on_permit_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::PermitAcquired { waited, .. } = event {
                f(*waited);
            }
        }));
        self
    }

    /// Registers a callback invoked before a caller sleeps on a saturated
    /// window.
    ///
    /// # Callback Signature
    /// `Fn(Duration, f64, usize)` - the chosen wait, the backoff multiplier
    /// that produced it and the number of requests currently in the window.
    pub fn on_backoff<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration, f64, usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::Backoff {
                wait,
                multiplier,
                requests_in_window,
                ..
            } = event
            {
                f(*wait, *multiplier, *requests_in_window);
            }
        }));
        self
    }

    fn into_config(self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_requests: self.max_requests,
            window: self.window,
            backoff_horizon: self.backoff_horizon,
            backoff_factor: self.backoff_factor,
            max_backoff_multiplier: self.max_backoff_multiplier,
            min_wait: self.min_wait,
            jitter: self.jitter,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds a standalone limiter.
    pub fn build_limiter(self) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(self.into_config())
    }

    /// Builds a layer. Every service produced by the layer shares one window.
    pub fn build(self) -> RateLimiterLayer {
        RateLimiterLayer::from_limiter(std::sync::Arc::new(self.build_limiter()))
    }
}
