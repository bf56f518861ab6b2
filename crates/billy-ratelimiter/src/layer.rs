use crate::{RateLimiter, SlidingWindowLimiter};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that gates every call on a shared sliding window.
///
/// # Examples
///
/// ```
/// use billy_ratelimiter::RateLimiterConfig;
/// use tower::ServiceBuilder;
/// use std::time::Duration;
///
/// let layer = RateLimiterConfig::builder()
///     .max_requests(100)
///     .window(Duration::from_secs(60))
///     .build();
/// let limiter = layer.limiter().clone();
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(tower::service_fn(|req: String| async move {
///         Ok::<_, std::io::Error>(req)
///     }));
///
/// assert_eq!(limiter.stats().requests_in_window, 0);
/// # drop(service);
/// ```
#[derive(Clone)]
pub struct RateLimiterLayer {
    limiter: Arc<SlidingWindowLimiter>,
}

impl RateLimiterLayer {
    /// Wraps an existing limiter, e.g. one also queried for health stats.
    pub fn from_limiter(limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self { limiter }
    }

    /// The limiter shared by every service this layer produces.
    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiter<S>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimiter::new(service, Arc::clone(&self.limiter))
    }
}
