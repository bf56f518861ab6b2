//! Sliding-window rate limiting for the Billy API client.
//!
//! The limiter admits at most `max_requests` calls inside any trailing
//! `window`. A caller that finds the window full does not fail: it sleeps for
//! the time until the oldest admission leaves the window, scaled by an
//! escalating backoff multiplier and a random jitter factor, and then checks
//! again.
//!
//! # Backoff
//!
//! - Each saturation event within `backoff_horizon` (60s) of the previous one
//!   multiplies the backoff by 1.5, capped at 8.
//! - A saturation event after a quieter period resets the multiplier to 1.
//! - Waits are jittered uniformly in `[0.75, 1.25]` and never shorter than
//!   one second.
//!
//! # Examples
//!
//! ```
//! use billy_ratelimiter::RateLimiterConfig;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let limiter = RateLimiterConfig::builder()
//!     .max_requests(100)
//!     .window(Duration::from_secs(60))
//!     .on_backoff(|wait, multiplier, in_window| {
//!         println!("backing off {wait:?} (x{multiplier}, {in_window} in window)");
//!     })
//!     .build_limiter();
//!
//! limiter.wait_if_needed().await;
//! assert_eq!(limiter.stats().requests_in_window, 1);
//! # }
//! ```

mod config;
mod events;
mod layer;
mod limiter;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use events::RateLimiterEvent;
pub use layer::RateLimiterLayer;
pub use limiter::{RateLimiterStats, SlidingWindowLimiter};

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};

/// A Tower [`Service`] that waits on the shared window before every call.
///
/// Readiness of the inner service is only awaited after admission, so a
/// caller sleeping on a saturated window holds no downstream capacity.
pub struct RateLimiter<S> {
    inner: S,
    limiter: Arc<SlidingWindowLimiter>,
}

impl<S> RateLimiter<S> {
    pub fn new(inner: S, limiter: Arc<SlidingWindowLimiter>) -> Self {
        Self { inner, limiter }
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }
}

impl<S> Clone for RateLimiter<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl<S, Req> Service<Req> for RateLimiter<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let limiter = Arc::clone(&self.limiter);
        let inner = self.inner.clone();

        Box::pin(async move {
            limiter.wait_if_needed().await;
            inner.oneshot(req).await
        })
    }
}
