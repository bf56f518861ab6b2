//! The resilience stack every live call goes through.
//!
//! ```text
//! RateLimiter -> Coalesce -> CircuitBreaker -> FallbackCache recorder -> ConcurrencyLimit -> transport
//! ```
//!
//! The breaker's fallback reads the same cache the recorder fills, so a GET
//! that succeeded recently can still be answered while the circuit is open.

use crate::config::ResilienceSettings;
use crate::error::BillyError;
use crate::request::{ApiRequest, ApiResponse};
use billy_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerHandle, CircuitState, FallbackCause};
use billy_coalesce::{CoalesceLayer, RequestDeduplicator};
use billy_fallback_cache::{FallbackCache, FallbackCacheConfig, FallbackCacheLayer};
use billy_ratelimiter::{RateLimiterConfig, RateLimiterLayer, SlidingWindowLimiter};
use futures::FutureExt;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower::util::BoxCloneSyncService;
use tower::{Service, ServiceBuilder};
use tracing::{info, warn};

pub(crate) type BoxedService = BoxCloneSyncService<ApiRequest, ApiResponse, BillyError>;
pub(crate) type ResponseCache = FallbackCache<String, ApiResponse>;
pub(crate) type Deduplicator = RequestDeduplicator<String, ApiResponse, BillyError>;

const PIPELINE_NAME: &str = "billy";

/// The composed service plus handles onto each component's shared state.
#[derive(Clone)]
pub(crate) struct Pipeline {
    pub(crate) service: BoxedService,
    pub(crate) limiter: Arc<SlidingWindowLimiter>,
    pub(crate) dedup: Arc<Deduplicator>,
    pub(crate) breaker: CircuitBreakerHandle,
    pub(crate) cache: ResponseCache,
}

impl Pipeline {
    pub(crate) fn new<T>(settings: &ResilienceSettings, transport: T) -> Self
    where
        T: Service<ApiRequest, Response = ApiResponse, Error = BillyError> + Clone + Send + Sync + 'static,
        T::Future: Send + 'static,
    {
        let limiter = Arc::new(
            RateLimiterConfig::builder()
                .name(PIPELINE_NAME)
                .max_requests(settings.rate_limit.max_requests)
                .window(settings.rate_limit.window())
                .build_limiter(),
        );

        let cache: ResponseCache = FallbackCacheConfig::builder()
            .name(PIPELINE_NAME)
            .capacity(settings.cache.capacity)
            .freshness(settings.cache.freshness())
            .build();

        let dedup = Arc::new(Deduplicator::named(PIPELINE_NAME));

        let fallback_cache = cache.clone();
        let breaker = CircuitBreakerConfig::<ApiRequest, ApiResponse, BillyError>::builder()
            .name(PIPELINE_NAME)
            .failure_rate_threshold(settings.circuit.failure_rate_threshold())
            .minimum_number_of_calls(settings.circuit.volume_threshold)
            .rolling_window(settings.circuit.rolling_window())
            .rolling_buckets(settings.circuit.rolling_buckets)
            .wait_duration_in_open(settings.circuit.reset_timeout())
            .call_timeout(settings.circuit.call_timeout())
            .on_state_transition(log_transition)
            .fallback(move |request, cause| {
                let outcome = serve_from_cache(&fallback_cache, &request, cause);
                async move { outcome }.boxed()
            })
            .build();
        let breaker_handle = breaker.handle();

        let recorder = FallbackCacheLayer::new(
            cache.clone(),
            |request: &ApiRequest| request.cache_key(),
            |response: &ApiResponse| response.is_success().then(|| response.clone()),
        );

        let stack = ServiceBuilder::new()
            .layer(RateLimiterLayer::from_limiter(Arc::clone(&limiter)))
            .layer(CoalesceLayer::with_deduplicator(
                Arc::clone(&dedup),
                ApiRequest::dedup_key as fn(&ApiRequest) -> String,
            ))
            .layer(breaker)
            .layer(recorder)
            .layer(ConcurrencyLimitLayer::new(settings.transport.max_connections.max(1)))
            .service(transport);

        Self {
            service: BoxCloneSyncService::new(stack),
            limiter,
            dedup,
            breaker: breaker_handle,
            cache,
        }
    }
}

/// Answers a call the breaker rejected or that failed transiently.
///
/// A fresh cached response wins for reads. Otherwise a rejection becomes
/// [`BillyError::Unavailable`] and a failure keeps its own error.
fn serve_from_cache(
    cache: &ResponseCache,
    request: &ApiRequest,
    cause: FallbackCause<BillyError>,
) -> Result<ApiResponse, BillyError> {
    if let Some(entry) = request.cache_key().and_then(|key| cache.get(&key)) {
        warn!(
            method = %request.method,
            endpoint = %request.endpoint,
            age_ms = entry.age().as_millis() as u64,
            "Billy API unavailable, serving cached response"
        );
        return Ok(entry.value);
    }

    match cause {
        FallbackCause::Rejected => Err(BillyError::Unavailable {
            method: request.method.to_string(),
            endpoint: request.endpoint.clone(),
        }),
        FallbackCause::Failed(err) => Err(err.with_context(request.method.as_str(), &request.endpoint)),
    }
}

fn log_transition(from: CircuitState, to: CircuitState) {
    match to {
        CircuitState::Open => warn!(%from, "Billy API circuit opened"),
        CircuitState::HalfOpen => info!(%from, "Billy API circuit half-open, probing"),
        CircuitState::Closed => info!(%from, "Billy API circuit closed"),
    }
}
