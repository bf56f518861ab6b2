use crate::FallbackCache;
use futures::future::BoxFuture;
use std::hash::Hash;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

type KeyFn<Req, K> = dyn Fn(&Req) -> Option<K> + Send + Sync;
type ValueFn<Res, V> = dyn Fn(&Res) -> Option<V> + Send + Sync;

/// A Tower [`Layer`] that records successful responses into a
/// [`FallbackCache`].
///
/// `key_fn` decides which requests are cacheable (returning `None` skips the
/// request) and `value_fn` decides which responses count as last-known-good.
/// The layer never serves from the cache; it only fills it.
///
/// # Examples
///
/// ```
/// use billy_fallback_cache::{FallbackCache, FallbackCacheConfig, FallbackCacheLayer};
/// use tower::ServiceBuilder;
///
/// let cache: FallbackCache<String, String> = FallbackCacheConfig::builder().build();
/// let layer = FallbackCacheLayer::new(
///     cache.clone(),
///     |req: &String| req.starts_with("GET ").then(|| req.clone()),
///     |res: &String| Some(res.clone()),
/// );
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(tower::service_fn(|req: String| async move {
///         Ok::<_, std::io::Error>(req)
///     }));
/// # drop(service);
/// ```
pub struct FallbackCacheLayer<Req, Res, K, V> {
    cache: FallbackCache<K, V>,
    key_fn: Arc<KeyFn<Req, K>>,
    value_fn: Arc<ValueFn<Res, V>>,
}

impl<Req, Res, K, V> FallbackCacheLayer<Req, Res, K, V> {
    pub fn new<KF, VF>(cache: FallbackCache<K, V>, key_fn: KF, value_fn: VF) -> Self
    where
        KF: Fn(&Req) -> Option<K> + Send + Sync + 'static,
        VF: Fn(&Res) -> Option<V> + Send + Sync + 'static,
    {
        Self {
            cache,
            key_fn: Arc::new(key_fn),
            value_fn: Arc::new(value_fn),
        }
    }
}

impl<Req, Res, K, V> Clone for FallbackCacheLayer<Req, Res, K, V> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            key_fn: Arc::clone(&self.key_fn),
            value_fn: Arc::clone(&self.value_fn),
        }
    }
}

impl<S, Req, Res, K, V> Layer<S> for FallbackCacheLayer<Req, Res, K, V> {
    type Service = FallbackCacheRecorder<S, Req, Res, K, V>;

    fn layer(&self, inner: S) -> Self::Service {
        FallbackCacheRecorder {
            inner,
            cache: self.cache.clone(),
            key_fn: Arc::clone(&self.key_fn),
            value_fn: Arc::clone(&self.value_fn),
        }
    }
}

/// Service produced by [`FallbackCacheLayer`].
pub struct FallbackCacheRecorder<S, Req, Res, K, V> {
    inner: S,
    cache: FallbackCache<K, V>,
    key_fn: Arc<KeyFn<Req, K>>,
    value_fn: Arc<ValueFn<Res, V>>,
}

impl<S: Clone, Req, Res, K, V> Clone for FallbackCacheRecorder<S, Req, Res, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            cache: self.cache.clone(),
            key_fn: Arc::clone(&self.key_fn),
            value_fn: Arc::clone(&self.value_fn),
        }
    }
}

impl<S, Req, Res, K, V> Service<Req> for FallbackCacheRecorder<S, Req, Res, K, V>
where
    S: Service<Req, Response = Res>,
    S::Future: Send + 'static,
    Res: Send + 'static,
    S::Error: Send + 'static,
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    type Response = Res;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Res, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = (self.key_fn)(&req);
        let cache = self.cache.clone();
        let value_fn = Arc::clone(&self.value_fn);
        let fut = self.inner.call(req);

        Box::pin(async move {
            let response = fut.await?;
            if let Some(key) = key {
                if let Some(value) = value_fn(&response) {
                    cache.set(key, value);
                }
            }
            Ok(response)
        })
    }
}
