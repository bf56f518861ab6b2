//! Layer implementation for request deduplication.

use crate::{CoalesceConfig, CoalesceService, RequestDeduplicator};
use std::hash::Hash;
use std::sync::Arc;
use tower::Layer;

/// A Tower layer that deduplicates concurrent identical requests.
///
/// Every service produced by one layer shares one in-flight registry, so
/// clones of the stack collapse calls together.
///
/// # Example
///
/// ```rust
/// use billy_coalesce::CoalesceLayer;
/// use tower::ServiceBuilder;
///
/// # #[derive(Debug, Clone)]
/// # struct MyError;
/// let layer = CoalesceLayer::<String, String, MyError, _>::new(|req: &String| req.clone());
/// let registry = layer.deduplicator().clone();
///
/// let service = ServiceBuilder::new()
///     .layer(layer)
///     .service(tower::service_fn(|req: String| async move { Ok::<_, MyError>(req) }));
///
/// assert_eq!(registry.pending_count(), 0);
/// # drop(service);
/// ```
pub struct CoalesceLayer<K: Hash + Eq, T, E, F> {
    key_extractor: Arc<F>,
    dedup: Arc<RequestDeduplicator<K, T, E>>,
}

impl<K, T, E, F> CoalesceLayer<K, T, E, F>
where
    K: Hash + Eq + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new(key_extractor: F) -> Self {
        Self::with_config(CoalesceConfig::new(key_extractor))
    }

    pub fn with_config(config: CoalesceConfig<F>) -> Self {
        Self {
            key_extractor: Arc::new(config.key_extractor),
            dedup: Arc::new(RequestDeduplicator::named(config.name)),
        }
    }

    /// Builds a layer around an existing registry, e.g. one that is also
    /// queried for its pending count.
    pub fn with_deduplicator(dedup: Arc<RequestDeduplicator<K, T, E>>, key_extractor: F) -> Self {
        Self {
            key_extractor: Arc::new(key_extractor),
            dedup,
        }
    }

    pub fn deduplicator(&self) -> &Arc<RequestDeduplicator<K, T, E>> {
        &self.dedup
    }
}

impl<K: Hash + Eq, T, E, F> Clone for CoalesceLayer<K, T, E, F> {
    fn clone(&self) -> Self {
        Self {
            key_extractor: Arc::clone(&self.key_extractor),
            dedup: Arc::clone(&self.dedup),
        }
    }
}

impl<S, K: Hash + Eq, T, E, F> Layer<S> for CoalesceLayer<K, T, E, F> {
    type Service = CoalesceService<S, K, T, E, F>;

    fn layer(&self, service: S) -> Self::Service {
        CoalesceService::new(service, Arc::clone(&self.key_extractor), Arc::clone(&self.dedup))
    }
}
