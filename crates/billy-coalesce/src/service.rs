//! Service implementation for request deduplication.

use crate::dedup::{RequestDeduplicator, SharedOutcome};
use std::hash::Hash;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Service, ServiceExt};

/// A service that runs concurrent requests with equal keys only once.
///
/// Errors are not wrapped: every caller of a key receives a clone of the
/// inner service's own response or error.
pub struct CoalesceService<S, K: Hash + Eq, T, E, F> {
    inner: S,
    key_extractor: Arc<F>,
    dedup: Arc<RequestDeduplicator<K, T, E>>,
}

impl<S, K: Hash + Eq, T, E, F> CoalesceService<S, K, T, E, F> {
    pub fn new(inner: S, key_extractor: Arc<F>, dedup: Arc<RequestDeduplicator<K, T, E>>) -> Self {
        Self {
            inner,
            key_extractor,
            dedup,
        }
    }

    /// The registry shared by every clone of this service.
    pub fn deduplicator(&self) -> &Arc<RequestDeduplicator<K, T, E>> {
        &self.dedup
    }
}

impl<S: Clone, K: Hash + Eq, T, E, F> Clone for CoalesceService<S, K, T, E, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            key_extractor: Arc::clone(&self.key_extractor),
            dedup: Arc::clone(&self.dedup),
        }
    }
}

impl<S, K, T, E, F, Req> Service<Req> for CoalesceService<S, K, T, E, F>
where
    S: Service<Req, Response = T, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    K: Hash + Eq + Clone + Send + 'static,
    Req: Send + 'static,
    F: Fn(&Req) -> K,
{
    type Response = T;
    type Error = E;
    type Future = SharedOutcome<T, E>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Followers never reach the inner service, so readiness is awaited by
        // the leader inside the shared operation.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = (self.key_extractor)(&req);
        let inner = self.inner.clone();
        self.dedup.deduplicate(key, move || inner.oneshot(req))
    }
}
