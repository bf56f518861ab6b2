//! In-flight request registry.

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::debug;

#[cfg(feature = "metrics")]
use metrics::counter;

/// The shared outcome handed to every caller of one key.
pub type SharedOutcome<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct Pending<T, E> {
    generation: u64,
    outcome: WeakShared<BoxFuture<'static, Result<T, E>>>,
}

type PendingMap<K, T, E> = Mutex<HashMap<K, Pending<T, E>>>;

/// Removes the registry entry for one generation of a key.
///
/// Moved into the shared future, so it runs when that future completes with
/// either outcome.
struct SettleGuard<K: Hash + Eq, T, E> {
    pending: Arc<PendingMap<K, T, E>>,
    key: Option<K>,
    generation: u64,
}

impl<K: Hash + Eq, T, E> Drop for SettleGuard<K, T, E> {
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        let mut pending = self.pending.lock();
        // Only remove our own entry; a newer operation may own the key.
        if pending
            .get(&key)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            pending.remove(&key);
        }
    }
}

/// Collapses concurrent operations that share a key into one execution.
///
/// The first caller for a key runs the operation; callers arriving while it
/// is in flight get a handle to the same future and observe the same value or
/// error. The registry entry is removed as soon as the operation settles,
/// unconditionally, so the next call with that key runs the operation again.
///
/// Each operation is driven by its own spawned task, so it runs to completion
/// even when every caller stops waiting for it. Side effects of the wrapped
/// call still happen and the key is still released when it settles. The
/// registry itself only holds weak handles.
///
/// Must be called from within a Tokio runtime.
pub struct RequestDeduplicator<K: Hash + Eq, T, E> {
    pending: Arc<PendingMap<K, T, E>>,
    next_generation: AtomicU64,
    name: String,
}

impl<K, T, E> RequestDeduplicator<K, T, E>
where
    K: Hash + Eq + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::named("<unnamed>")
    }

    /// Creates a deduplicator whose name is attached to logs and metrics.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `operation` unless an operation for `key` is already in flight,
    /// in which case the in-flight outcome is shared instead.
    ///
    /// `operation` is invoked synchronously, before this method returns, and
    /// only when this caller becomes the leader for `key`. Dropping the
    /// returned handle does not cancel it.
    pub fn deduplicate<F, Fut>(&self, key: K, operation: F) -> SharedOutcome<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut pending = self.pending.lock();

        if let Some(outcome) = pending.get(&key).and_then(|entry| entry.outcome.upgrade()) {
            #[cfg(feature = "tracing")]
            debug!(dedup = %self.name, "joined in-flight request");

            #[cfg(feature = "metrics")]
            counter!("dedup_requests_total", "dedup" => self.name.clone(), "role" => "follower")
                .increment(1);

            return outcome;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let guard = SettleGuard {
            pending: Arc::clone(&self.pending),
            key: Some(key.clone()),
            generation,
        };
        let operation = operation();
        let outcome = async move {
            let _guard = guard;
            operation.await
        }
        .boxed()
        .shared();

        // A freshly created Shared has not completed, so it always downgrades.
        if let Some(weak) = outcome.downgrade() {
            pending.insert(
                key,
                Pending {
                    generation,
                    outcome: weak,
                },
            );
        }
        tokio::spawn(outcome.clone());

        #[cfg(feature = "metrics")]
        counter!("dedup_requests_total", "dedup" => self.name.clone(), "role" => "leader")
            .increment(1);

        outcome
    }

    /// Number of keys with an operation in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl<K, T, E> Default for RequestDeduplicator<K, T, E>
where
    K: Hash + Eq + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, T, E> std::fmt::Debug for RequestDeduplicator<K, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDeduplicator")
            .field("name", &self.name)
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}
