//! Insertion-ordered bounded storage.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// A cached value and the moment it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(value: V, stored_at: Instant) -> Self {
        Self { value, stored_at }
    }

    /// How long ago the value was stored.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.stored_at)
    }

    /// Servable only while strictly younger than `freshness`.
    pub(crate) fn is_fresh(&self, now: Instant, freshness: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < freshness
    }
}

/// FIFO store: eviction follows first-insertion order only.
///
/// Reads never reorder keys, and overwriting an existing key keeps its
/// original position, so a freshly refreshed entry can still be the next to
/// go.
pub(crate) struct FifoStore<K, V> {
    data: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> FifoStore<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        self.data.get(key)
    }

    /// Inserts or overwrites `key`. Returns the evicted pair when a new key
    /// pushed the store past capacity.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(slot) = self.data.get_mut(&key) {
            *slot = value;
            return None;
        }

        let evicted = if self.data.len() >= self.capacity {
            self.order.pop_front().and_then(|oldest| {
                let value = self.data.remove(&oldest)?;
                Some((oldest, value))
            })
        } else {
            None
        };

        self.data.insert(key.clone(), value);
        self.order.push_back(key);
        evicted
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
        self.order.clear();
    }
}
