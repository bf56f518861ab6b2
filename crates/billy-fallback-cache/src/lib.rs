//! Last-known-good response cache.
//!
//! [`FallbackCache`] keeps the most recent successful response per key so
//! that a read can still be answered while the upstream is unavailable. It
//! is deliberately simple:
//!
//! - **Bounded, FIFO**: when a new key would exceed capacity, the key that was
//!   inserted first is evicted. Reads never promote, and overwriting a key
//!   keeps its original position.
//! - **Freshness at read time**: entries are never expired proactively. An
//!   entry older than the freshness horizon is a miss but still occupies its
//!   slot until capacity pressure evicts it.
//!
//! [`FallbackCacheLayer`] records successful responses of a wrapped service
//! into a cache, which a circuit breaker fallback can then consult.
//!
//! # Examples
//!
//! ```
//! use billy_fallback_cache::{FallbackCache, FallbackCacheConfig};
//! use std::time::Duration;
//!
//! let cache: FallbackCache<String, u32> = FallbackCacheConfig::builder()
//!     .capacity(2)
//!     .freshness(Duration::from_secs(3600))
//!     .build();
//!
//! cache.set("GET:/invoices".to_string(), 1);
//! assert_eq!(cache.get(&"GET:/invoices".to_string()).map(|e| e.value), Some(1));
//! ```

mod config;
mod events;
mod layer;
mod store;

pub use config::{FallbackCacheConfig, FallbackCacheConfigBuilder};
pub use events::CacheEvent;
pub use layer::{FallbackCacheLayer, FallbackCacheRecorder};
pub use store::CacheEntry;

use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use store::FifoStore;
use tokio::time::Instant;

#[cfg(feature = "tracing")]
use tracing::debug;

#[cfg(feature = "metrics")]
use metrics::counter;

/// A bounded, insertion-ordered cache of last-known-good values.
///
/// Cloning is cheap and clones share the same storage.
pub struct FallbackCache<K, V> {
    store: Arc<Mutex<FifoStore<K, CacheEntry<V>>>>,
    config: Arc<FallbackCacheConfig>,
}

impl<K, V> Clone for FallbackCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<K, V> FallbackCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, freshness: Duration) -> Self {
        FallbackCacheConfig::builder()
            .capacity(capacity)
            .freshness(freshness)
            .build()
    }

    pub fn with_config(config: FallbackCacheConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(FifoStore::new(config.capacity))),
            config: Arc::new(config),
        }
    }

    /// Returns the entry for `key` if it is younger than the freshness
    /// horizon.
    pub fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        let now = Instant::now();
        let entry = self.store.lock().get(key).cloned();

        match entry {
            Some(entry) if entry.is_fresh(now, self.config.freshness) => {
                let age = now.saturating_duration_since(entry.stored_at);
                self.config.event_listeners.emit(&CacheEvent::Hit {
                    pattern_name: self.config.name.clone(),
                    timestamp: now,
                    age,
                });

                #[cfg(feature = "metrics")]
                counter!("fallback_cache_reads_total", "cache" => self.config.name.clone(), "outcome" => "hit").increment(1);

                Some(entry)
            }
            Some(entry) => {
                let age = now.saturating_duration_since(entry.stored_at);

                #[cfg(feature = "tracing")]
                debug!(cache = %self.config.name, age_ms = age.as_millis() as u64, "entry too old to serve");

                #[cfg(feature = "metrics")]
                counter!("fallback_cache_reads_total", "cache" => self.config.name.clone(), "outcome" => "stale").increment(1);

                self.config.event_listeners.emit(&CacheEvent::Stale {
                    pattern_name: self.config.name.clone(),
                    timestamp: now,
                    age,
                });
                None
            }
            None => {
                #[cfg(feature = "metrics")]
                counter!("fallback_cache_reads_total", "cache" => self.config.name.clone(), "outcome" => "miss").increment(1);

                self.config.event_listeners.emit(&CacheEvent::Miss {
                    pattern_name: self.config.name.clone(),
                    timestamp: now,
                });
                None
            }
        }
    }

    /// Stores `value` under `key`, stamped with the current time.
    pub fn set(&self, key: K, value: V) {
        let now = Instant::now();
        let evicted = self.store.lock().insert(key, CacheEntry::new(value, now));

        if evicted.is_some() {
            #[cfg(feature = "tracing")]
            debug!(cache = %self.config.name, "evicted oldest entry");

            #[cfg(feature = "metrics")]
            counter!("fallback_cache_evictions_total", "cache" => self.config.name.clone()).increment(1);

            self.config.event_listeners.emit(&CacheEvent::Eviction {
                pattern_name: self.config.name.clone(),
                timestamp: now,
            });
        }
    }

    pub fn clear(&self) {
        self.store.lock().clear();
    }

    /// Number of occupied slots, stale entries included.
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn freshness(&self) -> Duration {
        self.config.freshness
    }
}

impl<K, V> std::fmt::Debug for FallbackCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackCache")
            .field("name", &self.config.name)
            .field("capacity", &self.config.capacity)
            .field("freshness", &self.config.freshness)
            .finish()
    }
}
