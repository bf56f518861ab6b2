use crate::events::CacheEvent;
use crate::FallbackCache;
use billy_resilience_core::events::{EventListeners, FnListener};
use std::hash::Hash;
use std::time::Duration;

/// Configuration for [`FallbackCache`].
pub struct FallbackCacheConfig {
    pub(crate) capacity: usize,
    pub(crate) freshness: Duration,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
    pub(crate) name: String,
}

impl FallbackCacheConfig {
    pub fn builder() -> FallbackCacheConfigBuilder {
        FallbackCacheConfigBuilder::new()
    }
}

/// Builder for [`FallbackCacheConfig`].
pub struct FallbackCacheConfigBuilder {
    capacity: usize,
    freshness: Duration,
    event_listeners: EventListeners<CacheEvent>,
    name: String,
}

impl Default for FallbackCacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackCacheConfigBuilder {
    /// Defaults: 1000 entries, one hour of freshness.
    pub fn new() -> Self {
        Self {
            capacity: 1000,
            freshness: Duration::from_secs(3600),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Maximum number of entries. Values below 1 are clamped to 1.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Age after which an entry is no longer served.
    pub fn freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Called with the entry age whenever a fresh entry is served.
    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::Hit { age, .. } = event {
                f(*age);
            }
        }));
        self
    }

    /// Called with the entry age whenever a present entry is too old to serve.
    pub fn on_stale<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::Stale { age, .. } = event {
                f(*age);
            }
        }));
        self
    }

    pub fn on_eviction<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::Eviction { .. } = event {
                f();
            }
        }));
        self
    }

    pub fn build_config(self) -> FallbackCacheConfig {
        FallbackCacheConfig {
            capacity: self.capacity.max(1),
            freshness: self.freshness,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    pub fn build<K, V>(self) -> FallbackCache<K, V>
    where
        K: Hash + Eq + Clone,
        V: Clone,
    {
        FallbackCache::with_config(self.build_config())
    }
}
