use billy_resilience_core::ResilienceEvent;
use std::time::Duration;
use tokio::time::Instant;

/// Events emitted by the fallback cache.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A fresh entry was found.
    Hit {
        pattern_name: String,
        timestamp: Instant,
        age: Duration,
    },
    /// An entry exists but is past the freshness horizon.
    Stale {
        pattern_name: String,
        timestamp: Instant,
        age: Duration,
    },
    /// No entry for the key.
    Miss {
        pattern_name: String,
        timestamp: Instant,
    },
    /// Capacity pressure removed the oldest inserted entry.
    Eviction {
        pattern_name: String,
        timestamp: Instant,
    },
}

impl ResilienceEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Stale { .. } => "stale",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::Eviction { .. } => "eviction",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Stale { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Eviction { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            CacheEvent::Hit { pattern_name, .. }
            | CacheEvent::Stale { pattern_name, .. }
            | CacheEvent::Miss { pattern_name, .. }
            | CacheEvent::Eviction { pattern_name, .. } => pattern_name,
        }
    }
}
