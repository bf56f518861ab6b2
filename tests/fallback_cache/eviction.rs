use billy_fallback_cache::{FallbackCache, FallbackCacheConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn cache(capacity: usize) -> FallbackCache<String, u32> {
    FallbackCache::new(capacity, Duration::from_secs(3600))
}

#[tokio::test(start_paused = true)]
async fn test_oldest_insert_goes_first() {
    let cache = cache(3);
    for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
        cache.set(key.to_string(), i as u32);
    }

    assert_eq!(cache.len(), 3);
    assert!(cache.get(&"a".to_string()).is_none());
    assert_eq!(cache.get(&"d".to_string()).map(|e| e.value), Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_reads_do_not_protect_entries() {
    let cache = cache(2);
    cache.set("a".to_string(), 1);
    cache.set("b".to_string(), 2);

    for _ in 0..5 {
        assert!(cache.get(&"a".to_string()).is_some());
    }
    cache.set("c".to_string(), 3);

    assert!(cache.get(&"a".to_string()).is_none());
    assert!(cache.get(&"b".to_string()).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_overwrite_keeps_original_position() {
    let cache = cache(2);
    cache.set("a".to_string(), 1);
    cache.set("b".to_string(), 2);
    cache.set("a".to_string(), 10);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&"a".to_string()).map(|e| e.value), Some(10));

    cache.set("c".to_string(), 3);
    assert!(cache.get(&"a".to_string()).is_none());
    assert_eq!(cache.get(&"b".to_string()).map(|e| e.value), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_eviction_listener_and_clear() {
    let evictions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evictions);
    let cache: FallbackCache<u32, u32> = FallbackCacheConfig::builder()
        .capacity(2)
        .on_eviction(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    for i in 0..5 {
        cache.set(i, i);
    }
    assert_eq!(evictions.load(Ordering::SeqCst), 3);

    cache.clear();
    assert!(cache.is_empty());
    cache.set(9, 9);
    assert_eq!(cache.len(), 1);
}
