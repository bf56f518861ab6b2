use super::{assert_about, limiter};
use billy_ratelimiter::RateLimiterConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tower::{Layer, ServiceExt};

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_respect_window() {
    let window = Duration::from_secs(1);
    let limiter = Arc::new(limiter(3, window));
    let admitted = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let limiter = Arc::clone(&limiter);
        let admitted = Arc::clone(&admitted);
        handles.push(tokio::spawn(async move {
            limiter.wait_if_needed().await;
            admitted.lock().push(Instant::now());
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut times = admitted.lock().clone();
    times.sort();
    assert_eq!(times.len(), 10);
    for (i, start) in times.iter().enumerate() {
        let in_window = times[i..].iter().filter(|&&t| t - *start < window).count();
        assert!(in_window <= 3, "{in_window} admissions inside one window");
    }
}

#[tokio::test(start_paused = true)]
async fn test_requests_within_limit_do_not_wait() {
    let limiter = limiter(5, Duration::from_secs(60));

    for _ in 0..5 {
        assert_eq!(limiter.wait_if_needed().await, Duration::ZERO);
    }
    assert_eq!(limiter.stats().requests_in_window, 5);
}

#[tokio::test(start_paused = true)]
async fn test_window_slides_rather_than_resets() {
    let window = Duration::from_secs(10);
    let limiter = limiter(2, window);

    limiter.wait_if_needed().await;
    tokio::time::advance(Duration::from_secs(6)).await;
    limiter.wait_if_needed().await;

    // The first admission leaves the window 4s later, the second does not.
    let waited = limiter.wait_if_needed().await;
    assert_about(waited, Duration::from_secs(4));
    assert_eq!(limiter.stats().requests_in_window, 2);
}

#[tokio::test(start_paused = true)]
async fn test_stats_are_read_only() {
    let limiter = limiter(3, Duration::from_secs(1));
    limiter.wait_if_needed().await;
    limiter.wait_if_needed().await;

    let first = limiter.stats();
    let second = limiter.stats();
    assert_eq!(first, second);
    assert_eq!(first.requests_in_window, 2);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(limiter.stats().requests_in_window, 0);
}

#[tokio::test(start_paused = true)]
async fn test_layer_clones_share_one_window() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let backend = tower::service_fn(move |_req: ()| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, std::io::Error>(()) }
    });

    let layer = RateLimiterConfig::builder()
        .max_requests(2)
        .window(Duration::from_secs(1))
        .jitter(1.0, 1.0)
        .build();
    let limiter = Arc::clone(layer.limiter());
    let service = layer.layer(backend);

    let started = Instant::now();
    service.clone().oneshot(()).await.unwrap();
    service.clone().oneshot(()).await.unwrap();
    service.clone().oneshot(()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(limiter.stats().requests_in_window, 1);
}
