use super::assert_about;
use billy_ratelimiter::RateLimiterConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn recorded_limiter(
    factor: f64,
    cap: f64,
) -> (billy_ratelimiter::SlidingWindowLimiter, Arc<Mutex<Vec<(Duration, f64)>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let limiter = RateLimiterConfig::builder()
        .max_requests(1)
        .window(Duration::from_secs(1))
        .backoff_horizon(Duration::from_secs(60))
        .backoff_factor(factor)
        .max_backoff_multiplier(cap)
        .jitter(1.0, 1.0)
        .min_wait(Duration::ZERO)
        .on_backoff(move |wait, multiplier, _in_window| sink.lock().push((wait, multiplier)))
        .build_limiter();
    (limiter, events)
}

#[tokio::test(start_paused = true)]
async fn test_repeated_saturation_escalates_multiplier() {
    let (limiter, events) = recorded_limiter(1.5, 8.0);

    limiter.wait_if_needed().await;
    assert_about(limiter.wait_if_needed().await, Duration::from_secs(1));
    assert_about(limiter.wait_if_needed().await, Duration::from_millis(1500));

    let events = events.lock().clone();
    assert_eq!(events.len(), 2);
    assert_about(events[0].0, Duration::from_secs(1));
    assert_eq!(events[0].1, 1.0);
    assert_about(events[1].0, Duration::from_millis(1500));
    assert_eq!(events[1].1, 1.5);
    assert_eq!(limiter.stats().backoff_multiplier, 1.5);
}

#[tokio::test(start_paused = true)]
async fn test_multiplier_is_capped() {
    let (limiter, events) = recorded_limiter(4.0, 5.0);

    for _ in 0..4 {
        limiter.wait_if_needed().await;
    }

    let multipliers: Vec<f64> = events.lock().iter().map(|(_, m)| *m).collect();
    assert_eq!(multipliers, vec![1.0, 4.0, 5.0]);
}

#[tokio::test(start_paused = true)]
async fn test_quiet_period_resets_multiplier() {
    let (limiter, events) = recorded_limiter(2.0, 8.0);

    limiter.wait_if_needed().await;
    limiter.wait_if_needed().await;
    limiter.wait_if_needed().await;
    assert_eq!(limiter.stats().backoff_multiplier, 2.0);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(limiter.stats().backoff_multiplier, 1.0);

    limiter.wait_if_needed().await;
    limiter.wait_if_needed().await;
    let (wait, multiplier) = events.lock().last().copied().unwrap();
    assert_about(wait, Duration::from_secs(1));
    assert_eq!(multiplier, 1.0);
}
