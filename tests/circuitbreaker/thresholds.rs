use super::{backend, builder, TestError};
use billy_circuitbreaker::CircuitState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, ServiceExt};

#[tokio::test(start_paused = true)]
async fn test_stays_closed_below_minimum_volume() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer = builder().build();
    let handle = layer.handle();
    let service = layer.layer(backend(&calls, Duration::ZERO));

    for _ in 0..4 {
        let _ = service.clone().oneshot(0).await;
    }

    assert_eq!(handle.state(), CircuitState::Closed);
    assert_eq!(handle.metrics().failure_rate, 1.0);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_exactly_the_threshold_stays_closed() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer = builder().build();
    let handle = layer.handle();
    let service = layer.layer(backend(&calls, Duration::ZERO));

    for req in [1, 2, 3, 0, 0, 0] {
        let _ = service.clone().oneshot(req).await;
    }
    assert_eq!(handle.metrics().failure_rate, 0.5);
    assert_eq!(handle.state(), CircuitState::Closed);

    let _ = service.clone().oneshot(0).await;
    assert_eq!(handle.state(), CircuitState::Open);

    let err = service.clone().oneshot(7).await.unwrap_err();
    assert!(err.is_open_circuit());
    assert_eq!(calls.load(Ordering::SeqCst), 7);
}

#[tokio::test(start_paused = true)]
async fn test_business_errors_do_not_count() {
    let layer = builder()
        .failure_classifier(|result| matches!(result, Err(TestError::Upstream(status)) if *status >= 500))
        .build();
    let handle = layer.handle();
    let rejecting = tower::service_fn(|_req: u32| async { Err::<u32, _>(TestError::Upstream(422)) });
    let service = layer.layer(rejecting);

    for _ in 0..10 {
        assert_eq!(service.clone().oneshot(1).await, Err(TestError::Upstream(422)));
    }

    assert_eq!(handle.state(), CircuitState::Closed);
    assert_eq!(handle.metrics().successes, 10);
}

#[tokio::test(start_paused = true)]
async fn test_old_failures_leave_the_window() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer = builder().build();
    let handle = layer.handle();
    let service = layer.layer(backend(&calls, Duration::ZERO));

    for _ in 0..4 {
        let _ = service.clone().oneshot(0).await;
    }
    tokio::time::advance(Duration::from_secs(11)).await;
    let _ = service.clone().oneshot(0).await;

    assert_eq!(handle.state(), CircuitState::Closed);
    assert_eq!(handle.metrics().failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_count_as_failures() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer = builder().call_timeout(Duration::from_millis(100)).build();
    let handle = layer.handle();
    let service = layer.layer(backend(&calls, Duration::from_secs(1)));

    for _ in 0..5 {
        let err = service.clone().oneshot(1).await.unwrap_err();
        assert!(matches!(err, TestError::Breaker(ref e) if e.is_timeout()));
    }

    assert_eq!(handle.state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_latency_summary_reflects_calls() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer = builder().build();
    let handle = layer.handle();
    let service = layer.layer(backend(&calls, Duration::from_millis(40)));

    for _ in 0..3 {
        service.clone().oneshot(1).await.unwrap();
    }

    let metrics = handle.metrics();
    assert_eq!(metrics.requests, 3);
    assert!(metrics.latency.p50 >= Duration::from_millis(40));
    assert!(metrics.latency.max >= metrics.latency.p50);
}
