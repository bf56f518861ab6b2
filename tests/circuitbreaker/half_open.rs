use super::{backend, builder, TestError};
use billy_circuitbreaker::CircuitState;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, ServiceExt};

#[tokio::test(start_paused = true)]
async fn test_only_one_probe_at_a_time() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer = builder().build();
    let handle = layer.handle();
    let service = layer.layer(backend(&calls, Duration::from_millis(100)));

    handle.force_open();
    tokio::time::advance(Duration::from_secs(30)).await;

    let mut probe = Box::pin(service.clone().oneshot(1));
    assert!(futures::poll!(probe.as_mut()).is_pending());
    assert_eq!(handle.state(), CircuitState::HalfOpen);

    let err = service.clone().oneshot(2).await.unwrap_err();
    assert!(err.is_open_circuit());

    assert_eq!(probe.await, Ok(1));
    assert_eq!(handle.state(), CircuitState::Closed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_reopens() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer = builder().build();
    let handle = layer.handle();
    let service = layer.layer(backend(&calls, Duration::ZERO));

    handle.force_open();
    tokio::time::advance(Duration::from_secs(30)).await;

    assert_eq!(service.clone().oneshot(0).await, Err(TestError::Upstream(503)));
    assert_eq!(handle.state(), CircuitState::Open);

    // The reset timeout starts over from the failed probe.
    tokio::time::advance(Duration::from_secs(29)).await;
    assert!(service.clone().oneshot(1).await.unwrap_err().is_open_circuit());
    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(service.clone().oneshot(1).await, Ok(1));
    assert_eq!(handle.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_transitions_are_reported_in_order() {
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&transitions);
    let calls = Arc::new(AtomicUsize::new(0));
    let layer = builder()
        .on_state_transition(move |from, to| sink.lock().push((from, to)))
        .build();
    let service = layer.layer(backend(&calls, Duration::ZERO));

    for _ in 0..5 {
        let _ = service.clone().oneshot(0).await;
    }
    tokio::time::advance(Duration::from_secs(30)).await;
    service.clone().oneshot(1).await.unwrap();

    assert_eq!(
        *transitions.lock(),
        vec![
            (CircuitState::Closed, CircuitState::Open),
            (CircuitState::Open, CircuitState::HalfOpen),
            (CircuitState::HalfOpen, CircuitState::Closed),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_reset_clears_statistics() {
    let calls = Arc::new(AtomicUsize::new(0));
    let layer = builder().build();
    let handle = layer.handle();
    let service = layer.layer(backend(&calls, Duration::ZERO));

    for _ in 0..5 {
        let _ = service.clone().oneshot(0).await;
    }
    assert_eq!(handle.state(), CircuitState::Open);
    let _ = service.clone().oneshot(1).await;
    assert_eq!(handle.metrics().rejects, 1);

    handle.reset();
    let metrics = handle.metrics();
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(metrics.requests, 0);
    assert_eq!(metrics.rejects, 0);
    assert_eq!(service.clone().oneshot(3).await, Ok(3));
}
