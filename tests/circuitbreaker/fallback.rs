use super::{backend, builder, TestError};
use billy_circuitbreaker::{CircuitState, FallbackCause, FallbackReason};
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, ServiceExt};

#[tokio::test(start_paused = true)]
async fn test_fallback_sees_why_it_was_called() {
    let causes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&causes);
    let calls = Arc::new(AtomicUsize::new(0));
    let layer = builder()
        .minimum_number_of_calls(2)
        .fallback(move |req, cause: FallbackCause<TestError>| {
            sink.lock().push(cause.clone());
            async move {
                match cause {
                    FallbackCause::Rejected => Ok(req + 1000),
                    FallbackCause::Failed(err) => Err(err),
                }
            }
            .boxed()
        })
        .build();
    let handle = layer.handle();
    let service = layer.layer(backend(&calls, Duration::ZERO));

    assert_eq!(service.clone().oneshot(0).await, Err(TestError::Upstream(503)));
    assert_eq!(service.clone().oneshot(0).await, Err(TestError::Upstream(503)));
    assert_eq!(handle.state(), CircuitState::Open);
    assert_eq!(service.clone().oneshot(5).await, Ok(1005));

    assert_eq!(
        *causes.lock(),
        vec![
            FallbackCause::Failed(TestError::Upstream(503)),
            FallbackCause::Failed(TestError::Upstream(503)),
            FallbackCause::Rejected,
        ]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_listener_and_counters() {
    let reasons = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reasons);
    let calls = Arc::new(AtomicUsize::new(0));
    let layer = builder()
        .fallback(|req, _cause| async move { Ok(req) }.boxed())
        .on_fallback(move |reason| sink.lock().push(reason))
        .build();
    let handle = layer.handle();
    let service = layer.layer(backend(&calls, Duration::ZERO));

    handle.force_open();
    for req in 1..=3 {
        assert_eq!(service.clone().oneshot(req).await, Ok(req));
    }

    let metrics = handle.metrics();
    assert_eq!(metrics.rejects, 3);
    assert_eq!(metrics.fallbacks, 3);
    assert_eq!(*reasons.lock(), vec![FallbackReason::Rejected; 3]);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
