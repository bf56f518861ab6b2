use super::TestError;
use billy_coalesce::{CoalesceConfig, CoalesceLayer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, ServiceBuilder, ServiceExt};

#[derive(Debug, Clone)]
struct Call {
    method: &'static str,
    path: String,
    body: Option<String>,
}

fn key(call: &Call) -> String {
    format!("{}:{}:{}", call.method, call.path, call.body.as_deref().unwrap_or("{}"))
}

#[tokio::test(start_paused = true)]
async fn test_identical_calls_share_one_backend_hit() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let backend = tower::service_fn(move |call: Call| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(Duration::from_millis(25)).await;
            Ok::<_, TestError>(format!("{} {}", call.method, call.path))
        }
    });

    let layer = CoalesceLayer::<String, String, TestError, _>::new(key);
    let registry = Arc::clone(layer.deduplicator());
    let service = ServiceBuilder::new().layer(layer).service(backend);

    let get = || Call {
        method: "GET",
        path: "/invoices/1".to_string(),
        body: None,
    };
    let results = futures::future::join_all((0..8).map(|_| service.clone().oneshot(get()))).await;

    assert!(results.iter().all(|r| r.as_deref() == Ok("GET /invoices/1")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(registry.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_bodies_distinguish_writes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let backend = tower::service_fn(move |call: Call| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, TestError>(call.body.unwrap_or_default())
        }
    });

    let config = CoalesceConfig::builder(key).name("writes").build();
    let service = CoalesceLayer::<String, String, TestError, _>::with_config(config).layer(backend);

    let post = |body: &str| Call {
        method: "POST",
        path: "/contacts".to_string(),
        body: Some(body.to_string()),
    };
    let (a, b, c) = futures::join!(
        service.clone().oneshot(post(r#"{"name":"A"}"#)),
        service.clone().oneshot(post(r#"{"name":"B"}"#)),
        service.clone().oneshot(post(r#"{"name":"A"}"#)),
    );

    assert_eq!(a.unwrap(), r#"{"name":"A"}"#);
    assert_eq!(b.unwrap(), r#"{"name":"B"}"#);
    assert_eq!(c.unwrap(), r#"{"name":"A"}"#);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
