//! Tests for the client facade.
//!
//! - dry_run.rs: full flows answered locally
//! - endpoints.rs: payload shapes and envelope handling over a recording transport
//! - resilience.rs: breaker, fallback cache and dedup seen through the client
//! - http.rs: the real HTTP transport against a mock server

mod dry_run;
mod endpoints;

use billy_client::{ApiRequest, ApiResponse, BillyConfig, BillyError, EnrichedError};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tower::Service;

pub type RequestLog = Arc<Mutex<Vec<ApiRequest>>>;

pub fn config() -> BillyConfig {
    BillyConfig::new("test-token", "test-org")
}

/// A transport that records every request and answers with `respond`.
pub fn recording<F>(
    respond: F,
) -> (
    impl Service<ApiRequest, Response = ApiResponse, Error = BillyError, Future = BoxFuture<'static, Result<ApiResponse, BillyError>>>
        + Clone
        + Send
        + Sync
        + 'static,
    RequestLog,
)
where
    F: Fn(&ApiRequest) -> Result<ApiResponse, BillyError> + Send + Sync + 'static,
{
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let respond = Arc::new(respond);
    let service = tower::service_fn(move |request: ApiRequest| {
        sink.lock().push(request.clone());
        let outcome = respond(&request);
        async move { outcome }.boxed()
    });
    (service, log)
}

pub fn server_error(request: &ApiRequest, status: u16) -> BillyError {
    EnrichedError::from_response(request.method.as_str(), &request.endpoint, status, serde_json::Value::Null).into()
}

pub fn endpoints(log: &RequestLog) -> Vec<String> {
    log.lock()
        .iter()
        .map(|request| format!("{} {}", request.method, request.endpoint))
        .collect()
}
