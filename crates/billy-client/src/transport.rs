//! HTTP transport for the Billy API.

use crate::config::BillyConfig;
use crate::error::{BillyError, EnrichedError};
use crate::request::{ApiRequest, ApiResponse};
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";

/// A pooled `reqwest` client bound to one API base and access token.
///
/// Responses with a status below 500 resolve to `Ok`: their business meaning
/// is left to the caller. 5xx responses and network failures resolve to
/// `Err`, which is what the circuit breaker counts.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_base: Arc<str>,
}

impl HttpTransport {
    pub fn new(config: &BillyConfig) -> Result<Self, BillyError> {
        let mut token = HeaderValue::from_str(&config.api_key)
            .map_err(|_| BillyError::Configuration("API key is not a valid header value".to_string()))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_TOKEN_HEADER, token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let settings = &config.resilience.transport;
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_millis(settings.pool_idle_timeout_ms))
            .tcp_keepalive(Duration::from_secs(60))
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .map_err(|err| BillyError::Configuration(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            api_base: Arc::from(config.api_base.trim_end_matches('/')),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, BillyError> {
        let method = request.method.as_str();
        let url = format!("{}{}", self.api_base, request.endpoint);

        let mut builder = self.client.request(request.method.into(), &url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| EnrichedError::from_reqwest(method, &request.endpoint, &err))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| EnrichedError::from_reqwest(method, &request.endpoint, &err))?;
        let body = parse_body(&bytes);

        if status >= 500 {
            return Err(EnrichedError::from_response(method, &request.endpoint, status, body).into());
        }
        Ok(ApiResponse { status, body })
    }
}

/// JSON when possible, the raw text otherwise, `Null` for an empty body.
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

impl Service<ApiRequest> for HttpTransport {
    type Response = ApiResponse;
    type Error = BillyError;
    type Future = BoxFuture<'static, Result<ApiResponse, BillyError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: ApiRequest) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.send(request).await })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").field("api_base", &self.api_base).finish()
    }
}
