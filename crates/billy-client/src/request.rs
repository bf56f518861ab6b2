use serde_json::Value;
use std::fmt;

/// HTTP verbs used by the Billy API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One call against the API: a verb, a path relative to the API base (query
/// string included) and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub endpoint: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            endpoint: endpoint.into(),
            body: None,
        }
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            endpoint: endpoint.into(),
            body: Some(body),
        }
    }

    pub fn put(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Put,
            endpoint: endpoint.into(),
            body: Some(body),
        }
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            endpoint: endpoint.into(),
            body: None,
        }
    }

    /// `METHOD:endpoint:json(body)`, with a missing body serialized as `{}`.
    ///
    /// Writes are keyed too, so identical concurrent mutations collapse into
    /// one upstream call.
    pub fn dedup_key(&self) -> String {
        let body = match &self.body {
            Some(body) => body.to_string(),
            None => "{}".to_string(),
        };
        format!("{}:{}:{}", self.method, self.endpoint, body)
    }

    /// `GET:endpoint` for reads; writes are never cached.
    pub fn cache_key(&self) -> Option<String> {
        (self.method == HttpMethod::Get).then(|| format!("GET:{}", self.endpoint))
    }
}

/// A completed HTTP exchange. Statuses below 500 arrive here; their meaning
/// is decided by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Appends `pairs` to `path` as a URL-encoded query string.
pub(crate) fn with_query(path: &str, pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return path.to_string();
    }
    let query = pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{query}")
}
