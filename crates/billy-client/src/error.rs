//! Error types surfaced by [`BillyClient`](crate::BillyClient).
//!
//! Every failure that crosses the transport boundary becomes an
//! [`EnrichedError`], so callers can tell a business rejection (4xx, do not
//! retry) from a transient failure (5xx, timeout, connection) without
//! inspecting strings.

use billy_circuitbreaker::CircuitBreakerError;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of an upstream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The API answered with a 4xx status.
    BusinessRejection,
    /// The API answered with a 5xx status.
    ServerError,
    /// No answer within the call timeout.
    Timeout,
    /// The request never got an HTTP answer.
    Connection,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::BusinessRejection => "business rejection",
            ErrorKind::ServerError => "server error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Connection => "connection error",
        })
    }
}

/// A transport or upstream failure with the structured details Billy
/// returns in its error bodies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedError {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    /// `errorCode` from the response body.
    pub billy_error_code: Option<String>,
    /// `errorMessage` from the response body.
    pub billy_error_message: Option<String>,
    /// `validationErrors` from the response body, kept as sent.
    pub validation_errors: Option<Value>,
    /// The raw response body, when there was one.
    pub body: Option<Value>,
    /// Text of the underlying transport error or status line.
    pub source_message: String,
    pub method: String,
    pub endpoint: String,
}

impl EnrichedError {
    fn new(kind: ErrorKind, source_message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            billy_error_code: None,
            billy_error_message: None,
            validation_errors: None,
            body: None,
            source_message: source_message.into(),
            method: String::new(),
            endpoint: String::new(),
        }
    }

    /// Builds an error from a non-success HTTP response.
    pub fn from_response(method: &str, endpoint: &str, status: u16, body: Value) -> Self {
        let kind = if status >= 500 {
            ErrorKind::ServerError
        } else {
            ErrorKind::BusinessRejection
        };
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_owned);

        let mut err = Self::new(kind, format!("HTTP {status}"));
        err.status = Some(status);
        err.billy_error_code = text("errorCode");
        err.billy_error_message = text("errorMessage");
        err.validation_errors = body.get("validationErrors").filter(|v| !v.is_null()).cloned();
        err.body = (!body.is_null()).then_some(body);
        err.with_context(method, endpoint)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("no response within {}ms", after.as_millis()),
        )
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    pub(crate) fn from_reqwest(method: &str, endpoint: &str, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else {
            ErrorKind::Connection
        };
        Self::new(kind, err.to_string()).with_context(method, endpoint)
    }

    /// Fills in the request coordinates if the failing layer did not know
    /// them.
    pub fn with_context(mut self, method: &str, endpoint: &str) -> Self {
        if self.method.is_empty() {
            self.method = method.to_string();
        }
        if self.endpoint.is_empty() {
            self.endpoint = endpoint.to_string();
        }
        self
    }

    /// 5xx, timeouts and connection failures.
    pub fn is_transient(&self) -> bool {
        self.kind != ErrorKind::BusinessRejection
    }

    pub fn is_business_rejection(&self) -> bool {
        self.kind == ErrorKind::BusinessRejection
    }
}

impl fmt::Display for EnrichedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Billy API {} on {} {}", self.kind, self.method, self.endpoint)?;
        if let Some(status) = self.status {
            write!(f, " (status {status})")?;
        }
        match (&self.billy_error_code, &self.billy_error_message) {
            (Some(code), Some(message)) => write!(f, ": {code}: {message}"),
            (None, Some(message)) => write!(f, ": {message}"),
            (Some(code), None) => write!(f, ": {code}"),
            (None, None) => write!(f, ": {}", self.source_message),
        }
    }
}

impl std::error::Error for EnrichedError {}

/// Errors returned by the client.
///
/// Errors are `Clone` because one deduplicated outcome is handed to every
/// caller that shared it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BillyError {
    #[error(transparent)]
    Upstream(#[from] EnrichedError),

    /// The circuit is open and the fallback cache had nothing fresh.
    #[error("Billy API unavailable and no cached data for {method} {endpoint}")]
    Unavailable { method: String, endpoint: String },

    /// The response envelope did not contain the expected key.
    #[error("invalid response structure from {endpoint}: expected `{expected}`")]
    InvalidResponse { endpoint: String, expected: String },

    /// The envelope was present but its entity did not deserialize.
    #[error("could not decode {entity} from {endpoint}: {message}")]
    Decode {
        endpoint: String,
        entity: String,
        message: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BillyError {
    /// Attaches method and endpoint to errors raised by layers that only saw
    /// the call, not the request.
    pub fn with_context(self, method: &str, endpoint: &str) -> Self {
        match self {
            BillyError::Upstream(err) => BillyError::Upstream(err.with_context(method, endpoint)),
            BillyError::Unavailable {
                method: m,
                endpoint: e,
            } => BillyError::Unavailable {
                method: if m.is_empty() { method.to_string() } else { m },
                endpoint: if e.is_empty() { endpoint.to_string() } else { e },
            },
            other => other,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BillyError::Upstream(err) => err.status,
            _ => None,
        }
    }

    pub fn upstream(&self) -> Option<&EnrichedError> {
        match self {
            BillyError::Upstream(err) => Some(err),
            _ => None,
        }
    }

    /// Whether retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BillyError::Upstream(err) => err.is_transient(),
            BillyError::Unavailable { .. } => true,
            _ => false,
        }
    }
}

impl From<CircuitBreakerError> for BillyError {
    fn from(err: CircuitBreakerError) -> Self {
        match err {
            CircuitBreakerError::OpenCircuit { .. } => BillyError::Unavailable {
                method: String::new(),
                endpoint: String::new(),
            },
            CircuitBreakerError::Timeout { after } => BillyError::Upstream(EnrichedError::timeout(after)),
        }
    }
}
