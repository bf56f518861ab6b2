use crate::config::BillyConfig;
use crate::dry_run::DryRunResponder;
use crate::error::{BillyError, EnrichedError};
use crate::health::HealthStatus;
use crate::pipeline::Pipeline;
use crate::request::{ApiRequest, ApiResponse};
use crate::transport::HttpTransport;
use billy_circuitbreaker::CircuitState;
use std::sync::Arc;
use tower::{Service, ServiceExt};
use tracing::{debug, error, info};

/// Resilient client for the Billy accounting API.
///
/// Every live call passes through a sliding-window rate limiter, a request
/// deduplicator, a circuit breaker with a call timeout, and a last-known-good
/// cache for reads. In dry-run mode calls are answered locally and none of
/// that state is touched.
///
/// The client is cheap to clone; clones share all resilience state. Create
/// one per process and pass it to whatever needs it.
#[derive(Clone)]
pub struct BillyClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: BillyConfig,
    pipeline: Pipeline,
    dry_run: DryRunResponder,
}

impl BillyClient {
    /// Builds a client that talks HTTP to `config.api_base`.
    pub fn new(config: BillyConfig) -> Result<Self, BillyError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Builds a client over any transport service. Statuses below 500 should
    /// resolve to `Ok`; 5xx and network failures to `Err`.
    pub fn with_transport<T>(config: BillyConfig, transport: T) -> Self
    where
        T: Service<ApiRequest, Response = ApiResponse, Error = BillyError> + Clone + Send + Sync + 'static,
        T::Future: Send + 'static,
    {
        let pipeline = Pipeline::new(&config.resilience, transport);
        info!(
            api_base = %config.api_base,
            dry_run = config.dry_run,
            test_mode = config.test_mode,
            "Billy client initialized"
        );
        Self {
            inner: Arc::new(ClientInner {
                config,
                pipeline,
                dry_run: DryRunResponder::new(),
            }),
        }
    }

    pub fn config(&self) -> &BillyConfig {
        &self.inner.config
    }

    pub fn is_dry_run(&self) -> bool {
        self.inner.config.dry_run
    }

    /// Sends one request through the pipeline and returns the raw response.
    ///
    /// Non-2xx answers come back as [`BillyError::Upstream`]. Endpoint
    /// methods build on this and decode the envelope.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, BillyError> {
        let method = request.method;
        let endpoint = request.endpoint.clone();
        info!(%method, endpoint = %endpoint, "Billy API request");

        if self.inner.config.dry_run {
            let response = self.inner.dry_run.respond(&request);
            debug!(status = response.status, dry_run = true, "Billy API response");
            return Ok(response);
        }

        let outcome = self
            .inner
            .pipeline
            .service
            .clone()
            .oneshot(request)
            .await
            .map_err(|err| err.with_context(method.as_str(), &endpoint));

        match outcome {
            Ok(response) if response.is_success() => {
                debug!(status = response.status, "Billy API response");
                Ok(response)
            }
            Ok(response) => {
                debug!(status = response.status, "Billy API response");
                let err = BillyError::from(EnrichedError::from_response(
                    method.as_str(),
                    &endpoint,
                    response.status,
                    response.body,
                ));
                log_failure(&err);
                Err(err)
            }
            Err(err) => {
                log_failure(&err);
                Err(err)
            }
        }
    }

    /// Read-only snapshot of every resilience component.
    pub fn health_status(&self) -> HealthStatus {
        let pipeline = &self.inner.pipeline;
        HealthStatus::new(
            pipeline.breaker.metrics(),
            pipeline.limiter.stats(),
            pipeline.cache.len(),
            pipeline.dedup.pending_count(),
            self.inner.config.dry_run,
        )
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.inner.pipeline.breaker.state()
    }

    /// Closes the circuit and discards its rolling statistics.
    pub fn reset_circuit_breaker(&self) {
        self.inner.pipeline.breaker.reset();
        info!("Billy API circuit breaker reset");
    }

    pub fn clear_fallback_cache(&self) {
        self.inner.pipeline.cache.clear();
        info!("Billy API fallback cache cleared");
    }

    /// Forces the circuit open, e.g. ahead of planned upstream maintenance.
    pub fn open_circuit_breaker(&self) {
        self.inner.pipeline.breaker.force_open();
    }

    /// Drops cached responses and circuit statistics. Calls already in
    /// flight still complete.
    pub fn dispose(&self) {
        self.inner.pipeline.cache.clear();
        self.inner.pipeline.breaker.reset();
        info!("Billy client disposed");
    }
}

fn log_failure(err: &BillyError) {
    match err.upstream() {
        Some(upstream) => error!(
            status = ?upstream.status,
            billy_error_code = ?upstream.billy_error_code,
            method = %upstream.method,
            endpoint = %upstream.endpoint,
            error = %err,
            "Billy API request failed"
        ),
        None => error!(error = %err, "Billy API request failed"),
    }
}

impl std::fmt::Debug for BillyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillyClient")
            .field("config", &self.inner.config)
            .field("circuit", &self.inner.pipeline.breaker)
            .finish()
    }
}
