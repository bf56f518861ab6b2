//! A resilient client for the [Billy](https://www.billy.dk) accounting API.
//!
//! [`BillyClient`] wraps every live call in a tower stack assembled from the
//! workspace's pattern crates:
//!
//! - **Rate limiting** with a sliding window and adaptive backoff
//! - **Request deduplication**, so concurrent identical calls share one
//!   upstream request
//! - **Circuit breaking** with a call timeout and a single half-open probe
//! - **A last-known-good cache** that answers reads while the circuit is open
//!
//! Business rejections (4xx) come back as errors but never trip the circuit.
//! In dry-run mode no network call is made; writes are echoed with
//! synthetic ids.
//!
//! # Example
//!
//! ```rust,no_run
//! use billy_client::{BillyClient, BillyConfig, InvoiceFilter, InvoiceState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BillyClient::new(BillyConfig::from_env()?)?;
//!
//! let drafts = client
//!     .list_invoices(&InvoiceFilter {
//!         state: Some(InvoiceState::Draft),
//!         ..InvoiceFilter::default()
//!     })
//!     .await?;
//! println!("{} draft invoices", drafts.len());
//!
//! let health = client.health_status();
//! println!("circuit {}", health.circuit.state);
//! # Ok(())
//! # }
//! ```

mod api;
mod client;
mod config;
mod dry_run;
mod envelope;
mod error;
mod health;
mod models;
mod pipeline;
mod request;
mod telemetry;
mod transport;

pub use api::{contact_update_payload, invoice_payload, summarize_revenue, RevenueSummary};
pub use billy_circuitbreaker::CircuitState;
pub use client::BillyClient;
pub use config::{
    BillyConfig, CacheSettings, CircuitSettings, ConfigError, RateLimitSettings, ResilienceSettings,
    TransportSettings, DEFAULT_API_BASE,
};
pub use dry_run::DryRunResponder;
pub use error::{BillyError, EnrichedError, ErrorKind};
pub use health::{CircuitHealth, HealthStatus};
pub use models::*;
pub use request::{ApiRequest, ApiResponse, HttpMethod};
pub use telemetry::init_tracing;
pub use transport::HttpTransport;
