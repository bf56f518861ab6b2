//! Request deduplication for Tower services.
//!
//! Concurrent calls that map to the same key are collapsed into one
//! execution of the wrapped operation, and every caller observes the same
//! settled outcome: the same value, or the same error.
//!
//! # How It Works
//!
//! 1. The first call for a key runs the operation and registers its shared
//!    future under the key before anything is awaited.
//! 2. Calls arriving while it is in flight receive a handle to that future
//!    without invoking the operation again.
//! 3. The operation runs on its own task, so callers that stop waiting do not
//!    cancel it. When it settles the key is removed, whatever the outcome.
//!
//! Deduplication introduces no error type of its own.
//!
//! # Example
//!
//! ```rust
//! use billy_coalesce::RequestDeduplicator;
//!
//! # async fn example() {
//! let dedup = RequestDeduplicator::<String, u32, String>::new();
//!
//! let a = dedup.deduplicate("GET:/invoices".into(), || async { Ok(42) });
//! let b = dedup.deduplicate("GET:/invoices".into(), || async { Ok(0) });
//!
//! // `b` joined `a`; its own operation was never invoked.
//! assert_eq!(futures::join!(a, b), (Ok(42), Ok(42)));
//! assert_eq!(dedup.pending_count(), 0);
//! # }
//! ```
//!
//! # Requirements
//!
//! - The key type must implement `Hash + Eq + Clone + Send`
//! - Response and error types must be `Clone + Send + Sync`

mod config;
mod dedup;
mod layer;
mod service;

pub use config::{CoalesceConfig, CoalesceConfigBuilder};
pub use dedup::{RequestDeduplicator, SharedOutcome};
pub use layer::CoalesceLayer;
pub use service::CoalesceService;
