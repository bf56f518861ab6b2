//! Shared infrastructure for the Billy API resilience components.
//!
//! Every component (rate limiter, request deduplicator, circuit breaker,
//! fallback cache) reports what it does through the same small hook system:
//! a typed event enum per component and a list of listeners that are invoked
//! synchronously at the point where the event happens.

pub mod events;

pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
