//! Synchronous event hooks.
//!
//! Components emit events inline, on the task that caused them. There is no
//! queue and no background dispatcher: when `emit` returns, every listener has
//! already observed the event.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::time::Instant;

/// An event emitted by one of the resilience components.
pub trait ResilienceEvent: Send + Sync + fmt::Debug {
    /// Short machine-readable kind, e.g. `"state_transition"` or `"backoff"`.
    fn event_type(&self) -> &'static str;

    /// When the event happened, on the tokio clock.
    fn timestamp(&self) -> Instant;

    /// Name of the component instance that emitted the event.
    fn source(&self) -> &str;
}

/// Receives events of type `E`.
pub trait EventListener<E: ResilienceEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

/// An ordered list of listeners for one event type.
pub struct EventListeners<E: ResilienceEvent> {
    listeners: Vec<Arc<dyn EventListener<E>>>,
}

impl<E: ResilienceEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Registers a listener. Listeners are invoked in registration order.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Delivers `event` to every listener.
    ///
    /// A panicking listener is isolated: the panic is caught and the
    /// remaining listeners still run. Hooks are used for logging and
    /// counters, and must never take down the request that triggered them.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: ResilienceEvent> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<E: ResilienceEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ResilienceEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Adapts a closure into an [`EventListener`].
pub struct FnListener<E, F> {
    f: F,
    _event: PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: ResilienceEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
