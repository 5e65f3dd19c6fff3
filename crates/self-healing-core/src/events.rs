//! Lifecycle events and the listeners that observe them.
//!
//! Connection decorators describe what they do (faults reported, reconnect
//! attempts, regenerations) as events implementing [`HealingEvent`], and
//! hand them to an [`EventListeners`] collection configured by the user.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::warn;

/// An event emitted by a self-healing connection.
pub trait HealingEvent: Send + Sync + fmt::Debug {
    /// Stable snake_case name, e.g. `"fault_reported"` or `"reconnected"`.
    fn event_type(&self) -> &'static str;

    /// When the event happened.
    fn timestamp(&self) -> Instant;

    /// Name of the connection that emitted the event.
    fn connection_name(&self) -> &str;
}

/// Receives events of type `E`.
pub trait EventListener<E: HealingEvent>: Send + Sync {
    /// Called synchronously on the emitting task.
    fn on_event(&self, event: &E);
}

/// Shared, type-erased listener.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// An ordered set of listeners.
///
/// Cloning shares the listeners themselves.
#[derive(Clone)]
pub struct EventListeners<E: HealingEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: HealingEvent> EventListeners<E> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Appends a listener. Listeners run in the order they were added.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Delivers `event` to every listener and returns how many of them
    /// panicked.
    ///
    /// A panic is contained to the listener that raised it: later listeners
    /// still run and the caller (a forwarded operation or a reconnect task)
    /// carries on.
    pub fn emit(&self, event: &E) -> usize {
        let mut panicked = 0;
        for listener in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| listener.on_event(event))).is_err() {
                panicked += 1;

                #[cfg(feature = "tracing")]
                warn!(
                    connection = event.connection_name(),
                    event_type = event.event_type(),
                    "Event listener panicked"
                );
            }
        }
        panicked
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: HealingEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: HealingEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Adapts a closure into an [`EventListener`].
pub struct FnListener<F> {
    f: F,
}

impl<F> FnListener<F> {
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<E, F> EventListener<E> for FnListener<F>
where
    E: HealingEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

impl<F> fmt::Debug for FnListener<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnListener")
    }
}
