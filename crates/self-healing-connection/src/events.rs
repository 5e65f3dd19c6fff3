use self_healing_core::{FaultKind, HealingEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Notification that a connection was regenerated after a terminal fault.
///
/// Exactly one `FaultEvent` is published per generation transition, and each
/// subscriber receives them in generation order. Delivery is bounded by the
/// configured `event_capacity`: a subscriber that falls further behind loses
/// the oldest events and is told so by
/// [`SubscriptionError::Lagged`](crate::SubscriptionError::Lagged), except on
/// the lossy [`FaultSubscription::into_stream`](crate::FaultSubscription::into_stream).
/// Subscribers use it for work that does not survive a reconnect, such as
/// re-subscribing pub/sub channels.
#[derive(Debug, Clone)]
pub struct FaultEvent {
    /// Name of the connection.
    pub connection_name: Arc<str>,
    /// When the new connection was installed.
    pub timestamp: Instant,
    /// Generation at which the fault was reported.
    pub generation: u64,
    /// Generation of the connection that replaced it.
    pub new_generation: u64,
    /// Classified kind of the fault that started the reconnect.
    pub kind: FaultKind,
    /// Operation that observed the fault.
    pub operation: &'static str,
    /// Attempts needed to establish the new connection.
    pub attempts: u32,
}

impl HealingEvent for FaultEvent {
    fn event_type(&self) -> &'static str {
        "fault"
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn connection_name(&self) -> &str {
        &self.connection_name
    }
}

/// Lifecycle events emitted to the listeners registered on the config.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// A forwarded operation failed with a terminal fault.
    FaultReported {
        connection_name: Arc<str>,
        timestamp: Instant,
        operation: &'static str,
        generation: u64,
        kind: FaultKind,
    },
    /// A fault report was ignored because its generation was already
    /// replaced.
    StaleReport {
        connection_name: Arc<str>,
        timestamp: Instant,
        operation: &'static str,
        generation: u64,
        current_generation: u64,
    },
    /// A reconnect attempt is starting.
    ReconnectAttempt {
        connection_name: Arc<str>,
        timestamp: Instant,
        generation: u64,
        attempt: u32,
    },
    /// A reconnect attempt failed; the next one runs after `delay`.
    ReconnectFailed {
        connection_name: Arc<str>,
        timestamp: Instant,
        generation: u64,
        attempt: u32,
        delay: Duration,
    },
    /// A new connection was installed.
    Reconnected {
        connection_name: Arc<str>,
        timestamp: Instant,
        generation: u64,
        attempts: u32,
    },
    /// The cycle stopped after exhausting the configured attempts.
    ReconnectAbandoned {
        connection_name: Arc<str>,
        timestamp: Instant,
        generation: u64,
        attempts: u32,
    },
}

impl HealingEvent for ConnectionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ConnectionEvent::FaultReported { .. } => "fault_reported",
            ConnectionEvent::StaleReport { .. } => "stale_report",
            ConnectionEvent::ReconnectAttempt { .. } => "reconnect_attempt",
            ConnectionEvent::ReconnectFailed { .. } => "reconnect_failed",
            ConnectionEvent::Reconnected { .. } => "reconnected",
            ConnectionEvent::ReconnectAbandoned { .. } => "reconnect_abandoned",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ConnectionEvent::FaultReported { timestamp, .. }
            | ConnectionEvent::StaleReport { timestamp, .. }
            | ConnectionEvent::ReconnectAttempt { timestamp, .. }
            | ConnectionEvent::ReconnectFailed { timestamp, .. }
            | ConnectionEvent::Reconnected { timestamp, .. }
            | ConnectionEvent::ReconnectAbandoned { timestamp, .. } => *timestamp,
        }
    }

    fn connection_name(&self) -> &str {
        match self {
            ConnectionEvent::FaultReported {
                connection_name, ..
            }
            | ConnectionEvent::StaleReport {
                connection_name, ..
            }
            | ConnectionEvent::ReconnectAttempt {
                connection_name, ..
            }
            | ConnectionEvent::ReconnectFailed {
                connection_name, ..
            }
            | ConnectionEvent::Reconnected {
                connection_name, ..
            }
            | ConnectionEvent::ReconnectAbandoned {
                connection_name, ..
            } => connection_name,
        }
    }
}
