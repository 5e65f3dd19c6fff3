//! Error types for subscriptions and the supervisor.

use thiserror::Error;

/// Errors returned when receiving from a [`FaultSubscription`](crate::FaultSubscription).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// The subscriber fell behind and the oldest events were dropped.
    ///
    /// The subscription stays usable; the next receive returns the oldest
    /// event still retained.
    #[error("subscriber lagged behind and missed {0} fault events")]
    Lagged(u64),

    /// Every handle to the connection was dropped; no more events will arrive.
    #[error("connection dropped, no further fault events")]
    Closed,
}

/// Errors returned by [`ConnectionSupervisor`](crate::ConnectionSupervisor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    /// A connection with this name is already registered.
    #[error("connection '{0}' is already registered")]
    DuplicateName(String),

    /// No connection with this name is registered.
    #[error("no connection named '{0}'")]
    UnknownConnection(String),
}
