//! A named registry of self-healing connections.

use crate::connection::SelfHealingConnection;
use crate::connector::Connector;
use crate::error::{SubscriptionError, SupervisorError};
use crate::events::FaultEvent;
use crate::state::ConnectionState;
use futures::stream::{BoxStream, StreamExt};
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Point-in-time view of one supervised connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Registered name.
    pub name: String,
    /// Current generation.
    pub generation: u64,
    /// Current state.
    pub state: ConnectionState,
    /// Terminal faults reported.
    pub faults: u64,
    /// Reconnect cycles that installed a new connection.
    pub reconnects: u64,
    /// Attempt number of the running reconnect cycle, 0 when idle.
    pub attempts: u32,
    /// Time since the connection was last known healthy.
    pub time_since_healthy: Duration,
}

/// Owns a set of self-healing connections sharing one connector type.
///
/// # Examples
///
/// ```
/// use self_healing_connection::{
///     connector_fn, ConnectionSupervisor, SelfHealingConfig, SelfHealingConnection,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let supervisor = ConnectionSupervisor::new();
///
/// for name in ["cache", "sessions"] {
///     let connector = connector_fn(|| async { Ok::<_, std::io::Error>(()) });
///     let config = SelfHealingConfig::builder().name(name).build();
///     supervisor.register(SelfHealingConnection::connect(connector, config).await?)?;
/// }
///
/// assert_eq!(supervisor.names(), vec!["cache", "sessions"]);
/// assert!(supervisor.is_healthy());
/// # Ok(())
/// # }
/// ```
pub struct ConnectionSupervisor<K: Connector> {
    connections: RwLock<HashMap<String, SelfHealingConnection<K>>>,
}

impl<K: Connector> ConnectionSupervisor<K> {
    /// Creates an empty supervisor.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a connection under its configured name.
    pub fn register(&self, connection: SelfHealingConnection<K>) -> Result<(), SupervisorError> {
        let name = connection.name().to_string();
        self.register_as(name, connection)
    }

    /// Registers a connection under an explicit name.
    pub fn register_as(
        &self,
        name: impl Into<String>,
        connection: SelfHealingConnection<K>,
    ) -> Result<(), SupervisorError> {
        let name = name.into();
        let mut connections = self.connections.write();
        if connections.contains_key(&name) {
            return Err(SupervisorError::DuplicateName(name));
        }

        #[cfg(feature = "tracing")]
        debug!(connection = %name, "Registered connection");

        connections.insert(name, connection);
        Ok(())
    }

    /// Returns the connection registered under `name`.
    pub fn get(&self, name: &str) -> Option<SelfHealingConnection<K>> {
        self.connections.read().get(name).cloned()
    }

    /// Like [`get`](Self::get), failing for unknown names.
    pub fn connection(&self, name: &str) -> Result<SelfHealingConnection<K>, SupervisorError> {
        self.get(name)
            .ok_or_else(|| SupervisorError::UnknownConnection(name.to_string()))
    }

    /// Removes and returns the connection registered under `name`.
    ///
    /// Dropping the returned value (and every other clone) stops any
    /// reconnect in progress for it.
    pub fn remove(&self, name: &str) -> Result<SelfHealingConnection<K>, SupervisorError> {
        self.connections
            .write()
            .remove(name)
            .ok_or_else(|| SupervisorError::UnknownConnection(name.to_string()))
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Returns true if no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Returns a status snapshot of every connection, sorted by name.
    pub fn status(&self) -> Vec<ConnectionStatus> {
        let mut status: Vec<ConnectionStatus> = self
            .connections
            .read()
            .iter()
            .map(|(name, connection)| {
                let state = connection.state();
                ConnectionStatus {
                    name: name.clone(),
                    generation: connection.generation(),
                    state: state.state(),
                    faults: state.fault_count(),
                    reconnects: state.reconnects_completed(),
                    attempts: state.attempts(),
                    time_since_healthy: state.time_since_healthy(),
                }
            })
            .collect();
        status.sort_by(|a, b| a.name.cmp(&b.name));
        status
    }

    /// Returns true if every registered connection is healthy.
    pub fn is_healthy(&self) -> bool {
        self.connections
            .read()
            .values()
            .all(|connection| connection.connection_state() == ConnectionState::Healthy)
    }

    /// Returns one stream of fault events from every connection registered
    /// at the time of the call.
    ///
    /// Events of one connection stay in generation order; events of
    /// different connections interleave. Lossy: events a lagging subscriber
    /// missed are skipped, see [`subscribe_results`](Self::subscribe_results).
    pub fn subscribe(&self) -> BoxStream<'static, FaultEvent> {
        let streams: Vec<BoxStream<'static, FaultEvent>> = self
            .connections
            .read()
            .values()
            .map(|connection| connection.subscribe().into_stream().boxed())
            .collect();
        futures::stream::select_all(streams).boxed()
    }

    /// Like [`subscribe`](Self::subscribe), yielding
    /// `Err(SubscriptionError::Lagged(n))` in place of events a connection's
    /// stream lost. The error does not say which connection lagged.
    pub fn subscribe_results(&self) -> BoxStream<'static, Result<FaultEvent, SubscriptionError>> {
        let streams: Vec<BoxStream<'static, Result<FaultEvent, SubscriptionError>>> = self
            .connections
            .read()
            .values()
            .map(|connection| connection.subscribe().into_results_stream().boxed())
            .collect();
        futures::stream::select_all(streams).boxed()
    }
}

impl<K: Connector> Default for ConnectionSupervisor<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Connector> std::fmt::Debug for ConnectionSupervisor<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("connections", &self.names())
            .finish()
    }
}
