use crate::classifier::Classification;
use crate::config::SelfHealingConfig;
use crate::connector::Connector;
use crate::coordinator::{FaultReport, ReconnectCoordinator};
use crate::holder::ConnectionHandle;
use crate::state::{ConnectionState, ReconnectState};
use crate::subscription::FaultSubscription;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use metrics::counter;

#[cfg(feature = "tracing")]
use tracing::debug;

/// A connection that replaces itself after terminal faults.
///
/// Operations are forwarded to the current connection with
/// [`execute`](Self::execute). Results pass through untouched; when an error
/// is classified terminal, a reconnect is scheduled in the background and the
/// original error is still returned to the caller. Calls made while a
/// reconnect is running keep using the old connection and may fail with the
/// same fault; they never wait for the reconnect.
///
/// Cloning is cheap and every clone shares the same underlying connection.
///
/// # Examples
///
/// ```
/// use self_healing_connection::{connector_fn, SelfHealingConfig, SelfHealingConnection};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), std::io::Error> {
/// let connector = connector_fn(|| async { Ok::<_, std::io::Error>(vec![1u8, 2, 3]) });
/// let config = SelfHealingConfig::builder().name("bytes").build();
/// let connection = SelfHealingConnection::connect(connector, config).await?;
///
/// let len = connection
///     .execute("LEN", |bytes| Box::pin(async move { Ok(bytes.len()) }))
///     .await?;
/// assert_eq!(len, 3);
/// # Ok(())
/// # }
/// ```
pub struct SelfHealingConnection<K: Connector> {
    coordinator: ReconnectCoordinator<K>,
}

/// The result of a forwarded call tagged with the generation it ran against.
#[derive(Debug)]
pub struct Forwarded<T> {
    /// Generation of the connection that served the call.
    pub generation: u64,
    /// Fault report filed for the call, if it failed terminally.
    pub report: Option<FaultReport>,
    /// The call's own result.
    pub result: T,
}

impl<T> Forwarded<T> {
    /// Discards the tags and returns the result.
    pub fn into_inner(self) -> T {
        self.result
    }
}

impl<K: Connector> Clone for SelfHealingConnection<K> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<K: Connector> SelfHealingConnection<K> {
    /// Establishes the first connection and wraps it.
    ///
    /// Fails with the connector's error if the first connection cannot be
    /// made; no background reconnect is attempted at construction.
    pub async fn connect(
        connector: K,
        config: SelfHealingConfig<K::Error>,
    ) -> Result<Self, K::Error> {
        let connection = connector.connect().await?;

        #[cfg(feature = "tracing")]
        debug!(connection = %config.name, "Connected");

        Ok(Self::with_connection(connector, connection, config))
    }

    /// Wraps an already established connection at generation 0.
    pub fn with_connection(
        connector: K,
        connection: K::Connection,
        config: SelfHealingConfig<K::Error>,
    ) -> Self {
        Self {
            coordinator: ReconnectCoordinator::new(connector, connection, config),
        }
    }

    /// Forwards one operation to the current connection.
    ///
    /// `operation` names the call in events and logs. The closure receives
    /// the current connection and must return its future boxed.
    pub async fn execute<T, F>(&self, operation: &'static str, f: F) -> Result<T, K::Error>
    where
        F: for<'c> FnOnce(&'c K::Connection) -> BoxFuture<'c, Result<T, K::Error>>,
    {
        self.execute_tagged(operation, f).await.into_inner()
    }

    /// Like [`execute`](Self::execute), also returning the generation the call
    /// ran against and the outcome of any fault report.
    pub async fn execute_tagged<T, F>(
        &self,
        operation: &'static str,
        f: F,
    ) -> Forwarded<Result<T, K::Error>>
    where
        F: for<'c> FnOnce(&'c K::Connection) -> BoxFuture<'c, Result<T, K::Error>>,
    {
        let handle = self.coordinator.current();
        let generation = handle.generation();
        let result = f(handle.connection()).await;

        let report = match &result {
            Ok(_) => None,
            Err(error) => self.observe_error(generation, operation, error),
        };

        Forwarded {
            generation,
            report,
            result,
        }
    }

    fn observe_error(
        &self,
        generation: u64,
        operation: &'static str,
        error: &K::Error,
    ) -> Option<FaultReport> {
        match self.coordinator.config().classify(error) {
            Classification::Terminal(kind) => {
                #[cfg(feature = "metrics")]
                counter!(
                    "selfheal_faults_total",
                    "connection" => self.name().to_string(),
                    "class" => "terminal",
                    "kind" => kind.as_str()
                )
                .increment(1);

                Some(self.coordinator.report_fault(generation, operation, kind))
            }
            Classification::NonTerminal(_kind) => {
                #[cfg(feature = "tracing")]
                debug!(
                    connection = %self.name(),
                    operation,
                    generation,
                    kind = %_kind,
                    "Non-terminal error passed through"
                );

                #[cfg(feature = "metrics")]
                counter!(
                    "selfheal_faults_total",
                    "connection" => self.name().to_string(),
                    "class" => "non_terminal",
                    "kind" => _kind.as_str()
                )
                .increment(1);

                None
            }
        }
    }

    /// Returns the connection name.
    pub fn name(&self) -> &str {
        self.coordinator.name()
    }

    /// Returns the current connection handle.
    ///
    /// Use this for calls that should not be monitored; errors from such
    /// calls can be reported manually with
    /// [`ReconnectCoordinator::report_fault`].
    pub fn current(&self) -> Arc<ConnectionHandle<K::Connection>> {
        self.coordinator.current()
    }

    /// Returns the current generation.
    pub fn generation(&self) -> u64 {
        self.coordinator.generation()
    }

    /// Returns the current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.coordinator.connection_state()
    }

    /// Returns the shared state and statistics.
    pub fn state(&self) -> &ReconnectState {
        self.coordinator.state()
    }

    /// Subscribes to fault events published after this call.
    pub fn subscribe(&self) -> FaultSubscription {
        self.coordinator.subscribe()
    }

    /// Returns the reconnect coordinator.
    pub fn coordinator(&self) -> &ReconnectCoordinator<K> {
        &self.coordinator
    }
}

impl<K: Connector> fmt::Debug for SelfHealingConnection<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfHealingConnection")
            .field("name", &self.name())
            .field("generation", &self.generation())
            .field("state", &self.connection_state())
            .finish()
    }
}
