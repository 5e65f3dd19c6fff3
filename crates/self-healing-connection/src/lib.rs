//! Self-healing connections to remote data stores.
//!
//! A [`SelfHealingConnection`] wraps a client connection and forwards every
//! operation to it unchanged. When an operation fails with an error that
//! indicates the connection itself is broken, the wrapper replaces the
//! connection in the background and notifies subscribers once the new one is
//! in place.
//!
//! # How It Works
//!
//! 1. Every connection instance carries a **generation** number, starting at 0
//! 2. Operations run against the current connection and record its generation
//! 3. Failed operations are classified; only **terminal** faults (closed
//!    transport, reset, expired credentials, protocol corruption) count
//! 4. The first terminal fault for the current generation claims a reconnect;
//!    concurrent faults for the same generation join it, and faults from older
//!    generations are ignored
//! 5. The reconnect runs with backoff until a new connection is established,
//!    which is installed at generation + 1 and announced as a [`FaultEvent`]
//!
//! Callers always get their own result back. A call made while a reconnect is
//! running is served by the old connection and is never queued.
//!
//! # Example
//!
//! ```rust
//! use self_healing_connection::{
//!     connector_fn, ReconnectPolicy, SelfHealingConfig, SelfHealingConnection,
//! };
//! use std::io::{Error, ErrorKind};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Error> {
//! let connector = connector_fn(|| async { Ok::<_, Error>(String::from("session")) });
//!
//! let config = SelfHealingConfig::builder()
//!     .name("sessions")
//!     .policy(ReconnectPolicy::exponential(
//!         Duration::from_millis(50),
//!         Duration::from_secs(5),
//!     ))
//!     .on_reconnected(|generation| println!("now at generation {generation}"))
//!     .build();
//!
//! let connection = SelfHealingConnection::connect(connector, config).await?;
//! let mut faults = connection.subscribe();
//!
//! // A reset is terminal: the caller sees the error, and a reconnect starts.
//! let result = connection
//!     .execute("GET", |_session| {
//!         Box::pin(async { Err::<String, _>(Error::new(ErrorKind::ConnectionReset, "reset")) })
//!     })
//!     .await;
//! assert!(result.is_err());
//!
//! let event = faults.recv().await.expect("fault event");
//! assert_eq!(event.new_generation, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Feature Flags
//!
//! - `tracing` (default): structured logs for fault reports and reconnects
//! - `metrics`: counters and gauges through the `metrics` facade

mod backoff;
mod classifier;
mod config;
mod connection;
mod connector;
mod coordinator;
mod error;
mod events;
mod holder;
mod policy;
mod service;
mod state;
mod subscription;
mod supervisor;

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use classifier::{AlwaysTerminal, Classification, FaultClassifier, FnClassifier, KindClassifier};
pub use config::{SelfHealingConfig, SelfHealingConfigBuilder, DEFAULT_EVENT_CAPACITY};
pub use connection::{Forwarded, SelfHealingConnection};
pub use connector::{connector_fn, Connector, FnConnector};
pub use coordinator::{FaultReport, ReconnectCoordinator};
pub use error::{SubscriptionError, SupervisorError};
pub use events::{ConnectionEvent, FaultEvent};
pub use holder::{ConnectionHandle, ConnectionHolder, StaleGeneration};
pub use policy::ReconnectPolicy;
pub use state::{ConnectionState, ReconnectState};
pub use subscription::FaultSubscription;
pub use supervisor::{ConnectionStatus, ConnectionSupervisor};

pub use self_healing_core::{FaultKind, FaultTagged};

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};

#[cfg(feature = "metrics")]
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

/// Registers metric descriptions once per process.
pub(crate) fn describe_metrics() {
    #[cfg(feature = "metrics")]
    {
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "selfheal_faults_total",
                "Errors observed by forwarded operations, by classification"
            );
            describe_counter!(
                "selfheal_fault_reports_total",
                "Terminal fault reports, by outcome (claimed, joined, stale)"
            );
            describe_counter!(
                "selfheal_reconnect_attempts_total",
                "Attempts to establish a replacement connection"
            );
            describe_counter!(
                "selfheal_reconnects_total",
                "Finished reconnect cycles, by outcome (success, abandoned)"
            );
            describe_gauge!(
                "selfheal_generation",
                "Generation of the current connection"
            );
            describe_gauge!(
                "selfheal_state",
                "Connection state (0 = healthy, 1 = faulted, 2 = reconnecting)"
            );
        });
    }
}
