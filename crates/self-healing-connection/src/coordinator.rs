//! Single-flight reconnect coordination.
//!
//! Every terminal fault is reported together with the generation the failing
//! operation ran against. The first report for the current generation claims
//! the reconnect and spawns the reconnect task; concurrent reports for the
//! same generation join it, and reports for replaced generations are ignored.

use crate::config::SelfHealingConfig;
use crate::connector::Connector;
use crate::events::{ConnectionEvent, FaultEvent};
use crate::holder::{ConnectionHandle, ConnectionHolder};
use crate::state::{ConnectionState, ReconnectState};
use crate::subscription::FaultSubscription;
use parking_lot::Mutex;
use self_healing_core::FaultKind;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

/// Outcome of [`ReconnectCoordinator::report_fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultReport {
    /// The report started the reconnect for its generation.
    Claimed,
    /// A reconnect for the reported generation was already running.
    Joined,
    /// The reported generation is not the current one; nothing happened.
    Stale,
}

impl FaultReport {
    /// Returns a stable, lowercase name for this outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultReport::Claimed => "claimed",
            FaultReport::Joined => "joined",
            FaultReport::Stale => "stale",
        }
    }
}

/// Owns the current connection and drives reconnects.
///
/// Cloning is cheap; clones share the same connection, state and event
/// channel. The reconnect task only holds a weak reference, so dropping the
/// last clone stops any reconnect in progress.
pub struct ReconnectCoordinator<K: Connector> {
    shared: Arc<Shared<K>>,
}

struct Shared<K: Connector> {
    holder: ConnectionHolder<K::Connection>,
    connector: K,
    config: SelfHealingConfig<K::Error>,
    state: ReconnectState,
    // Lowest generation whose reconnect has not been claimed yet. Equals the
    // current generation while healthy and runs one ahead while a reconnect
    // is in flight.
    next_claim: AtomicU64,
    // Held while a new connection is installed and its event published, so
    // subscribers see events in generation order.
    publish: Mutex<()>,
    events: broadcast::Sender<FaultEvent>,
}

impl<K: Connector> Clone for ReconnectCoordinator<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K: Connector> ReconnectCoordinator<K> {
    /// Creates a coordinator around an established connection at generation 0.
    pub fn new(
        connector: K,
        connection: K::Connection,
        config: SelfHealingConfig<K::Error>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);

        #[cfg(feature = "metrics")]
        gauge!("selfheal_generation", "connection" => config.name.to_string()).set(0.0);

        Self {
            shared: Arc::new(Shared {
                holder: ConnectionHolder::new(connection),
                connector,
                config,
                state: ReconnectState::new(),
                next_claim: AtomicU64::new(0),
                publish: Mutex::new(()),
                events,
            }),
        }
    }

    /// Returns the connection name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SelfHealingConfig<K::Error> {
        &self.shared.config
    }

    /// Returns the current connection handle.
    pub fn current(&self) -> Arc<ConnectionHandle<K::Connection>> {
        self.shared.holder.current()
    }

    /// Returns the current generation.
    pub fn generation(&self) -> u64 {
        self.shared.holder.generation()
    }

    /// Returns the shared state and statistics.
    pub fn state(&self) -> &ReconnectState {
        &self.shared.state
    }

    /// Returns the current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state.state()
    }

    /// Subscribes to fault events published after this call.
    pub fn subscribe(&self) -> FaultSubscription {
        FaultSubscription::new(self.shared.events.subscribe())
    }

    /// Returns the number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.events.receiver_count()
    }

    /// Reports a terminal fault observed on the connection of `generation`.
    ///
    /// Never blocks on connection establishment. At most one reconnect runs
    /// per generation no matter how many callers report it.
    pub fn report_fault(
        &self,
        generation: u64,
        operation: &'static str,
        kind: FaultKind,
    ) -> FaultReport {
        let shared = &self.shared;
        shared.state.record_fault();
        shared.emit(ConnectionEvent::FaultReported {
            connection_name: shared.config.name.clone(),
            timestamp: Instant::now(),
            operation,
            generation,
            kind,
        });

        let current = shared.holder.generation();
        let outcome = if generation != current {
            shared.state.record_stale();
            shared.emit(ConnectionEvent::StaleReport {
                connection_name: shared.config.name.clone(),
                timestamp: Instant::now(),
                operation,
                generation,
                current_generation: current,
            });

            #[cfg(feature = "tracing")]
            debug!(
                connection = %shared.config.name,
                operation,
                generation,
                current,
                "Ignoring fault report for replaced generation"
            );

            FaultReport::Stale
        } else if shared
            .next_claim
            .compare_exchange(generation, generation + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            shared.state.record_reconnect_started();
            {
                let _publish = shared.publish.lock();
                shared.state.mark_faulted();
            }

            #[cfg(feature = "tracing")]
            info!(
                connection = %shared.config.name,
                operation,
                generation,
                kind = %kind,
                "Terminal fault, reconnecting"
            );

            #[cfg(feature = "metrics")]
            gauge!("selfheal_state", "connection" => shared.config.name.to_string()).set(1.0);

            self.spawn_reconnect(generation, operation, kind);
            FaultReport::Claimed
        } else {
            shared.state.record_joined();

            #[cfg(feature = "tracing")]
            debug!(
                connection = %shared.config.name,
                operation,
                generation,
                "Reconnect already in flight"
            );

            FaultReport::Joined
        };

        #[cfg(feature = "metrics")]
        counter!(
            "selfheal_fault_reports_total",
            "connection" => shared.config.name.to_string(),
            "outcome" => outcome.as_str()
        )
        .increment(1);

        outcome
    }

    fn spawn_reconnect(&self, generation: u64, operation: &'static str, kind: FaultKind) {
        let weak = Arc::downgrade(&self.shared);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(reconnect(weak, generation, operation, kind));
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                warn!(
                    connection = %self.shared.config.name,
                    generation,
                    "No tokio runtime available, reconnect not started"
                );
                self.shared.release_claim(generation);
            }
        }
    }
}

impl<K: Connector> fmt::Debug for ReconnectCoordinator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconnectCoordinator")
            .field("name", &self.shared.config.name)
            .field("generation", &self.generation())
            .field("state", &self.connection_state())
            .finish()
    }
}

impl<K: Connector> Shared<K> {
    fn emit(&self, event: ConnectionEvent) {
        if !self.config.event_listeners.is_empty() {
            self.config.event_listeners.emit(&event);
        }
    }

    fn release_claim(&self, generation: u64) {
        // Only the claimer moves next_claim off generation + 1.
        let _ = self.next_claim.compare_exchange(
            generation + 1,
            generation,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn begin_attempt(&self, generation: u64, attempt: u32) {
        {
            let _publish = self.publish.lock();
            self.state.mark_reconnecting();
        }

        #[cfg(feature = "tracing")]
        debug!(
            connection = %self.config.name,
            generation,
            attempt,
            "Reconnect attempt"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "selfheal_reconnect_attempts_total",
                "connection" => self.config.name.to_string()
            )
            .increment(1);
            gauge!("selfheal_state", "connection" => self.config.name.to_string()).set(2.0);
        }

        self.emit(ConnectionEvent::ReconnectAttempt {
            connection_name: self.config.name.clone(),
            timestamp: Instant::now(),
            generation,
            attempt,
        });
    }

    fn attempt_failed(&self, generation: u64, attempt: u32, delay: Duration, _error: &K::Error) {
        {
            let _publish = self.publish.lock();
            self.state.mark_faulted();
        }

        #[cfg(feature = "tracing")]
        warn!(
            connection = %self.config.name,
            generation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = ?_error,
            "Reconnect attempt failed"
        );

        #[cfg(feature = "metrics")]
        gauge!("selfheal_state", "connection" => self.config.name.to_string()).set(1.0);

        self.emit(ConnectionEvent::ReconnectFailed {
            connection_name: self.config.name.clone(),
            timestamp: Instant::now(),
            generation,
            attempt,
            delay,
        });
    }

    fn abandon(&self, generation: u64, attempts: u32, _error: &K::Error) {
        {
            let _publish = self.publish.lock();
            self.state.mark_faulted();
            self.state.reset_attempts();
            self.release_claim(generation);
        }

        #[cfg(feature = "tracing")]
        warn!(
            connection = %self.config.name,
            generation,
            attempts,
            error = ?_error,
            "Giving up on reconnect until the next fault"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "selfheal_reconnects_total",
                "connection" => self.config.name.to_string(),
                "outcome" => "abandoned"
            )
            .increment(1);
            gauge!("selfheal_state", "connection" => self.config.name.to_string()).set(1.0);
        }

        self.emit(ConnectionEvent::ReconnectAbandoned {
            connection_name: self.config.name.clone(),
            timestamp: Instant::now(),
            generation,
            attempts,
        });
    }

    fn install(
        &self,
        connection: K::Connection,
        generation: u64,
        operation: &'static str,
        kind: FaultKind,
        attempts: u32,
    ) {
        let new_generation = {
            let _publish = self.publish.lock();
            let handle = self.holder.advance(connection);
            self.state.mark_healthy();

            let event = FaultEvent {
                connection_name: self.config.name.clone(),
                timestamp: Instant::now(),
                generation,
                new_generation: handle.generation(),
                kind,
                operation,
                attempts,
            };
            // Err only means nobody is subscribed.
            let _ = self.events.send(event);
            handle.generation()
        };

        #[cfg(feature = "tracing")]
        info!(
            connection = %self.config.name,
            generation = new_generation,
            attempts,
            "Reconnected"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "selfheal_reconnects_total",
                "connection" => self.config.name.to_string(),
                "outcome" => "success"
            )
            .increment(1);
            gauge!("selfheal_generation", "connection" => self.config.name.to_string())
                .set(new_generation as f64);
            gauge!("selfheal_state", "connection" => self.config.name.to_string()).set(0.0);
        }

        self.emit(ConnectionEvent::Reconnected {
            connection_name: self.config.name.clone(),
            timestamp: Instant::now(),
            generation: new_generation,
            attempts,
        });
    }
}

/// Runs one reconnect cycle for `generation`.
///
/// The first attempt starts immediately; after the k-th failure the task
/// sleeps for the policy's k-th delay. The cycle ends when a connection is
/// installed, when `max_attempts` is exhausted, or when every handle to the
/// connection has been dropped.
async fn reconnect<K: Connector>(
    shared: Weak<Shared<K>>,
    generation: u64,
    operation: &'static str,
    kind: FaultKind,
) {
    loop {
        let Some(strong) = shared.upgrade() else {
            return;
        };
        let attempt = strong.state.increment_attempts();
        strong.begin_attempt(generation, attempt);
        let connecting = strong.connector.connect();
        drop(strong);

        let result = connecting.await;

        let Some(strong) = shared.upgrade() else {
            return;
        };
        match result {
            Ok(connection) => {
                strong.install(connection, generation, operation, kind, attempt);
                return;
            }
            Err(error) => {
                if strong.config.max_attempts.is_some_and(|max| attempt >= max) {
                    strong.abandon(generation, attempt, &error);
                    return;
                }

                let delay = strong
                    .config
                    .policy
                    .delay_for_attempt(attempt.saturating_sub(1) as usize);
                strong.attempt_failed(generation, attempt, delay, &error);
                drop(error);
                drop(strong);

                tokio::time::sleep(delay).await;
            }
        }
    }
}
