//! Connection state tracking for the reconnect coordinator.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Connection state information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected and healthy
    Healthy,

    /// A terminal fault was classified, or the last reconnect attempt failed
    Faulted,

    /// A reconnect attempt is running
    Reconnecting,
}

impl ConnectionState {
    /// Returns a stable, lowercase name for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Healthy => "healthy",
            ConnectionState::Faulted => "faulted",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

/// Shared reconnection state and statistics
#[derive(Clone)]
pub struct ReconnectState {
    /// Current connection state
    state: Arc<AtomicU8>,

    /// Attempt number within the running reconnect cycle (0 when idle)
    attempts: Arc<AtomicU32>,

    /// Terminal faults reported by forwarders, stale or not
    faults: Arc<AtomicU64>,

    /// Reports ignored because their generation was already replaced
    stale_reports: Arc<AtomicU64>,

    /// Reports that found a reconnect already claimed for their generation
    joined_reports: Arc<AtomicU64>,

    /// Reconnect cycles claimed
    reconnects_started: Arc<AtomicU64>,

    /// Reconnect cycles that installed a new connection
    reconnects_completed: Arc<AtomicU64>,

    /// Reference point for `unhealthy_since`
    created: Instant,

    /// Millis since `created` (plus one) at which the connection last left
    /// healthy, or 0 while healthy
    unhealthy_since: Arc<AtomicU64>,
}

impl ReconnectState {
    /// Create a new reconnect state, starting healthy
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(Self::encode_state(ConnectionState::Healthy))),
            attempts: Arc::new(AtomicU32::new(0)),
            faults: Arc::new(AtomicU64::new(0)),
            stale_reports: Arc::new(AtomicU64::new(0)),
            joined_reports: Arc::new(AtomicU64::new(0)),
            reconnects_started: Arc::new(AtomicU64::new(0)),
            reconnects_completed: Arc::new(AtomicU64::new(0)),
            created: Instant::now(),
            unhealthy_since: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get the current connection state
    pub fn state(&self) -> ConnectionState {
        Self::decode_state(self.state.load(Ordering::Acquire))
    }

    /// Set the connection state
    ///
    /// Leaving `Healthy` starts the clock read by
    /// [`time_since_healthy`](Self::time_since_healthy); entering it stops it.
    pub fn set_state(&self, state: ConnectionState) {
        let previous = self.state.swap(Self::encode_state(state), Ordering::AcqRel);
        let was_healthy = Self::decode_state(previous) == ConnectionState::Healthy;

        match state {
            ConnectionState::Healthy => self.unhealthy_since.store(0, Ordering::Release),
            _ if was_healthy => {
                let millis = self.created.elapsed().as_millis() as u64 + 1;
                self.unhealthy_since.store(millis, Ordering::Release);
            }
            _ => {}
        }
    }

    /// Get the attempt number within the running cycle
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Increment and return the attempt number
    pub fn increment_attempts(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Reset attempts to zero
    pub fn reset_attempts(&self) {
        self.attempts.store(0, Ordering::Release);
    }

    /// Number of terminal faults reported
    pub fn fault_count(&self) -> u64 {
        self.faults.load(Ordering::Acquire)
    }

    /// Number of reports ignored as stale
    pub fn stale_reports(&self) -> u64 {
        self.stale_reports.load(Ordering::Acquire)
    }

    /// Number of reports that joined an already claimed reconnect
    pub fn joined_reports(&self) -> u64 {
        self.joined_reports.load(Ordering::Acquire)
    }

    /// Number of reconnect cycles claimed
    pub fn reconnects_started(&self) -> u64 {
        self.reconnects_started.load(Ordering::Acquire)
    }

    /// Number of reconnect cycles that installed a new connection
    pub fn reconnects_completed(&self) -> u64 {
        self.reconnects_completed.load(Ordering::Acquire)
    }

    pub(crate) fn record_fault(&self) {
        self.faults.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_stale(&self) {
        self.stale_reports.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_joined(&self) {
        self.joined_reports.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_reconnect_started(&self) {
        self.reconnects_started.fetch_add(1, Ordering::AcqRel);
    }

    /// Mark connection as healthy after a reconnect
    pub fn mark_healthy(&self) {
        self.set_state(ConnectionState::Healthy);
        self.reset_attempts();
        self.reconnects_completed.fetch_add(1, Ordering::AcqRel);
    }

    /// Mark connection as faulted
    pub fn mark_faulted(&self) {
        self.set_state(ConnectionState::Faulted);
    }

    /// Mark connection as reconnecting
    pub fn mark_reconnecting(&self) {
        self.set_state(ConnectionState::Reconnecting);
    }

    /// Get time since the connection was last known healthy
    ///
    /// Zero while healthy. Otherwise measured from the moment the connection
    /// left `Healthy`, across any number of failed reconnect attempts.
    pub fn time_since_healthy(&self) -> Duration {
        match self.unhealthy_since.load(Ordering::Acquire) {
            0 => Duration::ZERO,
            since => {
                let left = Duration::from_millis(since - 1);
                self.created.elapsed().saturating_sub(left)
            }
        }
    }

    fn encode_state(state: ConnectionState) -> u8 {
        match state {
            ConnectionState::Healthy => 0,
            ConnectionState::Faulted => 1,
            ConnectionState::Reconnecting => 2,
        }
    }

    fn decode_state(encoded: u8) -> ConnectionState {
        match encoded {
            0 => ConnectionState::Healthy,
            1 => ConnectionState::Faulted,
            _ => ConnectionState::Reconnecting,
        }
    }
}

impl Default for ReconnectState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReconnectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectState")
            .field("state", &self.state())
            .field("attempts", &self.attempts())
            .field("faults", &self.fault_count())
            .field("reconnects_completed", &self.reconnects_completed())
            .finish()
    }
}
