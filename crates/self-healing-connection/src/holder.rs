//! The atomically swappable slot holding the current connection.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// One live connection instance tagged with its generation.
///
/// Handles are immutable once issued. Callers hold an `Arc` to the handle for
/// the duration of a call, so a connection replaced by a reconnect is dropped
/// only after the last in-flight call using it has finished.
pub struct ConnectionHandle<C> {
    connection: C,
    generation: u64,
}

impl<C> ConnectionHandle<C> {
    /// Creates a handle for the given connection and generation.
    pub fn new(connection: C, generation: u64) -> Self {
        Self {
            connection,
            generation,
        }
    }

    /// Returns the wrapped connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Returns the generation this connection was issued at.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<C> Deref for ConnectionHandle<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.connection
    }
}

impl<C> fmt::Debug for ConnectionHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Rejected swap: the offered handle is not newer than the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("generation {offered} is not newer than current generation {current}")]
pub struct StaleGeneration {
    /// Generation currently held.
    pub current: u64,
    /// Generation that was offered.
    pub offered: u64,
}

/// Holds the current [`ConnectionHandle`].
///
/// Reads are lock-free and never block behind a swap; a swap is a single
/// atomic pointer replacement, so readers see either the old or the new
/// handle, never a mix. Writers serialize on a narrow lock so generations
/// only move forward.
pub struct ConnectionHolder<C> {
    slot: ArcSwap<ConnectionHandle<C>>,
    writer: Mutex<()>,
}

impl<C> ConnectionHolder<C> {
    /// Creates a holder whose first handle has generation 0.
    pub fn new(connection: C) -> Self {
        Self::with_generation(connection, 0)
    }

    /// Creates a holder starting at an arbitrary generation.
    pub fn with_generation(connection: C, generation: u64) -> Self {
        Self {
            slot: ArcSwap::from_pointee(ConnectionHandle::new(connection, generation)),
            writer: Mutex::new(()),
        }
    }

    /// Returns the current handle.
    pub fn current(&self) -> Arc<ConnectionHandle<C>> {
        self.slot.load_full()
    }

    /// Returns the current generation without cloning the handle.
    pub fn generation(&self) -> u64 {
        self.slot.load().generation
    }

    /// Atomically replaces the current handle.
    ///
    /// Returns the previous handle; it stays alive for as long as in-flight
    /// calls still hold it. A handle whose generation is not strictly greater
    /// than the current one is rejected.
    pub fn swap(
        &self,
        handle: ConnectionHandle<C>,
    ) -> Result<Arc<ConnectionHandle<C>>, StaleGeneration> {
        let _writer = self.writer.lock();

        let current = self.generation();
        if handle.generation <= current {
            return Err(StaleGeneration {
                current,
                offered: handle.generation,
            });
        }

        Ok(self.slot.swap(Arc::new(handle)))
    }

    /// Installs a new connection at the next generation and returns the new
    /// handle.
    pub fn advance(&self, connection: C) -> Arc<ConnectionHandle<C>> {
        let _writer = self.writer.lock();

        let next = Arc::new(ConnectionHandle::new(connection, self.generation() + 1));
        self.slot.store(Arc::clone(&next));
        next
    }
}

impl<C> fmt::Debug for ConnectionHolder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHolder")
            .field("generation", &self.generation())
            .finish()
    }
}
