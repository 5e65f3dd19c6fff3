//! Fault classification for reconnect decisions.
//!
//! This module provides the [`FaultClassifier`] trait and implementations for
//! deciding whether an error raised by a wrapped operation means the
//! connection itself is unusable.
//!
//! Classification is conservative. Treating a real connection fault as an
//! ordinary error leaves every later call failing against a dead connection,
//! while the opposite mistake only costs one extra reconnect.

use self_healing_core::{FaultKind, FaultTagged};
use std::sync::Arc;

/// The verdict for one error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The connection is unusable; a reconnect is needed.
    Terminal(FaultKind),
    /// The error belongs to this call only; the connection is fine.
    NonTerminal(FaultKind),
}

impl Classification {
    /// Returns `true` if the error requires a reconnect.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Classification::Terminal(_))
    }

    /// Returns the fault kind the verdict was based on.
    pub fn kind(&self) -> FaultKind {
        match self {
            Classification::Terminal(kind) | Classification::NonTerminal(kind) => *kind,
        }
    }
}

/// Decides whether an error signals terminal connection failure.
///
/// Implementations must be pure: the same error always yields the same
/// verdict, and nothing is mutated.
pub trait FaultClassifier<E>: Send + Sync {
    /// Classifies the given error.
    fn classify(&self, error: &E) -> Classification;
}

/// Classifier treating every error as terminal.
///
/// This is the default when the wrapped client exposes no fault taxonomy:
/// every failed call triggers a (single-flight) reconnect check.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysTerminal;

impl<E> FaultClassifier<E> for AlwaysTerminal {
    fn classify(&self, _error: &E) -> Classification {
        Classification::Terminal(FaultKind::Unclassified)
    }
}

/// Classifier driven by the error's [`FaultKind`] and a configurable set of
/// terminal kinds.
///
/// The default set is: transport closed, connection reset, authentication
/// expired, protocol corruption and unclassified. Timeouts and business-level
/// errors are non-terminal.
///
/// # Example
///
/// ```rust
/// use self_healing_connection::{FaultClassifier, KindClassifier};
/// use self_healing_core::FaultKind;
/// use std::io::{Error, ErrorKind};
///
/// // Also reconnect after a timeout.
/// let classifier = KindClassifier::default().with(FaultKind::Timeout);
///
/// let timeout = Error::new(ErrorKind::TimedOut, "slow");
/// assert!(classifier.classify(&timeout).is_terminal());
///
/// let missing = Error::new(ErrorKind::NotFound, "no such key");
/// assert!(!classifier.classify(&missing).is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindClassifier {
    terminal: u16,
}

impl KindClassifier {
    /// Creates a classifier with an empty terminal set.
    pub fn none() -> Self {
        Self { terminal: 0 }
    }

    /// Creates a classifier treating exactly the given kinds as terminal.
    pub fn new<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = FaultKind>,
    {
        kinds.into_iter().fold(Self::none(), Self::with)
    }

    /// Adds a kind to the terminal set.
    pub fn with(self, kind: FaultKind) -> Self {
        Self {
            terminal: self.terminal | Self::bit(kind),
        }
    }

    /// Removes a kind from the terminal set.
    pub fn without(self, kind: FaultKind) -> Self {
        Self {
            terminal: self.terminal & !Self::bit(kind),
        }
    }

    /// Returns `true` if the kind is in the terminal set.
    pub fn is_terminal_kind(&self, kind: FaultKind) -> bool {
        self.terminal & Self::bit(kind) != 0
    }

    /// Returns the terminal set in declaration order.
    pub fn terminal_kinds(&self) -> impl Iterator<Item = FaultKind> + '_ {
        FaultKind::ALL
            .into_iter()
            .filter(move |kind| self.is_terminal_kind(*kind))
    }

    /// Classifies a bare fault kind.
    pub fn classify_kind(&self, kind: FaultKind) -> Classification {
        if self.is_terminal_kind(kind) {
            Classification::Terminal(kind)
        } else {
            Classification::NonTerminal(kind)
        }
    }

    fn bit(kind: FaultKind) -> u16 {
        1 << (kind as u16)
    }
}

impl Default for KindClassifier {
    fn default() -> Self {
        Self::new([
            FaultKind::TransportClosed,
            FaultKind::ConnectionReset,
            FaultKind::AuthenticationExpired,
            FaultKind::ProtocolCorruption,
            FaultKind::Unclassified,
        ])
    }
}

impl<E: FaultTagged> FaultClassifier<E> for KindClassifier {
    fn classify(&self, error: &E) -> Classification {
        self.classify_kind(error.fault_kind())
    }
}

/// A fault classifier backed by a closure.
///
/// Useful when the wrapped client only offers indirect signals, such as
/// status codes or message substrings.
///
/// # Example
///
/// ```rust
/// use self_healing_connection::{Classification, FaultClassifier, FnClassifier};
/// use self_healing_core::FaultKind;
///
/// let classifier = FnClassifier::new(|error: &String| {
///     if error.contains("socket closed") {
///         Classification::Terminal(FaultKind::TransportClosed)
///     } else {
///         Classification::NonTerminal(FaultKind::Operation)
///     }
/// });
///
/// assert!(classifier.classify(&"socket closed by peer".to_string()).is_terminal());
/// assert!(!classifier.classify(&"WRONGTYPE".to_string()).is_terminal());
/// ```
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: Arc<F>,
}

impl<F> FnClassifier<F> {
    /// Creates a new `FnClassifier` from the given closure.
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F, E> FaultClassifier<E> for FnClassifier<F>
where
    F: Fn(&E) -> Classification + Send + Sync,
{
    fn classify(&self, error: &E) -> Classification {
        (self.f)(error)
    }
}

impl<F> std::fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnClassifier")
            .field("f", &"<closure>")
            .finish()
    }
}
