//! Fault classification for [`RedisError`].

use redis::{ErrorKind, RedisError};
use self_healing_connection::{Classification, FaultClassifier, KindClassifier};
use self_healing_core::FaultKind;

/// Maps a Redis error onto the fault taxonomy.
///
/// Transport failures are recognized from the client's own predicates;
/// server replies are mapped from their error kind and code.
pub fn fault_kind(error: &RedisError) -> FaultKind {
    if error.is_timeout() {
        return FaultKind::Timeout;
    }
    if error.is_connection_dropped() {
        return FaultKind::ConnectionReset;
    }
    if error.is_connection_refusal() || error.is_io_error() {
        return FaultKind::TransportClosed;
    }

    match error.code() {
        Some("NOAUTH") | Some("WRONGPASS") | Some("NOPERM") => {
            return FaultKind::AuthenticationExpired;
        }
        Some("WRONGTYPE") => return FaultKind::WrongType,
        _ => {}
    }

    match error.kind() {
        ErrorKind::AuthenticationFailed => FaultKind::AuthenticationExpired,
        ErrorKind::TypeError => FaultKind::WrongType,
        ErrorKind::ParseError => FaultKind::ProtocolCorruption,
        ErrorKind::ResponseError
        | ErrorKind::ExecAbortError
        | ErrorKind::NoScriptError
        | ErrorKind::BusyLoadingError
        | ErrorKind::ReadOnly
        | ErrorKind::ClientError
        | ErrorKind::InvalidClientConfig => FaultKind::Operation,
        ErrorKind::IoError => FaultKind::TransportClosed,
        _ => FaultKind::Unclassified,
    }
}

/// Classifies Redis errors by [`fault_kind`].
///
/// The default terminal set is the one of [`KindClassifier::default`]:
/// dropped and refused connections, authentication failures, protocol
/// corruption and anything unrecognized. A missing key is never an error in
/// Redis (`GET` returns nil), so it needs no special casing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisClassifier {
    kinds: KindClassifier,
}

impl RedisClassifier {
    /// Creates a classifier treating exactly the given kinds as terminal.
    pub fn new<I>(terminal: I) -> Self
    where
        I: IntoIterator<Item = FaultKind>,
    {
        Self {
            kinds: KindClassifier::new(terminal),
        }
    }

    /// Also treats timeouts as terminal.
    ///
    /// Useful when a stuck socket is more likely than a slow server.
    pub fn with_timeouts(self) -> Self {
        Self {
            kinds: self.kinds.with(FaultKind::Timeout),
        }
    }
}

impl FaultClassifier<RedisError> for RedisClassifier {
    fn classify(&self, error: &RedisError) -> Classification {
        self.kinds.classify_kind(fault_kind(error))
    }
}
