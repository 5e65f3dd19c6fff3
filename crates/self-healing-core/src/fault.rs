//! Fault taxonomy shared by classifiers and wrapped-client bindings.
//!
//! A wrapped client exposes the category of each error it raises through
//! [`FaultTagged`]. Classifiers then decide, per configured policy, which
//! categories mean the connection itself is unusable.

use std::fmt;
use std::str::FromStr;

/// The category of an error raised by a wrapped client.
///
/// Only the category is ever inspected; the operation that failed is
/// irrelevant to classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// The transport was closed by either side or is no longer connected.
    TransportClosed,
    /// The transport was reset, aborted or hit a broken pipe.
    ConnectionReset,
    /// Authentication was lost or rejected.
    AuthenticationExpired,
    /// The protocol stream is desynchronized or corrupt.
    ProtocolCorruption,
    /// A single call timed out.
    Timeout,
    /// The requested key or item does not exist.
    NotFound,
    /// The value has a different type than the operation expects.
    WrongType,
    /// Any other business-level error reported by the server.
    Operation,
    /// The client could not tell what went wrong.
    Unclassified,
}

impl FaultKind {
    /// Every known fault kind, in declaration order.
    pub const ALL: [FaultKind; 9] = [
        FaultKind::TransportClosed,
        FaultKind::ConnectionReset,
        FaultKind::AuthenticationExpired,
        FaultKind::ProtocolCorruption,
        FaultKind::Timeout,
        FaultKind::NotFound,
        FaultKind::WrongType,
        FaultKind::Operation,
        FaultKind::Unclassified,
    ];

    /// Returns the stable, lowercase name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::TransportClosed => "transport_closed",
            FaultKind::ConnectionReset => "connection_reset",
            FaultKind::AuthenticationExpired => "authentication_expired",
            FaultKind::ProtocolCorruption => "protocol_corruption",
            FaultKind::Timeout => "timeout",
            FaultKind::NotFound => "not_found",
            FaultKind::WrongType => "wrong_type",
            FaultKind::Operation => "operation",
            FaultKind::Unclassified => "unclassified",
        }
    }

    /// Returns `true` for kinds that describe the transport rather than the
    /// outcome of one particular operation.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FaultKind::TransportClosed
                | FaultKind::ConnectionReset
                | FaultKind::AuthenticationExpired
                | FaultKind::ProtocolCorruption
                | FaultKind::Timeout
        )
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`FaultKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fault kind: {0:?}")]
pub struct ParseFaultKindError(pub String);

impl FromStr for FaultKind {
    type Err = ParseFaultKindError;

    /// Parses the names produced by [`FaultKind::as_str`], ignoring case and
    /// accepting `-` in place of `_`, so terminal kinds can be read from
    /// configuration files and environment variables.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        FaultKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseFaultKindError(s.to_string()))
    }
}

/// Implemented by wrapped-client error types to expose their category.
///
/// If a client does not distinguish transport failures from operation
/// failures, its implementation has to derive the kind from whatever signal
/// is available (status codes, error subtypes, message substrings).
pub trait FaultTagged {
    /// Returns the category of this error.
    fn fault_kind(&self) -> FaultKind;
}

impl FaultTagged for std::io::Error {
    fn fault_kind(&self) -> FaultKind {
        use std::io::ErrorKind::*;

        match self.kind() {
            NotConnected | UnexpectedEof | ConnectionRefused => FaultKind::TransportClosed,
            ConnectionReset | ConnectionAborted | BrokenPipe => FaultKind::ConnectionReset,
            PermissionDenied => FaultKind::AuthenticationExpired,
            InvalidData => FaultKind::ProtocolCorruption,
            TimedOut | WouldBlock => FaultKind::Timeout,
            NotFound => FaultKind::NotFound,
            InvalidInput | Unsupported | AlreadyExists => FaultKind::Operation,
            _ => FaultKind::Unclassified,
        }
    }
}

impl<T: FaultTagged + ?Sized> FaultTagged for Box<T> {
    fn fault_kind(&self) -> FaultKind {
        (**self).fault_kind()
    }
}

impl<T: FaultTagged + ?Sized> FaultTagged for std::sync::Arc<T> {
    fn fault_kind(&self) -> FaultKind {
        (**self).fault_kind()
    }
}
