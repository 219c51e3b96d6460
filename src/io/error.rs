// src/io/error.rs
//
// Error types for the servo link: connecting, sending, and decoding.

use std::fmt;
use std::io;

// ============================================================================
// Connection Errors
// ============================================================================

/// Failure while bringing a link up. Terminal for the `connect()` call that
/// produced it; the driver never retries on its own.
#[derive(Debug)]
pub enum ConnectionError {
    /// The raw CAN socket could not be created.
    SocketCreateFailed { interface: String, source: io::Error },
    /// The interface name does not resolve to an interface index.
    InterfaceNotFound { interface: String, source: io::Error },
    /// The socket could not be bound to the interface.
    BindFailed { interface: String, source: io::Error },
    /// The kernel receive filter could not be installed.
    FilterFailed { interface: String, source: io::Error },
    /// A socket option (e.g. receive timeout) could not be applied.
    SocketOptionFailed {
        interface: String,
        option: &'static str,
        source: io::Error,
    },
    /// The background reader thread could not be started.
    ReaderSpawnFailed(io::Error),
    /// `connect()` was called on a link that is already connected.
    AlreadyConnected,
}

impl ConnectionError {
    /// Interface the error refers to, if any.
    pub fn interface(&self) -> Option<&str> {
        match self {
            ConnectionError::SocketCreateFailed { interface, .. }
            | ConnectionError::InterfaceNotFound { interface, .. }
            | ConnectionError::BindFailed { interface, .. }
            | ConnectionError::FilterFailed { interface, .. }
            | ConnectionError::SocketOptionFailed { interface, .. } => Some(interface),
            ConnectionError::ReaderSpawnFailed(_) | ConnectionError::AlreadyConnected => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::SocketCreateFailed { interface, source } => {
                write!(f, "{}: failed to create CAN socket: {}", interface, source)
            }
            ConnectionError::InterfaceNotFound { interface, source } => {
                write!(f, "{}: interface not found: {}", interface, source)
            }
            ConnectionError::BindFailed { interface, source } => {
                write!(f, "{}: failed to bind CAN socket: {}", interface, source)
            }
            ConnectionError::FilterFailed { interface, source } => {
                write!(f, "{}: failed to install receive filter: {}", interface, source)
            }
            ConnectionError::SocketOptionFailed {
                interface,
                option,
                source,
            } => write!(f, "{}: failed to set {}: {}", interface, option, source),
            ConnectionError::ReaderSpawnFailed(e) => {
                write!(f, "failed to start telemetry reader: {}", e)
            }
            ConnectionError::AlreadyConnected => write!(f, "link is already connected"),
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectionError::SocketCreateFailed { source, .. }
            | ConnectionError::InterfaceNotFound { source, .. }
            | ConnectionError::BindFailed { source, .. }
            | ConnectionError::FilterFailed { source, .. }
            | ConnectionError::SocketOptionFailed { source, .. }
            | ConnectionError::ReaderSpawnFailed(source) => Some(source),
            ConnectionError::AlreadyConnected => None,
        }
    }
}

// ============================================================================
// Send Errors
// ============================================================================

/// Failure of a single command write. Writes are at-most-once: nothing is
/// queued or retried after one of these.
#[derive(Debug)]
pub enum SendError {
    /// The link is not in the `Connected` state.
    NotConnected,
    /// The socket write failed (bus-off, buffer full, interface down...).
    WriteFailed(io::Error),
}

impl SendError {
    /// True when the underlying error is likely to clear on its own
    /// (transmit queue full, interrupted call).
    pub fn is_transient(&self) -> bool {
        match self {
            SendError::NotConnected => false,
            SendError::WriteFailed(e) => matches!(
                e.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ) || e.raw_os_error() == Some(ENOBUFS),
        }
    }
}

/// Linux errno for a full transmit queue, reported while the bus is congested or bus-off.
const ENOBUFS: i32 = 105;

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::NotConnected => write!(f, "link is not connected"),
            SendError::WriteFailed(e) => write!(f, "write failed: {}", e),
        }
    }
}

impl std::error::Error for SendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SendError::NotConnected => None,
            SendError::WriteFailed(e) => Some(e),
        }
    }
}

// ============================================================================
// Decode Errors
// ============================================================================

/// Inbound telemetry frame that could not be turned into a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload length was not exactly 8 bytes.
    WrongLength { len: usize },
    /// Byte 7 did not map to a known fault code.
    UnknownFaultCode { code: u8 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::WrongLength { len } => {
                write!(f, "telemetry payload is {} bytes, expected 8", len)
            }
            DecodeError::UnknownFaultCode { code } => {
                write!(f, "unknown fault code 0x{:02X}", code)
            }
        }
    }
}

impl std::error::Error for DecodeError {}
