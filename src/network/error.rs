//! Common error types for network operations

/// A common error type for network operations.
///
/// This enum defines the errors the wire-level clients report. It is
/// `Copy` so it can be attached to transport events as-is.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An operation was attempted on a connection that is not open.
    NotOpen,
    /// An error occurred during a write operation.
    WriteError,
    /// An error occurred during a read operation.
    ReadError,
    /// A connection attempt was refused.
    ConnectionRefused,
    /// A timeout occurred.
    Timeout,
    /// The connection was closed.
    ConnectionClosed,
    /// An invalid address was provided.
    InvalidAddress,
    /// A protocol-specific error occurred.
    ProtocolError,
    /// The peer answered with a refusal code: an MQTT CONNACK or SUBACK
    /// return code, or an HTTP status outside 2xx.
    Rejected(u16),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NotOpen => f.write_str("connection not open"),
            Error::WriteError => f.write_str("write failed"),
            Error::ReadError => f.write_str("read failed"),
            Error::ConnectionRefused => f.write_str("connection refused"),
            Error::Timeout => f.write_str("timed out"),
            Error::ConnectionClosed => f.write_str("connection closed"),
            Error::InvalidAddress => f.write_str("invalid address"),
            Error::ProtocolError => f.write_str("protocol error"),
            Error::Rejected(code) => write!(f, "rejected by peer with code {}", code),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectionRefused => defmt::write!(f, "ConnectionRefused"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::ProtocolError => defmt::write!(f, "ProtocolError"),
            Error::Rejected(code) => defmt::write!(f, "Rejected({})", code),
        }
    }
}
