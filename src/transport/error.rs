//! Error type shared by the transport, protocol and facade layers.

use super::QoS;
use crate::network::error::Error as NetworkError;

/// Errors surfaced by direct calls, and attached to failure notifications.
///
/// The type is `Copy` so one value can be handed to every listener.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The transport has no implementation of the requested capability
    /// (for example polling or subscribing over plain HTTP).
    NotImplemented,
    /// A wire-level failure from the underlying client.
    Network(NetworkError),
    /// The driver has no open connection.
    NotConnected,
    /// The driver is already in use further up the call stack.
    Busy,
    /// The driver cannot honour this QoS/retain combination.
    UnsupportedDelivery {
        /// Requested quality of service.
        qos: QoS,
        /// Requested retain flag.
        retain: bool,
    },
    /// A fixed-capacity registry or buffer is full.
    CapacityExceeded,
    /// A topic is too long, or an id substituted into it is empty or contains
    /// `/`, `+` or `#`.
    InvalidTopic,
    /// A payload exceeds [`MAX_PAYLOAD_LEN`](super::MAX_PAYLOAD_LEN).
    PayloadTooLarge,
    /// Device identity fields are missing or out of range.
    InvalidDevice,
    /// A payload record could not be serialized.
    Encoding,
}

impl Error {
    /// `true` when the error means the link to the peer is gone.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            Error::Network(
                NetworkError::ReadError | NetworkError::ConnectionClosed | NetworkError::NotOpen
            )
        )
    }
}

impl From<NetworkError> for Error {
    fn from(err: NetworkError) -> Self {
        Error::Network(err)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NotImplemented => f.write_str("the requested method is not implemented"),
            Error::Network(err) => write!(f, "network: {}", err),
            Error::NotConnected => f.write_str("not connected"),
            Error::Busy => f.write_str("driver busy"),
            Error::UnsupportedDelivery { qos, retain } => write!(
                f,
                "unsupported delivery (qos {}, retain {})",
                *qos as u8, retain
            ),
            Error::CapacityExceeded => f.write_str("capacity exceeded"),
            Error::InvalidTopic => f.write_str("invalid topic"),
            Error::PayloadTooLarge => f.write_str("payload too large"),
            Error::InvalidDevice => f.write_str("invalid device info"),
            Error::Encoding => f.write_str("payload encoding failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotImplemented => defmt::write!(f, "NotImplemented"),
            Error::Network(err) => defmt::write!(f, "Network({})", err),
            Error::NotConnected => defmt::write!(f, "NotConnected"),
            Error::Busy => defmt::write!(f, "Busy"),
            Error::UnsupportedDelivery { qos, retain } => {
                defmt::write!(f, "UnsupportedDelivery({=u8}, {=bool})", *qos as u8, *retain)
            }
            Error::CapacityExceeded => defmt::write!(f, "CapacityExceeded"),
            Error::InvalidTopic => defmt::write!(f, "InvalidTopic"),
            Error::PayloadTooLarge => defmt::write!(f, "PayloadTooLarge"),
            Error::InvalidDevice => defmt::write!(f, "InvalidDevice"),
            Error::Encoding => defmt::write!(f, "Encoding"),
        }
    }
}
