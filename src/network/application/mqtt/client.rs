//! MQTT 3.1.1 client implementation for embedded systems.
//!
//! A blocking client over any [`Connection`]: it writes one control packet per
//! call and, where the protocol requires it, waits for the matching
//! acknowledgement. Incoming PUBLISH packets are pulled with [`Client::poll`].
//!
//! # Supported packets
//!
//! | Direction | Packets |
//! |---|---|
//! | client → broker | CONNECT, PUBLISH, PUBACK, SUBSCRIBE, UNSUBSCRIBE, DISCONNECT |
//! | broker → client | CONNACK, PUBLISH, SUBACK, UNSUBACK (anything else is skipped) |
//!
//! QoS 2 handshakes (PUBREC/PUBREL/PUBCOMP) are not implemented.
//!
//! # Examples
//!
//! ```rust,no_run
//! use gvcomm::network::application::mqtt::{Client, Options};
//! use gvcomm::QoS;
//! # use gvcomm::network::Connection;
//! # struct MockConnection;
//! # impl Connection for MockConnection {}
//! # impl gvcomm::network::Read for MockConnection {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl gvcomm::network::Write for MockConnection {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl gvcomm::network::Close for MockConnection {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//!
//! let options = Options {
//!     client_id: "sensor_device_01",
//!     keep_alive_seconds: 60,
//!     clean_session: true,
//!     credentials: None,
//! };
//!
//! let mut client = Client::connect(MockConnection, options)?;
//! client.subscribe("/devices/sensor_device_01/input", QoS::AtMostOnce)?;
//! client.publish("/devices/sensor_device_01/status", br#"{"st":"online"}"#, QoS::AtMostOnce, false)?;
//! while let Some(message) = client.poll()? {
//!     // handle message.topic / message.payload
//! #   let _ = message;
//! }
//! client.disconnect()?;
//! # Ok::<(), gvcomm::network::error::Error>(())
//! ```

use crate::network::error::Error;
use crate::network::{Connection, discard, read_exact, write_all};
use crate::transport::{MAX_PAYLOAD_LEN, MAX_TOPIC_LEN, QoS};
use heapless::{String, Vec};

// MQTT Control Packet types - these are the fixed header packet type values
/// MQTT CONNECT packet type identifier.
const CONNECT: u8 = 0x10;
/// MQTT CONNACK packet type identifier.
const CONNACK: u8 = 0x20;
/// MQTT PUBLISH packet type identifier.
const PUBLISH: u8 = 0x30;
/// MQTT PUBACK packet type identifier.
const PUBACK: u8 = 0x40;
/// MQTT SUBSCRIBE packet type identifier (with the mandatory 0b0010 flags).
const SUBSCRIBE: u8 = 0x82;
/// MQTT SUBACK packet type identifier.
const SUBACK: u8 = 0x90;
/// MQTT UNSUBSCRIBE packet type identifier (with the mandatory 0b0010 flags).
const UNSUBSCRIBE: u8 = 0xA2;
/// MQTT UNSUBACK packet type identifier.
const UNSUBACK: u8 = 0xB0;
/// MQTT DISCONNECT packet type identifier.
const DISCONNECT: u8 = 0xE0;

/// PUBLISH fixed-header flag marking a retained message.
const RETAIN_FLAG: u8 = 0x01;
/// SUBACK return code signalling a refused subscription.
const SUBACK_FAILURE: u8 = 0x80;

// MQTT 3.1.1 protocol constants
/// MQTT protocol name.
const PROTOCOL_NAME: &[u8] = b"MQTT";
/// MQTT protocol level for version 3.1.1.
const PROTOCOL_LEVEL: u8 = 4; // MQTT 3.1.1

/// Largest packet body (everything after the fixed header) the client builds
/// or accepts.
const MAX_PACKET_LEN: usize = 1024;

/// An incoming MQTT publish message.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublishPacket {
    /// The topic on which the message was published.
    pub topic: String<MAX_TOPIC_LEN>,
    /// The message payload data.
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

/// User name and password presented in CONNECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    /// User name.
    pub username: &'a str,
    /// Password.
    pub password: &'a str,
}

/// Configuration options for MQTT client connection.
///
/// # Examples
///
/// ```rust
/// use gvcomm::network::application::mqtt::{Credentials, Options};
///
/// let options = Options {
///     client_id: "my_iot_device",
///     keep_alive_seconds: 60,
///     clean_session: true,
///     credentials: Some(Credentials { username: "device", password: "secret" }),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Options<'a> {
    /// The client identifier, must be unique within the broker.
    pub client_id: &'a str,

    /// The keep-alive time interval in seconds. 0 disables keep-alive.
    pub keep_alive_seconds: u16,

    /// Whether to start a clean session.
    ///
    /// - `true`: The broker will discard any previous session state and start fresh
    /// - `false`: The broker will resume the previous session if one exists
    pub clean_session: bool,

    /// Optional user name and password.
    pub credentials: Option<Credentials<'a>>,
}

/// CONNACK return codes of MQTT 3.1.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectReturnCode {
    /// The connection was accepted.
    Accepted,
    /// The broker does not support the requested protocol level.
    UnacceptableProtocolVersion,
    /// The client identifier is not allowed by the broker.
    IdentifierRejected,
    /// The MQTT service is unavailable.
    ServerUnavailable,
    /// The user name or password is malformed or wrong.
    BadUserNameOrPassword,
    /// The client is not authorized to connect.
    NotAuthorized,
    /// A code outside the 3.1.1 table.
    Unknown(u8),
}

impl ConnectReturnCode {
    /// Human-readable description of the code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Accepted => "connection accepted",
            Self::UnacceptableProtocolVersion => "unacceptable protocol version",
            Self::IdentifierRejected => "client identifier rejected",
            Self::ServerUnavailable => "server unavailable",
            Self::BadUserNameOrPassword => "bad user name or password",
            Self::NotAuthorized => "not authorized",
            Self::Unknown(_) => "unknown connect return code",
        }
    }
}

impl From<u8> for ConnectReturnCode {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Accepted,
            1 => Self::UnacceptableProtocolVersion,
            2 => Self::IdentifierRejected,
            3 => Self::ServerUnavailable,
            4 => Self::BadUserNameOrPassword,
            5 => Self::NotAuthorized,
            other => Self::Unknown(other),
        }
    }
}

/// An MQTT 3.1.1 client for publish-subscribe messaging.
///
/// # Type Parameters
///
/// * `C` - The connection type implementing [`Connection`]
pub struct Client<C: Connection> {
    connection: C,
    next_packet_id: u16,
}

impl<C: Connection> core::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("next_packet_id", &self.next_packet_id)
            .finish_non_exhaustive()
    }
}

impl<C: Connection> Client<C> {
    /// Establish an MQTT connection with the broker.
    ///
    /// Sends CONNECT and waits for CONNACK.
    ///
    /// # Errors
    ///
    /// * [`Error::WriteError`] - Failed to send CONNECT packet
    /// * [`Error::ReadError`] - Failed to read CONNACK response
    /// * [`Error::ConnectionClosed`] - Connection closed during handshake
    /// * [`Error::Rejected`] - Broker refused the connection; the code maps to
    ///   a [`ConnectReturnCode`]
    /// * [`Error::ProtocolError`] - Invalid CONNACK packet received or the
    ///   CONNECT packet does not fit its buffer
    pub fn connect(mut connection: C, options: Options) -> Result<Self, Error> {
        let mut packet: Vec<u8, MAX_PACKET_LEN> = Vec::new();

        // --- Variable Header ---
        push(&mut packet, &(PROTOCOL_NAME.len() as u16).to_be_bytes())?;
        push(&mut packet, PROTOCOL_NAME)?;
        push(&mut packet, &[PROTOCOL_LEVEL])?;

        let mut connect_flags = 0;
        if options.clean_session {
            connect_flags |= 0x02;
        }
        if options.credentials.is_some() {
            // user name + password present
            connect_flags |= 0x80 | 0x40;
        }
        push(&mut packet, &[connect_flags])?;
        push(&mut packet, &options.keep_alive_seconds.to_be_bytes())?;

        // --- Payload ---
        push_str(&mut packet, options.client_id)?;
        if let Some(credentials) = &options.credentials {
            push_str(&mut packet, credentials.username)?;
            push_str(&mut packet, credentials.password)?;
        }

        send_packet(&mut connection, CONNECT, &packet)?;

        // Wait for and parse CONNACK
        let mut connack_buf = [0u8; 4];
        read_exact(&mut connection, &mut connack_buf)?;

        if connack_buf[0] != CONNACK || connack_buf[1] != 2 {
            return Err(Error::ProtocolError);
        }

        match ConnectReturnCode::from(connack_buf[3]) {
            ConnectReturnCode::Accepted => Ok(Self {
                connection,
                next_packet_id: 1,
            }),
            ConnectReturnCode::Unknown(_) => Err(Error::ProtocolError),
            _ => Err(Error::Rejected(connack_buf[3] as u16)),
        }
    }

    /// Publish a message to a specific topic.
    ///
    /// QoS 1 and 2 messages carry a packet identifier. The client does not wait
    /// for PUBACK; a later [`poll`](Self::poll) skips it.
    ///
    /// # Errors
    ///
    /// * [`Error::WriteError`] - Failed to send the publish packet
    /// * [`Error::ProtocolError`] - Topic and payload do not fit a packet
    pub fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Error> {
        let mut packet: Vec<u8, MAX_PACKET_LEN> = Vec::new();

        // --- Variable Header ---
        push_str(&mut packet, topic)?;
        if qos != QoS::AtMostOnce {
            let packet_id = self.packet_id();
            push(&mut packet, &packet_id.to_be_bytes())?;
        }

        // --- Payload ---
        push(&mut packet, payload)?;

        let mut flags = PUBLISH | ((qos as u8) << 1);
        if retain {
            flags |= RETAIN_FLAG;
        }

        send_packet(&mut self.connection, flags, &packet)
    }

    /// Subscribe to a topic filter and wait for SUBACK.
    ///
    /// # Errors
    ///
    /// * [`Error::WriteError`] - Failed to send the subscribe packet
    /// * [`Error::ReadError`] / [`Error::ConnectionClosed`] - No SUBACK
    /// * [`Error::Rejected`] - The broker refused the subscription (code 0x80)
    /// * [`Error::ProtocolError`] - Malformed SUBACK or packet id mismatch
    pub fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Error> {
        let mut packet: Vec<u8, MAX_PACKET_LEN> = Vec::new();

        let packet_id = self.packet_id();
        push(&mut packet, &packet_id.to_be_bytes())?;
        push_str(&mut packet, topic)?;
        push(&mut packet, &[qos as u8])?;

        send_packet(&mut self.connection, SUBSCRIBE, &packet)?;

        let mut suback_buf = [0u8; 5];
        read_exact(&mut self.connection, &mut suback_buf)?;

        if suback_buf[0] != SUBACK || suback_buf[1] != 3 {
            return Err(Error::ProtocolError);
        }
        if u16::from_be_bytes([suback_buf[2], suback_buf[3]]) != packet_id {
            return Err(Error::ProtocolError);
        }
        if suback_buf[4] == SUBACK_FAILURE {
            return Err(Error::Rejected(SUBACK_FAILURE as u16));
        }

        Ok(())
    }

    /// Unsubscribe from a topic filter and wait for UNSUBACK.
    pub fn unsubscribe(&mut self, topic: &str) -> Result<(), Error> {
        let mut packet: Vec<u8, MAX_PACKET_LEN> = Vec::new();

        let packet_id = self.packet_id();
        push(&mut packet, &packet_id.to_be_bytes())?;
        push_str(&mut packet, topic)?;

        send_packet(&mut self.connection, UNSUBSCRIBE, &packet)?;

        let mut unsuback_buf = [0u8; 4];
        read_exact(&mut self.connection, &mut unsuback_buf)?;

        if unsuback_buf[0] != UNSUBACK || unsuback_buf[1] != 2 {
            return Err(Error::ProtocolError);
        }
        if u16::from_be_bytes([unsuback_buf[2], unsuback_buf[3]]) != packet_id {
            return Err(Error::ProtocolError);
        }

        Ok(())
    }

    /// Poll the connection for the next incoming PUBLISH.
    ///
    /// Other packets (PUBACK, PINGRESP, ...) are read and discarded. So is a
    /// PUBLISH whose topic or payload exceeds [`MAX_TOPIC_LEN`] or
    /// [`MAX_PAYLOAD_LEN`]; it is still acknowledged at QoS 1 when its packet
    /// id can be read. Polling then goes on with the next packet.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(packet))` - A PUBLISH was received; QoS 1 deliveries have
    ///   already been acknowledged
    /// * `Ok(None)` - No data available
    ///
    /// # Errors
    ///
    /// * [`Error::ReadError`] - Failed to read from the connection
    /// * [`Error::ConnectionClosed`] - The connection ran dry inside a packet
    /// * [`Error::ProtocolError`] - Malformed packet
    pub fn poll(&mut self) -> Result<Option<PublishPacket>, Error> {
        loop {
            let mut header_buf = [0u8; 1];
            match self.connection.read(&mut header_buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {}
                Err(_) => return Err(Error::ReadError),
            }
            let remaining_len = self.read_remaining_length()?;

            if header_buf[0] & 0xF0 != PUBLISH {
                trace!("skipping packet {} ({} bytes)", header_buf[0], remaining_len);
                discard(&mut self.connection, remaining_len)?;
                continue;
            }

            // Keep what fits, drop the rest so the next header lines up.
            let kept = remaining_len.min(MAX_PACKET_LEN);
            let mut packet: Vec<u8, MAX_PACKET_LEN> = Vec::new();
            packet.resize(kept, 0).map_err(|_| Error::ProtocolError)?;
            read_exact(&mut self.connection, &mut packet)?;
            discard(&mut self.connection, remaining_len - kept)?;
            let truncated = remaining_len > kept;

            let qos = (header_buf[0] >> 1) & 0x03;
            let (topic, packet_id, payload) = match split_publish(qos, &packet) {
                Ok(parts) => parts,
                Err(_) if truncated => {
                    warn!("dropping {} byte PUBLISH", remaining_len);
                    continue;
                }
                Err(err) => return Err(err),
            };

            if qos == 1 {
                if let Some(packet_id) = packet_id {
                    send_packet(&mut self.connection, PUBACK, &packet_id)?;
                }
            }

            if truncated || topic.len() > MAX_TOPIC_LEN || payload.len() > MAX_PAYLOAD_LEN {
                warn!(
                    "dropping {} byte PUBLISH ({} byte topic)",
                    remaining_len,
                    topic.len()
                );
                continue;
            }

            let topic = core::str::from_utf8(topic).map_err(|_| Error::ProtocolError)?;
            return Ok(Some(PublishPacket {
                topic: String::try_from(topic).map_err(|_| Error::ProtocolError)?,
                payload: Vec::from_slice(payload).map_err(|_| Error::ProtocolError)?,
            }));
        }
    }

    /// Send DISCONNECT and close the connection.
    pub fn disconnect(mut self) -> Result<(), Error> {
        send_packet(&mut self.connection, DISCONNECT, &[])?;
        self.connection.close().map_err(|_| Error::NotOpen)
    }

    fn read_remaining_length(&mut self) -> Result<usize, Error> {
        let mut remaining_len = 0;
        let mut multiplier = 1;
        for _ in 0..4 {
            let mut byte = [0u8; 1];
            read_exact(&mut self.connection, &mut byte)?;
            remaining_len += (byte[0] as usize & 127) * multiplier;
            if byte[0] & 0x80 == 0 {
                return Ok(remaining_len);
            }
            multiplier *= 128;
        }
        Err(Error::ProtocolError)
    }

    /// Next non-zero packet identifier.
    fn packet_id(&mut self) -> u16 {
        let id = self.next_packet_id;
        self.next_packet_id = self.next_packet_id.checked_add(1).unwrap_or(1);
        id
    }
}

/// Splits a PUBLISH body into topic, packet id (QoS 1 and 2) and payload.
fn split_publish(qos: u8, packet: &[u8]) -> Result<(&[u8], Option<[u8; 2]>, &[u8]), Error> {
    let topic_len = u16::from_be_bytes([
        *packet.first().ok_or(Error::ProtocolError)?,
        *packet.get(1).ok_or(Error::ProtocolError)?,
    ]) as usize;
    let topic = packet.get(2..2 + topic_len).ok_or(Error::ProtocolError)?;

    let mut payload_start = 2 + topic_len;
    let packet_id = if qos > 0 {
        let id = packet
            .get(payload_start..payload_start + 2)
            .ok_or(Error::ProtocolError)?;
        payload_start += 2;
        Some([id[0], id[1]])
    } else {
        None
    };

    Ok((topic, packet_id, &packet[payload_start..]))
}

/// Write fixed header, remaining length and body, then flush.
fn send_packet<C: Connection>(connection: &mut C, header: u8, body: &[u8]) -> Result<(), Error> {
    let mut fixed_header: Vec<u8, 5> = Vec::new();
    fixed_header.push(header).map_err(|_| Error::ProtocolError)?;
    encode_remaining_length(&mut fixed_header, body.len()).map_err(|_| Error::ProtocolError)?;

    write_all(connection, &fixed_header)?;
    write_all(connection, body)?;
    connection.flush().map_err(|_| Error::WriteError)
}

fn push<const N: usize>(packet: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), Error> {
    packet
        .extend_from_slice(bytes)
        .map_err(|_| Error::ProtocolError)
}

/// Append a length-prefixed UTF-8 string.
fn push_str<const N: usize>(packet: &mut Vec<u8, N>, s: &str) -> Result<(), Error> {
    let len = u16::try_from(s.len()).map_err(|_| Error::ProtocolError)?;
    push(packet, &len.to_be_bytes())?;
    push(packet, s.as_bytes())
}

/// Encode the remaining length field for an MQTT packet.
///
/// The encoding uses up to 4 bytes where each byte encodes 7 bits of the length
/// value. The most significant bit indicates if another byte follows.
fn encode_remaining_length(buf: &mut Vec<u8, 5>, mut len: usize) -> Result<(), ()> {
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        buf.push(byte).map_err(|_| ())?;
        if len == 0 {
            return Ok(());
        }
    }
}
