//! # Application Layer Clients
//!
//! Wire clients the bundled transport drivers are built on. Both work with any
//! type implementing [`Connection`](crate::network::Connection) and use
//! fixed-size buffers only.
//!
//! - **[`mqtt`]**: MQTT 3.1.1 client used by
//!   [`MqttDriver`](crate::transport::MqttDriver)
//! - **[`http`]**: HTTP/1.1 client used by
//!   [`RestDriver`](crate::transport::RestDriver)

/// HTTP client implementation.
///
/// Provides a simple HTTP/1.1 client suitable for embedded systems,
/// supporting GET and POST methods with custom headers.
pub mod http;

/// MQTT client implementation.
///
/// Provides an MQTT 3.1.1 client for lightweight publish-subscribe messaging,
/// commonly used in IoT applications.
pub mod mqtt;
