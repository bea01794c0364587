//! MQTT 3.1.1 protocol implementation for embedded systems.
//!
//! MQTT uses a publish-subscribe pattern where:
//! - **Publishers** send messages to topics
//! - **Subscribers** receive messages from topics they're interested in
//! - **Brokers** route messages between publishers and subscribers
//!
//! The [`client::Client`] here is the wire half of
//! [`MqttDriver`](crate::transport::MqttDriver); applications normally go
//! through the driver and the [`Transport`](crate::transport::Transport).

/// MQTT client implementation and supporting types.
pub mod client;

pub use client::{Client, ConnectReturnCode, Credentials, Options, PublishPacket};
