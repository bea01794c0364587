//! # gvcomm - device-side IoT communication library
//!
//! `gvcomm` lets an embedded or Linux-class device register itself, its sensors
//! and its actuators with a remote IoT network, push readings and status, and
//! receive commands, over a transport that can be swapped without touching the
//! application code.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────────┐   ┌──────────────┐
//! │ Application │──▶│   GvComm    │──▶│    Protocol     │──▶│  Transport   │
//! │             │   │  (facade)   │   │ (topic+payload) │   │ (lifecycle,  │
//! └─────────────┘   └─────────────┘   └─────────────────┘   │  dispatch)   │
//!                                                            └──────┬───────┘
//!                                                                   │ Driver
//!                                                     ┌─────────────┴────────────┐
//!                                                     │ MqttDriver  │ RestDriver │
//!                                                     └──────────────────────────┘
//! ```
//!
//! - [`device`]: the identity record of the device ([`DeviceInfo`]).
//! - [`transport`]: connection lifecycle, per-topic subscriber pipelines and
//!   listener notification, on top of a pluggable [`transport::Driver`].
//! - [`protocol`]: turns device-domain operations into `(topic, payload)` pairs.
//! - [`comm`]: the [`GvComm`] facade binding the three together.
//! - [`network`]: the byte-stream traits and the MQTT/HTTP clients the bundled
//!   drivers are built on.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gvcomm::{DeviceInfo, GvComm, QoS};
//! use gvcomm::protocol::GvProtocolV1;
//! use gvcomm::transport::{Endpoint, MqttDriver, MqttOptions, Payload, Transport};
//! # use gvcomm::network::{Close, Connect, Connection, Read, Write};
//! # struct Tcp;
//! # impl Connection for Tcp {}
//! # impl Read for Tcp {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl Write for Tcp {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl Close for Tcp {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct Network;
//! # impl Connect for Network {
//! #     type Connection = Tcp;
//! #     type Error = ();
//! #     fn connect(&mut self, _remote: &str) -> Result<Tcp, ()> { Ok(Tcp) }
//! # }
//!
//! let lamp = |command: Payload| command;
//! let device = DeviceInfo::new("dev1", "Greenhouse", "10.0.0.5", 1000)?;
//! let driver = MqttDriver::new(
//!     Network,
//!     &device,
//!     Endpoint::new("broker.local", 1883),
//!     MqttOptions::default(),
//! );
//! let transport = Transport::new(driver);
//! let protocol = GvProtocolV1::new(&transport, &device);
//! let comm = GvComm::new(&transport, protocol);
//!
//! comm.connect();
//! comm.add_device(None)?;
//! comm.add_sensor("t1", "Temperature", "celsius")?;
//! comm.add_actuator("a1", "Lamp", "switch", &lamp)?;
//! comm.send_data("t1", "21.5", QoS::AtMostOnce, false)?;
//! comm.poll()?;
//! comm.shutdown()?;
//! # Ok::<(), gvcomm::Error>(())
//! ```
//!
//! ## Optional Features
//!
//! - `std`: `std::error::Error` for the error type and the std
//!   `critical-section` implementation
//! - `defmt`: defmt formatting and defmt log output
//! - `log`: log output through the `log` facade

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod fmt;

/// Device identity record.
pub mod device;

/// Network abstraction layer: byte-stream traits and the MQTT/HTTP clients
/// the bundled drivers speak through.
pub mod network;

/// Transport core: lifecycle, subscriber dispatch, listener notification and
/// the MQTT/REST drivers.
pub mod transport;

/// Protocol layer translating device operations into topics and payloads.
pub mod protocol;

/// The [`GvComm`] facade.
pub mod comm;

pub use comm::GvComm;
pub use device::DeviceInfo;
pub use transport::{Error, QoS};
