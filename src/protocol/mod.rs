//! Protocol layer.
//!
//! A [`Protocol`] turns device-domain intents into `(topic, payload)` pairs
//! and hands them to a transport through [`Link::send`](crate::transport::Link::send).
//! It keeps no state of its own beyond what it was built with, so its
//! operations can be called any number of times, in any order.
//!
//! Topics come from the constant [`Service`] table only.

use crate::device::DeviceInfo;
use crate::transport::{Error, QoS, Topic};

pub mod payload;
mod topics;
mod v1;

pub use topics::{Service, render};
pub use v1::GvProtocolV1;

/// Status a device reports about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status<'s> {
    /// Up and reachable.
    Online,
    /// Going away.
    Offline,
    /// Application-defined status text.
    Custom(&'s str),
}

impl Status<'_> {
    /// Wire form of the status.
    pub fn as_str(&self) -> &str {
        match self {
            Status::Online => "online",
            Status::Offline => "offline",
            Status::Custom(text) => *text,
        }
    }
}

impl From<bool> for Status<'_> {
    fn from(online: bool) -> Self {
        if online { Status::Online } else { Status::Offline }
    }
}

/// Device-domain operations over a transport.
pub trait Protocol {
    /// The device every topic and registration is computed for.
    fn device_info(&self) -> &DeviceInfo;

    /// Registers the device itself.
    fn add_device(&self) -> Result<(), Error>;

    /// Reports the device status.
    fn send_status(&self, status: Status<'_>) -> Result<(), Error>;

    /// Registers sensor `id`.
    fn add_sensor(&self, id: &str, name: &str, kind: &str) -> Result<(), Error>;

    /// Registers actuator `id`.
    fn add_actuator(&self, id: &str, name: &str, kind: &str) -> Result<(), Error>;

    /// Publishes a reading of sensor `id`.
    fn send_data(&self, id: &str, value: &str, qos: QoS, retain: bool) -> Result<(), Error>;

    /// Topic on which the device receives commands.
    fn device_inbox(&self) -> Result<Topic, Error>;

    /// Topic on which actuator `id` receives commands.
    fn actuator_inbox(&self, id: &str) -> Result<Topic, Error>;
}
