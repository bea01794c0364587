//! JSON records carried by the protocol.

use crate::transport::{Error, MAX_PAYLOAD_LEN, Payload};
use serde::Serialize;

/// Device registration: `{"nm":..,"ip":..,"prt":..}`.
#[derive(Debug, Serialize)]
pub struct DeviceRecord<'a> {
    /// Device name.
    #[serde(rename = "nm")]
    pub name: &'a str,
    /// Device address.
    pub ip: &'a str,
    /// Device port.
    #[serde(rename = "prt")]
    pub port: u16,
}

/// Sensor or actuator registration: `{"nm":..,"tp":..}`.
#[derive(Debug, Serialize)]
pub struct ItemRecord<'a> {
    /// Display name.
    #[serde(rename = "nm")]
    pub name: &'a str,
    /// Kind, e.g. `celsius` or `switch`.
    #[serde(rename = "tp")]
    pub kind: &'a str,
}

/// A sensor reading: `{"value":..}`.
#[derive(Debug, Serialize)]
pub struct ReadingRecord<'a> {
    /// Reading, already formatted.
    pub value: &'a str,
}

/// Device status: `{"st":..}`.
#[derive(Debug, Serialize)]
pub struct StatusRecord<'a> {
    /// Status text.
    #[serde(rename = "st")]
    pub status: &'a str,
}

/// Serializes `record` as compact JSON.
///
/// # Errors
///
/// [`Error::PayloadTooLarge`] when the JSON does not fit a [`Payload`],
/// [`Error::Encoding`] for any other serializer failure.
pub fn encode<T: Serialize>(record: &T) -> Result<Payload, Error> {
    serde_json_core::to_vec::<_, MAX_PAYLOAD_LEN>(record).map_err(|err| match err {
        serde_json_core::ser::Error::BufferFull => Error::PayloadTooLarge,
        _ => Error::Encoding,
    })
}
