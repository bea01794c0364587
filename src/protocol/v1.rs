use super::payload::{self, DeviceRecord, ItemRecord, ReadingRecord, StatusRecord};
use super::{Protocol, Service, Status};
use crate::device::DeviceInfo;
use crate::transport::{Error, Link, Payload, QoS, Topic};

/// Version 1 of the GreenVulcano IoT protocol.
///
/// Registrations and status go out at [`QoS::AtMostOnce`], not retained.
/// Readings use the QoS and retain flag the caller asks for.
#[derive(Clone, Copy)]
pub struct GvProtocolV1<'t> {
    device: &'t DeviceInfo,
    transport: &'t dyn Link,
}

impl core::fmt::Debug for GvProtocolV1<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GvProtocolV1")
            .field("device", &self.device.id())
            .finish_non_exhaustive()
    }
}

impl<'t> GvProtocolV1<'t> {
    /// Binds the protocol to a transport and a device.
    pub fn new(transport: &'t dyn Link, device: &'t DeviceInfo) -> Self {
        Self { device, transport }
    }

    fn topic(&self, service: Service, item: Option<&str>) -> Result<Topic, Error> {
        service.topic(self.device.id(), item)
    }

    fn post(&self, topic: &Topic, payload: &Payload, qos: QoS, retain: bool) -> Result<(), Error> {
        debug!("send {} ({} bytes)", topic.as_str(), payload.len());
        self.transport.send(topic, payload, qos, retain)
    }
}

impl Protocol for GvProtocolV1<'_> {
    fn device_info(&self) -> &DeviceInfo {
        self.device
    }

    fn add_device(&self) -> Result<(), Error> {
        let topic = self.topic(Service::Device, None)?;
        let payload = payload::encode(&DeviceRecord {
            name: self.device.name(),
            ip: self.device.ip(),
            port: self.device.port(),
        })?;
        self.post(&topic, &payload, QoS::AtMostOnce, false)
    }

    fn send_status(&self, status: Status<'_>) -> Result<(), Error> {
        let topic = self.topic(Service::Status, None)?;
        let payload = payload::encode(&StatusRecord {
            status: status.as_str(),
        })?;
        self.post(&topic, &payload, QoS::AtMostOnce, false)
    }

    fn add_sensor(&self, id: &str, name: &str, kind: &str) -> Result<(), Error> {
        let topic = self.topic(Service::Sensor, Some(id))?;
        let payload = payload::encode(&ItemRecord { name, kind })?;
        self.post(&topic, &payload, QoS::AtMostOnce, false)
    }

    fn add_actuator(&self, id: &str, name: &str, kind: &str) -> Result<(), Error> {
        let topic = self.topic(Service::Actuator, Some(id))?;
        let payload = payload::encode(&ItemRecord { name, kind })?;
        self.post(&topic, &payload, QoS::AtMostOnce, false)
    }

    fn send_data(&self, id: &str, value: &str, qos: QoS, retain: bool) -> Result<(), Error> {
        let topic = self.topic(Service::SensorOutput, Some(id))?;
        let payload = payload::encode(&ReadingRecord { value })?;
        self.post(&topic, &payload, qos, retain)
    }

    fn device_inbox(&self) -> Result<Topic, Error> {
        self.topic(Service::DeviceInput, None)
    }

    fn actuator_inbox(&self, id: &str) -> Result<Topic, Error> {
        self.topic(Service::ActuatorInput, Some(id))
    }
}
