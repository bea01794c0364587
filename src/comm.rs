//! Device-centric facade.

use crate::device::DeviceInfo;
use crate::protocol::{Protocol, Status};
use crate::transport::{Driver, Error, QoS, Subscriber, Transport};

/// One device, one transport and one protocol behind a single API.
///
/// Every call is forwarded. The facade adds one thing: operations that
/// declare a command inbox (`add_device` with a callback, `add_actuator`)
/// also subscribe the callback to that inbox, using the topic the protocol
/// computes. The device is the protocol's own, so topics and
/// [`device_info`](Self::device_info) always agree.
pub struct GvComm<'t, 'a, D: Driver, P: Protocol> {
    transport: &'t Transport<'a, D>,
    protocol: P,
}

impl<D: Driver, P: Protocol> core::fmt::Debug for GvComm<'_, '_, D, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GvComm")
            .field("device", self.protocol.device_info())
            .field("transport", self.transport)
            .finish_non_exhaustive()
    }
}

impl<'t, 'a, D: Driver, P: Protocol> GvComm<'t, 'a, D, P> {
    /// Binds a transport and a protocol. Does not connect.
    pub fn new(transport: &'t Transport<'a, D>, protocol: P) -> Self {
        Self {
            transport,
            protocol,
        }
    }

    /// The device this facade speaks for.
    pub fn device_info(&self) -> &DeviceInfo {
        self.protocol.device_info()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &'t Transport<'a, D> {
        self.transport
    }

    /// Registers the device, and subscribes `callback` to the device inbox
    /// when one is given.
    pub fn add_device(&self, callback: Option<&'a dyn Subscriber>) -> Result<(), Error> {
        self.protocol.add_device()?;
        if let Some(callback) = callback {
            let inbox = self.protocol.device_inbox()?;
            self.transport.subscribe(&inbox, callback)?;
        }
        Ok(())
    }

    /// Registers sensor `id`.
    pub fn add_sensor(&self, id: &str, name: &str, kind: &str) -> Result<(), Error> {
        self.protocol.add_sensor(id, name, kind)
    }

    /// Registers actuator `id` and subscribes `callback` to its inbox.
    ///
    /// The inbox topic is computed first, so an id that cannot form a topic
    /// fails before anything is sent.
    pub fn add_actuator(
        &self,
        id: &str,
        name: &str,
        kind: &str,
        callback: &'a dyn Subscriber,
    ) -> Result<(), Error> {
        let inbox = self.protocol.actuator_inbox(id)?;
        self.protocol.add_actuator(id, name, kind)?;
        self.transport.subscribe(&inbox, callback)
    }

    /// Publishes a reading of sensor `id`.
    pub fn send_data(&self, id: &str, value: &str, qos: QoS, retain: bool) -> Result<(), Error> {
        self.protocol.send_data(id, value, qos, retain)
    }

    /// Reports the device status.
    pub fn send_status(&self, status: Status<'_>) -> Result<(), Error> {
        self.protocol.send_status(status)
    }

    /// Subscribes `callback` to an arbitrary topic.
    pub fn add_callback(&self, topic: &str, callback: &'a dyn Subscriber) -> Result<(), Error> {
        self.transport.subscribe(topic, callback)
    }

    /// See [`Transport::connect`].
    pub fn connect(&self) {
        self.transport.connect();
    }

    /// See [`Transport::shutdown`].
    pub fn shutdown(&self) -> Result<(), Error> {
        self.transport.shutdown()
    }

    /// See [`Transport::poll`].
    pub fn poll(&self) -> Result<(), Error> {
        self.transport.poll()
    }
}
