//! MQTT driver.

use super::{Credentials, Driver, Endpoint, Error, Message, QoS};
use crate::device::DeviceInfo;
use crate::network::Connect;
use crate::network::application::mqtt::{Client, ConnectReturnCode, Options};
use crate::network::error::Error as NetworkError;

/// Session settings of an [`MqttDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MqttOptions<'a> {
    /// Keep-alive interval announced in CONNECT, in seconds.
    pub keep_alive_seconds: u16,
    /// Ask the broker to discard any previous session.
    pub clean_session: bool,
    /// Optional user name and password.
    pub credentials: Option<Credentials<'a>>,
    /// QoS requested for topic subscriptions.
    pub subscribe_qos: QoS,
}

impl Default for MqttOptions<'_> {
    fn default() -> Self {
        Self {
            keep_alive_seconds: 60,
            clean_session: true,
            credentials: None,
            subscribe_qos: QoS::AtMostOnce,
        }
    }
}

/// Driver speaking MQTT 3.1.1 to a broker.
///
/// The device id is used as MQTT client id. Push delivery happens through
/// [`Transport::poll`](super::Transport::poll), which reads the socket until it
/// runs dry.
///
/// `QoS::ExactlyOnce` is not supported for sending. The device ip is not
/// used: the connection is opened by `N`, which decides the local address.
pub struct MqttDriver<'d, N: Connect> {
    network: N,
    device: &'d DeviceInfo,
    endpoint: Endpoint<'d>,
    options: MqttOptions<'d>,
    client: Option<Client<N::Connection>>,
}

impl<N: Connect> core::fmt::Debug for MqttDriver<'_, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MqttDriver")
            .field("device", &self.device.id())
            .field("endpoint", &self.endpoint)
            .field("connected", &self.client.is_some())
            .finish_non_exhaustive()
    }
}

impl<'d, N: Connect> MqttDriver<'d, N> {
    /// Creates a driver dialing `endpoint` through `network`. Does not connect.
    pub fn new(
        network: N,
        device: &'d DeviceInfo,
        endpoint: Endpoint<'d>,
        options: MqttOptions<'d>,
    ) -> Self {
        Self {
            network,
            device,
            endpoint,
            options,
            client: None,
        }
    }

    /// `true` while a broker session is open.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn client(&mut self) -> Result<&mut Client<N::Connection>, Error> {
        self.client.as_mut().ok_or(Error::NotConnected)
    }

    /// Runs a client call; a failure meaning the link dropped ends the session.
    fn with_client<R>(
        &mut self,
        f: impl FnOnce(&mut Client<N::Connection>) -> Result<R, NetworkError>,
    ) -> Result<R, Error> {
        let result = f(self.client()?).map_err(Error::from);
        if let Err(err) = &result {
            if err.is_connection_loss() {
                self.client = None;
            }
        }
        result
    }
}

impl<N: Connect> Driver for MqttDriver<'_, N> {
    fn connect(&mut self) -> Result<(), Error> {
        if self.client.is_some() {
            return Ok(());
        }

        let remote = self.endpoint.remote()?;
        let connection = self.network.connect(&remote).map_err(|_err| {
            warn!("cannot reach broker at {}", remote.as_str());
            Error::Network(NetworkError::ConnectionRefused)
        })?;

        let options = Options {
            client_id: self.device.id(),
            keep_alive_seconds: self.options.keep_alive_seconds,
            clean_session: self.options.clean_session,
            credentials: self.options.credentials,
        };
        let client = Client::connect(connection, options).map_err(|err| {
            if let NetworkError::Rejected(code) = err {
                warn!(
                    "broker refused connection: {}",
                    ConnectReturnCode::from(code as u8).description()
                );
            }
            Error::from(err)
        })?;

        info!("connected to {} as {}", remote.as_str(), self.device.id());
        self.client = Some(client);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), Error> {
        match self.client.take() {
            Some(client) => client.disconnect().map_err(Error::from),
            None => Ok(()),
        }
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Error> {
        let qos = self.options.subscribe_qos;
        self.with_client(|client| client.subscribe(topic, qos))
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), Error> {
        self.with_client(|client| client.unsubscribe(topic))
    }

    fn send(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<(), Error> {
        if qos == QoS::ExactlyOnce {
            return Err(Error::UnsupportedDelivery { qos, retain });
        }
        self.with_client(|client| client.publish(topic, payload, qos, retain))
    }

    fn poll(&mut self) -> Result<Option<Message>, Error> {
        let packet = self.with_client(|client| client.poll())?;
        Ok(packet.map(|packet| Message {
            topic: packet.topic,
            payload: packet.payload,
        }))
    }
}
