//! REST driver: one HTTP POST per message.

use super::{Credentials, Driver, Endpoint, Error, QoS};
use crate::device::DeviceInfo;
use crate::network::application::http::{Client, Request};
use crate::network::error::Error as NetworkError;
use crate::network::{Close, Connect};
use base64ct::{Base64, Encoding};
use core::fmt::Write;
use heapless::String;

const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Longest `user:password` pair accepted for Basic authorization.
const MAX_CREDENTIALS_LEN: usize = 128;
/// `Basic ` plus the base64 form of [`MAX_CREDENTIALS_LEN`] bytes.
const MAX_AUTHORIZATION_LEN: usize = 6 + MAX_CREDENTIALS_LEN.div_ceil(3) * 4;

/// Settings of a [`RestDriver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestOptions<'a> {
    /// Sent as HTTP Basic authorization when set.
    pub credentials: Option<Credentials<'a>>,
}

/// Driver posting each message to `http://server:port/<topic>`.
///
/// Every send opens a fresh connection and closes it after the response
/// (`Connection: close`). The request carries the device address in `Host`.
/// There is no inbound channel: subscribing and polling report
/// [`Error::NotImplemented`], and retained delivery is refused.
pub struct RestDriver<'d, N: Connect> {
    network: N,
    device: &'d DeviceInfo,
    endpoint: Endpoint<'d>,
    options: RestOptions<'d>,
}

impl<N: Connect> core::fmt::Debug for RestDriver<'_, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RestDriver")
            .field("device", &self.device.id())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl<'d, N: Connect> RestDriver<'d, N> {
    /// Creates a driver posting to `endpoint` through `network`.
    pub fn new(
        network: N,
        device: &'d DeviceInfo,
        endpoint: Endpoint<'d>,
        options: RestOptions<'d>,
    ) -> Self {
        Self {
            network,
            device,
            endpoint,
            options,
        }
    }
}

impl<N: Connect> Driver for RestDriver<'_, N> {
    fn send(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<(), Error> {
        if retain {
            return Err(Error::UnsupportedDelivery { qos, retain });
        }

        let mut request = Request::post(topic, payload)
            .header("Content-Type", CONTENT_TYPE)?
            .header("Host", self.device.ip())?
            .header("Connection", "close")?;
        if let Some(credentials) = &self.options.credentials {
            request = request.header("Authorization", &basic_authorization(credentials)?)?;
        }

        let remote = self.endpoint.remote()?;
        let connection = self
            .network
            .connect(&remote)
            .map_err(|_| Error::Network(NetworkError::ConnectionRefused))?;

        // The connection is closed right after, so the body is never read.
        let mut client = Client::new(connection);
        let response = client.request_head(&request);
        if client.into_inner().close().is_err() {
            debug!("closing connection to {} failed", remote.as_str());
        }

        let response = response?;
        if !response.is_success() {
            warn!("POST {} answered {}", topic, response.status_code);
            return Err(Error::Network(NetworkError::Rejected(response.status_code)));
        }

        trace!("POST {} answered {}", topic, response.status_code);
        Ok(())
    }
}

/// `Basic <base64(user:password)>`.
fn basic_authorization(credentials: &Credentials) -> Result<String<MAX_AUTHORIZATION_LEN>, Error> {
    let mut plain: String<MAX_CREDENTIALS_LEN> = String::new();
    write!(plain, "{}:{}", credentials.username, credentials.password)
        .map_err(|_| Error::CapacityExceeded)?;

    let mut buf = [0u8; MAX_AUTHORIZATION_LEN];
    let encoded = Base64::encode(plain.as_bytes(), &mut buf).map_err(|_| Error::CapacityExceeded)?;

    let mut value = String::new();
    write!(value, "Basic {}", encoded).map_err(|_| Error::CapacityExceeded)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_authorization_encodes_user_and_password() {
        let credentials = Credentials {
            username: "Aladdin",
            password: "open sesame",
        };
        assert_eq!(
            basic_authorization(&credentials).unwrap().as_str(),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn oversized_credentials_are_rejected() {
        let long = "x".repeat(MAX_CREDENTIALS_LEN);
        let credentials = Credentials {
            username: &long,
            password: "p",
        };
        assert_eq!(basic_authorization(&credentials), Err(Error::CapacityExceeded));
    }
}
