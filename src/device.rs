//! Identity of the device this library runs on.
//!
//! A [`DeviceInfo`] is built once at startup and then only borrowed: the
//! protocol and the drivers hold `&DeviceInfo`, never a copy they could let
//! drift apart.

use crate::transport::Error;
use heapless::String;

/// Maximum length of a device identifier, in bytes.
pub const MAX_ID_LEN: usize = 32;
/// Maximum length of a device name, in bytes.
pub const MAX_NAME_LEN: usize = 64;
/// Maximum length of a textual network address (fits a full IPv6 literal).
pub const MAX_IP_LEN: usize = 46;

/// Immutable identity record of the device.
///
/// # Examples
///
/// ```rust
/// use gvcomm::DeviceInfo;
///
/// let device = DeviceInfo::new("dev1", "Greenhouse", "10.0.0.5", 1000).unwrap();
/// assert_eq!(device.id(), "dev1");
/// assert_eq!(device.port(), 1000);
///
/// // The id is substituted into topics, so it cannot carry separators.
/// assert!(DeviceInfo::new("a/b", "Bad", "10.0.0.5", 1000).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    id: String<MAX_ID_LEN>,
    name: String<MAX_NAME_LEN>,
    ip: String<MAX_IP_LEN>,
    port: u16,
}

impl DeviceInfo {
    /// Builds a device record.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDevice`] when the id is empty or contains `/`, `+` or
    /// `#`, when the port is 0, or when a field exceeds its capacity.
    pub fn new(id: &str, name: &str, ip: &str, port: u16) -> Result<Self, Error> {
        if id.is_empty() || id.contains(['/', '+', '#']) || port == 0 {
            return Err(Error::InvalidDevice);
        }

        Ok(Self {
            id: String::try_from(id).map_err(|_| Error::InvalidDevice)?,
            name: String::try_from(name).map_err(|_| Error::InvalidDevice)?,
            ip: String::try_from(ip).map_err(|_| Error::InvalidDevice)?,
            port,
        })
    }

    /// The unique id of the device within the network namespace.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Network address of the device.
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Port on which the device wishes to be contacted back.
    pub fn port(&self) -> u16 {
        self.port
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceInfo {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}@{}:{}", self.id.as_str(), self.ip.as_str(), self.port)
    }
}

/// Maximum length of a rendered `server:port` remote address.
pub const MAX_REMOTE_LEN: usize = 96;

/// Server and port a driver dials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    /// Host name or address of the server.
    pub server: &'a str,
    /// TCP port of the server.
    pub port: u16,
}

impl<'a> Endpoint<'a> {
    /// Creates an endpoint.
    pub const fn new(server: &'a str, port: u16) -> Self {
        Self { server, port }
    }

    /// Renders the endpoint as `server:port`, the form
    /// [`Connect::connect`](crate::network::Connect::connect) expects.
    pub fn remote(&self) -> Result<String<MAX_REMOTE_LEN>, Error> {
        use core::fmt::Write;

        let mut remote = String::new();
        write!(remote, "{}:{}", self.server, self.port).map_err(|_| Error::CapacityExceeded)?;
        Ok(remote)
    }
}
