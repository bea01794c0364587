//! Byte-stream abstraction the drivers run over.
//!
//! The MQTT and HTTP clients in [`application`] are written against these
//! traits only, so the same client code runs over an `embassy-net` socket, a
//! `smoltcp` socket or a `std::net::TcpStream` wrapper.

#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Application-layer clients (MQTT, HTTP)
pub mod application;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connect, Connection, Read, Write};
}

/// Reads bytes from a connection.
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection.
    ///
    /// `Ok(0)` means no data is available right now.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Writes bytes to a connection.
pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Closes a connection.
pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// A synchronous connector (client)
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open a connection to `remote`, given as `host:port`
    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error>;
}

/// Writes the whole buffer, retrying short writes.
pub(crate) fn write_all<C: Write>(connection: &mut C, mut buf: &[u8]) -> Result<(), error::Error> {
    while !buf.is_empty() {
        match connection.write(buf) {
            Ok(0) => return Err(error::Error::WriteError),
            Ok(n) => buf = &buf[n..],
            Err(_) => return Err(error::Error::WriteError),
        }
    }
    Ok(())
}

/// Fills `buf` completely. Running dry midway is a closed connection.
pub(crate) fn read_exact<C: Read>(connection: &mut C, buf: &mut [u8]) -> Result<(), error::Error> {
    let mut total_read = 0;
    while total_read < buf.len() {
        match connection.read(&mut buf[total_read..]) {
            Ok(0) => return Err(error::Error::ConnectionClosed),
            Ok(n) => total_read += n,
            Err(_) => return Err(error::Error::ReadError),
        }
    }
    Ok(())
}

/// Reads and throws away exactly `len` bytes, keeping the stream framed.
pub(crate) fn discard<C: Read>(connection: &mut C, mut len: usize) -> Result<(), error::Error> {
    let mut chunk = [0u8; 64];
    while len > 0 {
        let n = len.min(chunk.len());
        read_exact(connection, &mut chunk[..n])?;
        len -= n;
    }
    Ok(())
}
