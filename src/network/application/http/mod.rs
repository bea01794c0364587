//! HTTP/1.1 protocol implementation for embedded systems.
//!
//! A request/response client with fixed-size buffers. It backs
//! [`RestDriver`](crate::transport::RestDriver), which POSTs each outbound
//! payload to the path named by its topic.
//!
//! ```rust,no_run
//! use gvcomm::network::application::http::{Client, Request};
//! # use gvcomm::network::Connection;
//! # struct MockConnection;
//! # impl Connection for MockConnection {}
//! # impl gvcomm::network::Read for MockConnection {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl gvcomm::network::Write for MockConnection {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl gvcomm::network::Close for MockConnection {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//!
//! let mut client = Client::new(MockConnection);
//! let request = Request::post("/devices/dev1", br#"{"nm":"Greenhouse"}"#)
//!     .header("Content-Type", "application/json; charset=utf-8")?;
//! let response = client.request(&request)?;
//! assert!(response.is_success());
//! # Ok::<(), gvcomm::network::error::Error>(())
//! ```

/// HTTP client implementation and supporting types.
pub mod client;

pub use client::{Client, Header, Method, Request, Response};
