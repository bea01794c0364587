use crate::network::Connection;
use crate::network::error::Error;
use crate::network::{discard, read_exact, write_all};
use core::fmt::Write;
use heapless::{String, Vec};

const MAX_HEADERS: usize = 16;
const MAX_HEADER_NAME_LEN: usize = 64;
const MAX_HEADER_VALUE_LEN: usize = 256;
const MAX_REQUEST_LEN: usize = 2048;
const MAX_RESPONSE_LEN: usize = 2048;

const USER_AGENT: &str = "gvcomm";

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A single header line.
#[derive(Debug, Clone)]
pub struct Header {
    /// Header name.
    pub name: String<MAX_HEADER_NAME_LEN>,
    /// Header value.
    pub value: String<MAX_HEADER_VALUE_LEN>,
}

impl Header {
    /// Builds a header, failing when either part exceeds its capacity.
    pub fn new(name: &str, value: &str) -> Result<Self, Error> {
        Ok(Self {
            name: String::try_from(name).map_err(|_| Error::ProtocolError)?,
            value: String::try_from(value).map_err(|_| Error::ProtocolError)?,
        })
    }
}

/// An outgoing request.
#[derive(Debug)]
pub struct Request<'a> {
    /// Request method.
    pub method: Method,
    /// Request target, e.g. `/devices/dev1`.
    pub path: &'a str,
    /// Extra headers. `User-Agent` is added when absent; `Content-Length` is
    /// always derived from `body`.
    pub headers: Vec<Header, MAX_HEADERS>,
    /// Optional body.
    pub body: Option<&'a [u8]>,
}

impl<'a> Request<'a> {
    /// A `GET` without headers.
    pub fn get(path: &'a str) -> Self {
        Self {
            method: Method::Get,
            path,
            headers: Vec::new(),
            body: None,
        }
    }

    /// A `POST` carrying `body`.
    pub fn post(path: &'a str, body: &'a [u8]) -> Self {
        Self {
            method: Method::Post,
            path,
            headers: Vec::new(),
            body: Some(body),
        }
    }

    /// Appends a header.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        self.headers
            .push(Header::new(name, value)?)
            .map_err(|_| Error::ProtocolError)?;
        Ok(self)
    }
}

/// A parsed response.
#[derive(Debug)]
pub struct Response {
    /// Status code from the status line.
    pub status_code: u16,
    /// Response headers in arrival order.
    pub headers: Vec<Header, MAX_HEADERS>,
    /// Body, truncated to `Content-Length` when present.
    pub body: Vec<u8, MAX_RESPONSE_LEN>,
    /// The announced body did not fit `body`; the rest was read and dropped.
    pub truncated: bool,
}

impl Response {
    /// `true` for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status_code)
    }

    /// Looks a header up by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }
}

/// HTTP/1.1 client over a single connection.
pub struct Client<C: Connection> {
    connection: C,
}

impl<C: Connection> core::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl<C: Connection> Client<C> {
    /// Wraps an open connection.
    pub fn new(connection: C) -> Self {
        Self { connection }
    }

    /// Gives the connection back, e.g. to close it.
    pub fn into_inner(self) -> C {
        self.connection
    }

    /// Sends `request` and reads the response, body included.
    ///
    /// A body longer than the response buffer is cut at its capacity and
    /// [`Response::truncated`] is set; the remainder is drained from the
    /// connection.
    pub fn request(&mut self, request: &Request) -> Result<Response, Error> {
        let mut response = self.request_head(request)?;

        if let Some(len) = response
            .header("Content-Length")
            .and_then(|value| value.parse::<usize>().ok())
        {
            let kept = len.min(response.body.capacity());
            if response.body.len() < kept {
                let already = response.body.len();
                response.body.resize(kept, 0).map_err(|_| Error::ProtocolError)?;
                read_exact(&mut self.connection, &mut response.body[already..])?;
            }
            if len > kept {
                discard(&mut self.connection, len - response.body.len())?;
                response.truncated = true;
            }
            response.body.truncate(kept);
        }

        Ok(response)
    }

    /// Sends `request` and reads only the status line and headers.
    ///
    /// `body` holds whatever arrived together with the headers. Use this when
    /// the connection is closed right after and only the status matters.
    pub fn request_head(&mut self, request: &Request) -> Result<Response, Error> {
        let encoded = encode_request(request)?;
        write_all(&mut self.connection, &encoded)?;
        self.connection.flush().map_err(|_| Error::WriteError)?;

        let mut response_buf = [0u8; MAX_RESPONSE_LEN];
        let mut total_read = 0;
        loop {
            match self.connection.read(&mut response_buf[total_read..]) {
                Ok(0) if total_read > 0 => break, // Connection closed, but we have data
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => {
                    total_read += n;
                    if total_read >= response_buf.len()
                        || find_slice(&response_buf[..total_read], b"\r\n\r\n").is_some()
                    {
                        break;
                    }
                }
                Err(_) => return Err(Error::ReadError),
            }
        }

        parse_response(&response_buf[..total_read])
    }
}

/// Serializes the request line, headers and body.
fn encode_request(request: &Request) -> Result<Vec<u8, MAX_REQUEST_LEN>, Error> {
    let mut buf: Vec<u8, MAX_REQUEST_LEN> = Vec::new();
    let mut line = |parts: &[&[u8]]| -> Result<(), Error> {
        for part in parts {
            buf.extend_from_slice(part).map_err(|_| Error::WriteError)?;
        }
        buf.extend_from_slice(b"\r\n").map_err(|_| Error::WriteError)
    };

    line(&[
        request.method.as_str().as_bytes(),
        b" ",
        request.path.as_bytes(),
        b" HTTP/1.1",
    ])?;

    let mut has_user_agent = false;
    for header in &request.headers {
        if header.name.eq_ignore_ascii_case("Content-Length") {
            continue;
        }
        has_user_agent |= header.name.eq_ignore_ascii_case("User-Agent");
        line(&[header.name.as_bytes(), b": ", header.value.as_bytes()])?;
    }
    if !has_user_agent {
        line(&[b"User-Agent: ", USER_AGENT.as_bytes()])?;
    }

    match request.body {
        Some(body) => {
            let mut len_str: String<10> = String::new();
            write!(len_str, "{}", body.len()).map_err(|_| Error::WriteError)?;
            line(&[b"Content-Length: ", len_str.as_bytes()])?;
            line(&[])?;
            buf.extend_from_slice(body).map_err(|_| Error::WriteError)?;
        }
        None => line(&[])?,
    }

    Ok(buf)
}

/// Parses status line, headers and whatever part of the body arrived.
fn parse_response(data: &[u8]) -> Result<Response, Error> {
    let header_end = find_slice(data, b"\r\n\r\n").ok_or(Error::ProtocolError)?;
    let header_str = core::str::from_utf8(&data[..header_end]).map_err(|_| Error::ProtocolError)?;
    let mut lines = header_str.lines();

    // "HTTP/1.1 201 Created"
    let status_line = lines.next().ok_or(Error::ProtocolError)?;
    let status_code = status_line
        .split(' ')
        .nth(1)
        .ok_or(Error::ProtocolError)?
        .parse::<u16>()
        .map_err(|_| Error::ProtocolError)?;

    let mut headers: Vec<Header, MAX_HEADERS> = Vec::new();
    for line in lines.filter(|line| !line.is_empty()) {
        let (name, value) = line.split_once(':').ok_or(Error::ProtocolError)?;
        headers
            .push(Header::new(name.trim(), value.trim())?)
            .map_err(|_| Error::ProtocolError)?;
    }

    let body = Vec::from_slice(&data[header_end + 4..]).map_err(|_| Error::ProtocolError)?;

    Ok(Response {
        status_code,
        headers,
        body,
        truncated: false,
    })
}

/// Finds the first occurrence of a slice in another slice and returns its starting position.
fn find_slice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_carries_content_length_and_default_user_agent() {
        let request = Request::post("/devices/dev1", b"{}")
            .header("Content-Type", "application/json")
            .unwrap();
        let encoded = encode_request(&request).unwrap();
        assert_eq!(
            core::str::from_utf8(&encoded).unwrap(),
            "POST /devices/dev1 HTTP/1.1\r\n\
             Content-Type: application/json\r\n\
             User-Agent: gvcomm\r\n\
             Content-Length: 2\r\n\
             \r\n\
             {}"
        );
    }

    #[test]
    fn response_status_headers_and_partial_body() {
        let response =
            parse_response(b"HTTP/1.1 404 Not Found\r\nContent-Length: 4\r\n\r\nnope").unwrap();
        assert_eq!(response.status_code, 404);
        assert!(!response.is_success());
        assert_eq!(response.header("content-length"), Some("4"));
        assert_eq!(&response.body[..], b"nope");
    }
}
