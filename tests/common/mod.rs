#![allow(dead_code)]

use gvcomm::network::error::Error as NetworkError;
use gvcomm::network::{Close, Connect, Connection, Read, Write};
use gvcomm::transport::{Driver, Error, Info, Message, Payload, QoS, TransportListener};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Everything a [`MockDriver`] was asked to do, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    Shutdown,
    Subscribe(String),
    Unsubscribe(String),
    Send {
        topic: String,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    },
}

/// Call log shared between a test and the driver it moved into a transport.
///
/// Listeners append their own entries here too, so ordering between
/// notifications and driver mechanics can be asserted.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<Entry>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Driver(Call),
    Listener(&'static str),
}

impl Journal {
    pub fn push(&self, entry: Entry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn driver_calls(&self) -> Vec<Call> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Driver(call) => Some(call),
                Entry::Listener(_) => None,
            })
            .collect()
    }

    pub fn sends(&self) -> Vec<(String, String)> {
        self.driver_calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send { topic, payload, .. } => {
                    Some((topic, String::from_utf8(payload).unwrap()))
                }
                _ => None,
            })
            .collect()
    }
}

/// Scriptable in-memory driver.
#[derive(Debug, Default)]
pub struct MockDriver {
    pub journal: Journal,
    pub connect_error: Option<Error>,
    pub subscribe_error: Option<Error>,
    pub inbox: VecDeque<Result<Message, Error>>,
}

impl MockDriver {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            ..Self::default()
        }
    }

    pub fn deliver(&mut self, topic: &str, payload: &[u8]) {
        self.inbox.push_back(Ok(message(topic, payload)));
    }

    fn record(&self, call: Call) {
        self.journal.push(Entry::Driver(call));
    }
}

impl Driver for MockDriver {
    fn connect(&mut self) -> Result<(), Error> {
        self.record(Call::Connect);
        self.connect_error.map_or(Ok(()), Err)
    }

    fn shutdown(&mut self) -> Result<(), Error> {
        self.record(Call::Shutdown);
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Error> {
        self.record(Call::Subscribe(topic.into()));
        self.subscribe_error.map_or(Ok(()), Err)
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), Error> {
        self.record(Call::Unsubscribe(topic.into()));
        Ok(())
    }

    fn send(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<(), Error> {
        self.record(Call::Send {
            topic: topic.into(),
            payload: payload.to_vec(),
            qos,
            retain,
        });
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Message>, Error> {
        self.inbox.pop_front().transpose()
    }
}

/// A driver implementing nothing but the trait defaults.
#[derive(Debug, Default)]
pub struct BareDriver;

impl Driver for BareDriver {}

pub fn message(topic: &str, payload: &[u8]) -> Message {
    Message {
        topic: topic.try_into().unwrap(),
        payload: Payload::from_slice(payload).unwrap(),
    }
}

/// Listener recording which events it saw, with their info.
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub seen: Mutex<Vec<Seen>>,
    pub journal: Option<Journal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Seen {
    pub event: &'static str,
    pub topic: Option<String>,
    pub failure: Option<Error>,
}

impl RecordingListener {
    pub fn with_journal(journal: &Journal) -> Self {
        Self {
            journal: Some(journal.clone()),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.seen.lock().unwrap().iter().map(|seen| seen.event).collect()
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn record(&self, event: &'static str, info: &Info<'_>) {
        self.seen.lock().unwrap().push(Seen {
            event,
            topic: info.topic.map(String::from),
            failure: info.failure,
        });
        if let Some(journal) = &self.journal {
            journal.push(Entry::Listener(event));
        }
    }
}

impl TransportListener for RecordingListener {
    fn on_connect(&self, info: &Info<'_>) {
        self.record("connect", info);
    }

    fn on_connect_failed(&self, info: &Info<'_>) {
        self.record("connect_failed", info);
    }

    fn on_before_disconnect(&self, info: &Info<'_>) {
        self.record("before_disconnect", info);
    }

    fn on_connection_lost(&self, info: &Info<'_>) {
        self.record("connection_lost", info);
    }

    fn on_subscribe(&self, info: &Info<'_>) {
        self.record("subscribe", info);
    }

    fn on_before_unsubscribe(&self, info: &Info<'_>) {
        self.record("before_unsubscribe", info);
    }
}

/// Subscriber that logs the payload it received and appends `suffix`.
#[derive(Debug)]
pub struct Stage {
    pub suffix: &'static str,
    pub received: Mutex<Vec<String>>,
}

impl Stage {
    pub fn new(suffix: &'static str) -> Self {
        Self {
            suffix,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

impl gvcomm::transport::Subscriber for Stage {
    fn call(&self, mut payload: Payload) -> Payload {
        self.received
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(&payload).into_owned());
        payload.extend_from_slice(self.suffix.as_bytes()).unwrap();
        payload
    }
}

/// Byte-level state behind a [`MockConnection`], shared with the test.
#[derive(Debug, Default)]
pub struct WireState {
    pub inbound: VecDeque<u8>,
    pub outbound: Vec<u8>,
    pub dialed: Vec<String>,
    pub closed: usize,
    pub fail_reads: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Wire {
    state: Arc<Mutex<WireState>>,
}

impl Wire {
    /// Queues bytes the peer "sends".
    pub fn feed(&self, bytes: &[u8]) {
        self.state.lock().unwrap().inbound.extend(bytes);
    }

    /// Takes everything written so far.
    pub fn take_outbound(&self) -> Vec<u8> {
        std::mem::take(&mut self.state.lock().unwrap().outbound)
    }

    pub fn dialed(&self) -> Vec<String> {
        self.state.lock().unwrap().dialed.clone()
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    /// Inbound bytes nobody has read yet.
    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().inbound.len()
    }

    pub fn fail_reads(&self) {
        self.state.lock().unwrap().fail_reads = true;
    }
}

pub struct MockConnection {
    wire: Wire,
}

impl Read for MockConnection {
    type Error = NetworkError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut state = self.wire.state.lock().unwrap();
        if state.fail_reads {
            return Err(NetworkError::ReadError);
        }
        let len = buf.len().min(state.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..len)) {
            *slot = byte;
        }
        Ok(len)
    }
}

impl Write for MockConnection {
    type Error = NetworkError;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.wire.state.lock().unwrap().outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for MockConnection {
    type Error = NetworkError;

    fn close(self) -> Result<(), Self::Error> {
        self.wire.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

impl Connection for MockConnection {}

pub struct MockNetwork {
    pub wire: Wire,
    pub refuse: bool,
}

impl MockNetwork {
    pub fn new(wire: &Wire) -> Self {
        Self {
            wire: wire.clone(),
            refuse: false,
        }
    }
}

impl Connect for MockNetwork {
    type Connection = MockConnection;
    type Error = NetworkError;

    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error> {
        self.wire.state.lock().unwrap().dialed.push(remote.into());
        if self.refuse {
            return Err(NetworkError::ConnectionRefused);
        }
        Ok(MockConnection {
            wire: self.wire.clone(),
        })
    }
}
