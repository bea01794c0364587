//! Transport core.
//!
//! A [`Transport`] owns three things:
//!
//! - the connection lifecycle (`connect`, `shutdown`), carried out by a
//!   pluggable [`Driver`];
//! - a per-topic registry of [`Subscriber`]s, fed by [`Transport::callback`];
//! - a set of [`TransportListener`]s told about lifecycle events.
//!
//! Connection failures never come back from [`Transport::connect`]; they reach
//! listeners as [`Event::ConnectFailed`]. Failures of request/response calls
//! (`subscribe`, `send`) are returned to the caller unchanged.
//!
//! # Dispatch
//!
//! Subscribers of one topic form a pipeline: each receives the output of the
//! one registered before it, and the last output is dropped.
//!
//! ```rust
//! use gvcomm::transport::{Driver, Payload, Transport};
//!
//! struct Loopback;
//! impl Driver for Loopback {
//!     fn subscribe(&mut self, _topic: &str) -> Result<(), gvcomm::Error> {
//!         Ok(())
//!     }
//! }
//!
//! let upper = |mut payload: Payload| {
//!     payload.make_ascii_uppercase();
//!     payload
//! };
//! let transport = Transport::new(Loopback);
//! transport.subscribe("/devices/dev1/input", &upper).unwrap();
//! transport.callback("/devices/dev1/input", b"on");
//! ```
//!
//! # Concurrency
//!
//! The registries live in the [`Dispatcher`], behind `critical-section`
//! mutexes. A driver that delivers from its own thread, task or interrupt
//! holds a `&Dispatcher` and calls [`Dispatcher::callback`] while the owning
//! context keeps subscribing. Locks are only held to copy or update a
//! registry; subscribers and listeners always run with every lock released,
//! and with the driver not borrowed, so they may call back into the transport.

use core::cell::RefCell;
use critical_section::Mutex;
use heapless::{String, Vec};

mod error;
mod listener;
mod mqtt;
mod registry;
mod rest;

pub use crate::device::Endpoint;
pub use crate::network::application::mqtt::Credentials;
pub use error::Error;
pub use listener::{Event, Info, TransportListener};
pub use mqtt::{MqttDriver, MqttOptions};
pub use registry::{ListenerList, ListenerRegistry, SubscriberList, SubscriberRegistry};
pub use rest::{RestDriver, RestOptions};

/// Maximum length of a topic, in bytes.
pub const MAX_TOPIC_LEN: usize = 128;
/// Maximum length of a payload, in bytes.
pub const MAX_PAYLOAD_LEN: usize = 512;
/// Maximum number of topics with subscribers. Must be a power of two.
pub const MAX_TOPICS: usize = 16;
/// Maximum number of subscribers on one topic.
pub const MAX_SUBSCRIBERS_PER_TOPIC: usize = 8;
/// Maximum number of listeners on one transport.
pub const MAX_LISTENERS: usize = 8;

/// An owned topic.
pub type Topic = String<MAX_TOPIC_LEN>;
/// An owned payload, as passed along a subscriber pipeline.
pub type Payload = Vec<u8, MAX_PAYLOAD_LEN>;

/// Delivery guarantee requested for a message.
///
/// Forwarded to the driver as-is; the core attaches no meaning to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QoS {
    /// Fire and forget.
    #[default]
    AtMostOnce = 0,
    /// Acknowledged delivery, possibly duplicated.
    AtLeastOnce = 1,
    /// Exactly-once handshake.
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = u8;

    /// Decodes a QoS level; the unknown value is handed back as the error.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(other),
        }
    }
}

/// A message a driver received on a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Topic the message arrived on.
    pub topic: Topic,
    /// Raw message body.
    pub payload: Payload,
}

/// One stage of a topic's pipeline.
///
/// Implemented for every `Fn(Payload) -> Payload + Sync`, so closures can be
/// subscribed directly. Subscribers are identified by address: subscribing
/// the same object twice to a topic keeps a single registration.
pub trait Subscriber: Sync {
    /// Handles `payload` and returns the input of the next stage.
    fn call(&self, payload: Payload) -> Payload;
}

impl<F> Subscriber for F
where
    F: Fn(Payload) -> Payload + Sync,
{
    fn call(&self, payload: Payload) -> Payload {
        self(payload)
    }
}

/// The outbound surface of a transport, as seen by protocols and listeners.
///
/// Object safe, so it can be borrowed as `&dyn Link` independently of the
/// driver type.
pub trait Link {
    /// Sends `payload` to `topic`.
    fn send(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<(), Error>;

    /// Number of subscribers registered on `topic`.
    fn subscriber_count(&self, topic: &str) -> usize;
}

/// Transport-specific mechanics.
///
/// `connect` and `shutdown` default to doing nothing. The other operations
/// default to [`Error::NotImplemented`], so a driver only provides what its
/// wire protocol supports.
pub trait Driver {
    /// Opens the connection. Fails as a whole, never partially.
    fn connect(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Tears the connection down. Must be safe when never connected.
    fn shutdown(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Registers interest in `topic` with the remote side.
    fn subscribe(&mut self, topic: &str) -> Result<(), Error> {
        let _ = topic;
        Err(Error::NotImplemented)
    }

    /// Withdraws interest in `topic`.
    fn unsubscribe(&mut self, topic: &str) -> Result<(), Error> {
        let _ = topic;
        Err(Error::NotImplemented)
    }

    /// Delivers `payload` to `topic`.
    fn send(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<(), Error> {
        let _ = (topic, payload, qos, retain);
        Err(Error::NotImplemented)
    }

    /// Fetches one pending inbound message, `None` when there is nothing left.
    fn poll(&mut self) -> Result<Option<Message>, Error> {
        Err(Error::NotImplemented)
    }
}

/// Subscriber and listener registries of one transport.
///
/// `Sync`: every method takes `&self` and may be called from any execution
/// context.
pub struct Dispatcher<'a> {
    subscribers: Mutex<RefCell<SubscriberRegistry<'a>>>,
    listeners: Mutex<RefCell<ListenerRegistry<'a>>>,
}

impl Default for Dispatcher<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Dispatcher<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        critical_section::with(|cs| {
            f.debug_struct("Dispatcher")
                .field("subscribers", &*self.subscribers.borrow_ref(cs))
                .field("listeners", &*self.listeners.borrow_ref(cs))
                .finish()
        })
    }
}

impl<'a> Dispatcher<'a> {
    /// Creates empty registries.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(RefCell::new(SubscriberRegistry::new())),
            listeners: Mutex::new(RefCell::new(ListenerRegistry::new())),
        }
    }

    /// Adds `subscriber` to `topic`; `Ok(false)` if it was already there.
    pub fn subscribe(&self, topic: &str, subscriber: &'a dyn Subscriber) -> Result<bool, Error> {
        critical_section::with(|cs| self.subscribers.borrow_ref_mut(cs).insert(topic, subscriber))
    }

    /// Removes `subscriber` from `topic`.
    ///
    /// Returns the number of subscribers left on the topic, or `None` when
    /// `subscriber` was not registered there.
    pub fn unsubscribe(&self, topic: &str, subscriber: &dyn Subscriber) -> Option<usize> {
        critical_section::with(|cs| {
            let mut registry = self.subscribers.borrow_ref_mut(cs);
            registry
                .remove(topic, subscriber)
                .then(|| registry.count(topic))
        })
    }

    /// Runs `payload` through the pipeline registered on `topic`.
    ///
    /// A topic without subscribers is a no-op. A payload longer than
    /// [`MAX_PAYLOAD_LEN`] is logged and dropped.
    pub fn callback(&self, topic: &str, payload: &[u8]) {
        let subscribers = critical_section::with(|cs| self.subscribers.borrow_ref(cs).snapshot(topic));
        if subscribers.is_empty() {
            trace!("no subscribers on {}", topic);
            return;
        }

        let Ok(mut payload) = Payload::from_slice(payload) else {
            warn!("dropping {} byte payload on {}", payload.len(), topic);
            return;
        };

        trace!("dispatching to {} subscribers on {}", subscribers.len(), topic);
        for subscriber in subscribers.iter() {
            payload = subscriber.call(payload);
        }
    }

    /// Number of subscribers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        critical_section::with(|cs| self.subscribers.borrow_ref(cs).count(topic))
    }

    /// Adds `listener`; `Ok(false)` if it was already registered.
    pub fn add_listener(&self, listener: &'a dyn TransportListener) -> Result<bool, Error> {
        critical_section::with(|cs| self.listeners.borrow_ref_mut(cs).insert(listener))
    }

    /// Removes `listener`; `false` if it was not registered.
    pub fn remove_listener(&self, listener: &dyn TransportListener) -> bool {
        critical_section::with(|cs| self.listeners.borrow_ref_mut(cs).remove(listener))
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        critical_section::with(|cs| self.listeners.borrow_ref(cs).len())
    }

    /// Delivers `event` to every listener, in registration order.
    pub fn notify(&self, event: Event, info: &Info<'_>) {
        let listeners = critical_section::with(|cs| self.listeners.borrow_ref(cs).snapshot());
        for listener in listeners.iter() {
            event.deliver(*listener, info);
        }
    }
}

/// A transport: lifecycle and dispatch on top of a [`Driver`].
///
/// Construction has no side effects; nothing touches the network before
/// [`connect`](Self::connect).
///
/// The driver sits in a `RefCell`. A call that needs it while it is already
/// borrowed further up the stack (say, a subscriber calling
/// [`send`](Self::send) from inside [`poll`](Self::poll)) fails with
/// [`Error::Busy`] rather than panicking. Dispatch itself never holds the
/// driver, so sending from a subscriber invoked by `poll` works.
pub struct Transport<'a, D: Driver> {
    driver: RefCell<D>,
    dispatcher: Dispatcher<'a>,
}

impl<D: Driver> core::fmt::Debug for Transport<'_, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transport")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl<'a, D: Driver> Transport<'a, D> {
    /// Wraps `driver`. Does not connect.
    pub fn new(driver: D) -> Self {
        Self {
            driver: RefCell::new(driver),
            dispatcher: Dispatcher::new(),
        }
    }

    /// Connects through the driver.
    ///
    /// Never fails: success is announced as [`Event::Connected`], failure as
    /// [`Event::ConnectFailed`] carrying the driver's error.
    pub fn connect(&self) {
        match self.drive(|driver| driver.connect()) {
            Ok(()) => {
                info!("transport connected");
                self.notify(Event::Connected, &Info::new(self));
            }
            Err(err) => {
                warn!("connect failed: {}", err);
                self.notify(Event::ConnectFailed, &Info::with_failure(self, err));
            }
        }
    }

    /// Registers `subscriber` on `topic`, asks the driver to subscribe, then
    /// announces [`Event::Subscribed`].
    ///
    /// The registration is kept even when the driver fails, so inbound data
    /// the driver still delivers on `topic` reaches `subscriber`.
    ///
    /// # Errors
    ///
    /// Registry capacity errors, or the driver's error unchanged.
    pub fn subscribe(&self, topic: &str, subscriber: &'a dyn Subscriber) -> Result<(), Error> {
        self.dispatcher.subscribe(topic, subscriber)?;
        self.drive(|driver| driver.subscribe(topic))?;
        debug!("subscribed to {}", topic);
        self.notify(Event::Subscribed, &Info::with_topic(self, topic));
        Ok(())
    }

    /// Removes `subscriber` from `topic`.
    ///
    /// When it was the last one, announces [`Event::BeforeUnsubscribe`] and
    /// then asks the driver to unsubscribe. Returns `Ok(false)` when
    /// `subscriber` was not registered on `topic`.
    pub fn unsubscribe(&self, topic: &str, subscriber: &dyn Subscriber) -> Result<bool, Error> {
        match self.dispatcher.unsubscribe(topic, subscriber) {
            None => Ok(false),
            Some(0) => {
                self.notify(Event::BeforeUnsubscribe, &Info::with_topic(self, topic));
                self.drive(|driver| driver.unsubscribe(topic))?;
                debug!("unsubscribed from {}", topic);
                Ok(true)
            }
            Some(_) => Ok(true),
        }
    }

    /// Announces [`Event::BeforeDisconnect`], then shuts the driver down.
    ///
    /// Listeners run while the connection is still up and may send.
    pub fn shutdown(&self) -> Result<(), Error> {
        self.notify(Event::BeforeDisconnect, &Info::new(self));
        self.drive(|driver| driver.shutdown())?;
        info!("transport shut down");
        Ok(())
    }

    /// Sends `payload` to `topic` through the driver.
    pub fn send(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<(), Error> {
        self.drive(|driver| driver.send(topic, payload, qos, retain))
    }

    /// Pumps the driver until it has nothing pending, dispatching each
    /// message with [`callback`](Self::callback).
    ///
    /// A failure meaning the link dropped (see
    /// [`Error::is_connection_loss`]) is announced as
    /// [`Event::ConnectionLost`] and not returned.
    pub fn poll(&self) -> Result<(), Error> {
        loop {
            match self.drive(|driver| driver.poll()) {
                Ok(Some(message)) => self.callback(&message.topic, &message.payload),
                Ok(None) => return Ok(()),
                Err(err) if err.is_connection_loss() => {
                    self.connection_lost(err);
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Entry point for inbound data; see [`Dispatcher::callback`].
    pub fn callback(&self, topic: &str, payload: &[u8]) {
        self.dispatcher.callback(topic, payload);
    }

    /// Announces [`Event::ConnectionLost`] with `reason`.
    pub fn connection_lost(&self, reason: Error) {
        warn!("connection lost: {}", reason);
        self.notify(Event::ConnectionLost, &Info::with_failure(self, reason));
    }

    /// Registers `listener`; `Ok(false)` if it already was.
    pub fn add_listener(&self, listener: &'a dyn TransportListener) -> Result<bool, Error> {
        self.dispatcher.add_listener(listener)
    }

    /// Unregisters `listener`; `false` if it was not registered.
    pub fn remove_listener(&self, listener: &dyn TransportListener) -> bool {
        self.dispatcher.remove_listener(listener)
    }

    /// Number of subscribers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.dispatcher.subscriber_count(topic)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.dispatcher.listener_count()
    }

    /// The registries, for drivers that deliver from another context.
    pub fn dispatcher(&self) -> &Dispatcher<'a> {
        &self.dispatcher
    }

    /// Runs `f` with the driver borrowed mutably.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] when the driver is already borrowed.
    pub fn with_driver<R>(&self, f: impl FnOnce(&mut D) -> R) -> Result<R, Error> {
        let mut driver = self.driver.try_borrow_mut().map_err(|_| Error::Busy)?;
        Ok(f(&mut driver))
    }

    fn drive<R>(&self, f: impl FnOnce(&mut D) -> Result<R, Error>) -> Result<R, Error> {
        self.with_driver(f)?
    }

    fn notify(&self, event: Event, info: &Info<'_>) {
        debug!("notifying {} listeners of {:?}", self.dispatcher.listener_count(), event);
        self.dispatcher.notify(event, info);
    }
}

impl<D: Driver> Link for Transport<'_, D> {
    fn send(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool) -> Result<(), Error> {
        Transport::send(self, topic, payload, qos, retain)
    }

    fn subscriber_count(&self, topic: &str) -> usize {
        Transport::subscriber_count(self, topic)
    }
}
