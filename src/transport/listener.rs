//! Observers of transport lifecycle events.

use super::{Error, Link};

/// Receives transport events.
///
/// Every method has an empty default body, so a listener only overrides the
/// events it cares about. The `Info` fields that are set for each event are
/// listed on the method.
///
/// Listeners are registered by reference and identified by address: adding
/// the same object twice keeps one registration.
///
/// ```rust
/// use gvcomm::transport::{Info, TransportListener};
/// use core::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct ConnectCounter(AtomicUsize);
///
/// impl TransportListener for ConnectCounter {
///     fn on_connect(&self, _info: &Info<'_>) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait TransportListener: Sync {
    /// The connection was established. Set: `transport`.
    fn on_connect(&self, info: &Info<'_>) {
        let _ = info;
    }

    /// The connection attempt failed. Set: `transport`, `failure`.
    fn on_connect_failed(&self, info: &Info<'_>) {
        let _ = info;
    }

    /// The transport is about to tear the connection down; it is still
    /// usable. Set: `transport`.
    fn on_before_disconnect(&self, info: &Info<'_>) {
        let _ = info;
    }

    /// The driver detected that the connection dropped. Set: `transport`,
    /// `failure`.
    fn on_connection_lost(&self, info: &Info<'_>) {
        let _ = info;
    }

    /// A topic subscription succeeded. Set: `transport`, `topic`.
    fn on_subscribe(&self, info: &Info<'_>) {
        let _ = info;
    }

    /// The last subscriber of a topic is going away and the transport is
    /// about to unsubscribe from it. Set: `transport`, `topic`.
    fn on_before_unsubscribe(&self, info: &Info<'_>) {
        let _ = info;
    }
}

/// Kinds of transport events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// See [`TransportListener::on_connect`].
    Connected,
    /// See [`TransportListener::on_connect_failed`].
    ConnectFailed,
    /// See [`TransportListener::on_before_disconnect`].
    BeforeDisconnect,
    /// See [`TransportListener::on_connection_lost`].
    ConnectionLost,
    /// See [`TransportListener::on_subscribe`].
    Subscribed,
    /// See [`TransportListener::on_before_unsubscribe`].
    BeforeUnsubscribe,
}

impl Event {
    /// Routes `info` to the listener method for this event.
    pub fn deliver(self, listener: &dyn TransportListener, info: &Info<'_>) {
        match self {
            Event::Connected => listener.on_connect(info),
            Event::ConnectFailed => listener.on_connect_failed(info),
            Event::BeforeDisconnect => listener.on_before_disconnect(info),
            Event::ConnectionLost => listener.on_connection_lost(info),
            Event::Subscribed => listener.on_subscribe(info),
            Event::BeforeUnsubscribe => listener.on_before_unsubscribe(info),
        }
    }
}

/// What a listener learns about an event.
#[derive(Clone, Copy)]
pub struct Info<'t> {
    /// The transport that raised the event.
    pub transport: &'t dyn Link,
    /// The topic the event refers to, if any.
    pub topic: Option<&'t str>,
    /// Why the operation failed, for failure events.
    pub failure: Option<Error>,
}

impl<'t> Info<'t> {
    /// Info carrying only the transport.
    pub fn new(transport: &'t dyn Link) -> Self {
        Self {
            transport,
            topic: None,
            failure: None,
        }
    }

    /// Info for a topic event.
    pub fn with_topic(transport: &'t dyn Link, topic: &'t str) -> Self {
        Self {
            topic: Some(topic),
            ..Self::new(transport)
        }
    }

    /// Info for a failure event.
    pub fn with_failure(transport: &'t dyn Link, failure: Error) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(transport)
        }
    }
}

impl core::fmt::Debug for Info<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Info")
            .field("topic", &self.topic)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}
