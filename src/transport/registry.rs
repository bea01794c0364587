//! Fixed-capacity registries of subscribers and listeners.
//!
//! Both registries store borrowed trait objects and compare them by address,
//! so registering the same object twice is a no-op. Zero-sized subscribers
//! (closures capturing nothing) may share an address with each other; give a
//! subscriber state if it has to be told apart from another one.

use super::listener::TransportListener;
use super::{Error, MAX_LISTENERS, MAX_SUBSCRIBERS_PER_TOPIC, MAX_TOPICS, Subscriber, Topic};
use heapless::{FnvIndexMap, Vec};

/// Subscribers of one topic, in registration order.
pub type SubscriberList<'a> = Vec<&'a dyn Subscriber, MAX_SUBSCRIBERS_PER_TOPIC>;

/// Registered listeners, in registration order.
pub type ListenerList<'a> = Vec<&'a dyn TransportListener, MAX_LISTENERS>;

fn same<T: ?Sized>(a: &T, b: &T) -> bool {
    core::ptr::addr_eq(a as *const T, b as *const T)
}

/// Topic → subscribers map.
#[derive(Default)]
pub struct SubscriberRegistry<'a> {
    topics: FnvIndexMap<Topic, SubscriberList<'a>, MAX_TOPICS>,
}

impl<'a> SubscriberRegistry<'a> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            topics: FnvIndexMap::new(),
        }
    }

    /// Adds `subscriber` under `topic`.
    ///
    /// Returns `Ok(false)` when that exact subscriber was already registered.
    pub fn insert(&mut self, topic: &str, subscriber: &'a dyn Subscriber) -> Result<bool, Error> {
        let key = Topic::try_from(topic).map_err(|_| Error::InvalidTopic)?;

        if let Some(list) = self.topics.get_mut(&key) {
            if list.iter().any(|existing| same(*existing, subscriber)) {
                return Ok(false);
            }
            list.push(subscriber).map_err(|_| Error::CapacityExceeded)?;
            return Ok(true);
        }

        let mut list = SubscriberList::new();
        list.push(subscriber).map_err(|_| Error::CapacityExceeded)?;
        self.topics
            .insert(key, list)
            .map_err(|_| Error::CapacityExceeded)?;
        Ok(true)
    }

    /// Removes `subscriber` from `topic`. A topic left without subscribers is
    /// dropped from the map.
    ///
    /// Returns `false` when the subscriber was not registered there.
    pub fn remove(&mut self, topic: &str, subscriber: &dyn Subscriber) -> bool {
        let Ok(key) = Topic::try_from(topic) else {
            return false;
        };
        let Some(list) = self.topics.get_mut(&key) else {
            return false;
        };
        let Some(index) = list.iter().position(|existing| same(*existing, subscriber)) else {
            return false;
        };

        list.remove(index);
        if list.is_empty() {
            self.topics.remove(&key);
        }
        true
    }

    /// Copy of the subscribers of `topic`; empty when none are registered.
    pub fn snapshot(&self, topic: &str) -> SubscriberList<'a> {
        Topic::try_from(topic)
            .ok()
            .and_then(|key| self.topics.get(&key).cloned())
            .unwrap_or_default()
    }

    /// Number of subscribers on `topic`.
    pub fn count(&self, topic: &str) -> usize {
        Topic::try_from(topic)
            .ok()
            .and_then(|key| self.topics.get(&key).map(|list| list.len()))
            .unwrap_or(0)
    }

    /// Number of topics with at least one subscriber.
    pub fn topics(&self) -> usize {
        self.topics.len()
    }
}

impl core::fmt::Debug for SubscriberRegistry<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.topics.iter().map(|(topic, list)| (topic.as_str(), list.len())))
            .finish()
    }
}

/// Ordered set of listeners.
#[derive(Default)]
pub struct ListenerRegistry<'a> {
    listeners: ListenerList<'a>,
}

impl<'a> ListenerRegistry<'a> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Adds `listener`; `Ok(false)` if it was already present.
    pub fn insert(&mut self, listener: &'a dyn TransportListener) -> Result<bool, Error> {
        if self.listeners.iter().any(|existing| same(*existing, listener)) {
            return Ok(false);
        }
        self.listeners
            .push(listener)
            .map_err(|_| Error::CapacityExceeded)?;
        Ok(true)
    }

    /// Removes `listener`; `false` if it was not registered.
    pub fn remove(&mut self, listener: &dyn TransportListener) -> bool {
        match self.listeners.iter().position(|existing| same(*existing, listener)) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Copy of the current listeners.
    pub fn snapshot(&self) -> ListenerList<'a> {
        self.listeners.clone()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// `true` when no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl core::fmt::Debug for ListenerRegistry<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.listeners.len())
            .finish()
    }
}
