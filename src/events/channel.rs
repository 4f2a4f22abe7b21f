//! Event channel implementation using crossbeam-channel.
//!
//! The core only ever holds an [`EventSender`]. A disabled sender drops
//! everything, so callers that don't care about progress pay nothing.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::Event;

/// Sends events from the core library. Cheap to clone across worker threads.
#[derive(Clone, Default)]
pub struct EventSender {
    inner: Option<Sender<Event>>,
}

impl EventSender {
    /// Wrap a raw crossbeam sender
    pub fn new(sender: Sender<Event>) -> Self {
        Self {
            inner: Some(sender),
        }
    }

    /// A sender that discards every event
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Send an event. A dropped receiver is not an error.
    pub fn send(&self, event: Event) {
        if let Some(sender) = &self.inner {
            let _ = sender.send(event);
        }
    }

    /// Whether anyone can still receive events
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }
}

/// Receives events from the core library
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, or `None` once every sender is gone
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Constructors for connected sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    /// Unbounded channel; events are small
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (EventSender::new(sender), EventReceiver { inner: receiver })
    }

    /// Bounded channel for UIs that need backpressure
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        (EventSender::new(sender), EventReceiver { inner: receiver })
    }
}
