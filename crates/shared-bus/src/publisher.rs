//! # Event Publisher
//!
//! The publishing side of the bus.

use crate::events::{EventFilter, FrameworkEvent};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Publishing interface used by the engine.
///
/// Publishing never blocks: the engine raises bus events from inside property
/// setters and from background tasks alike.
pub trait EventPublisher: Send + Sync {
    /// Publish an event; returns how many subscribers received it.
    fn publish(&self, event: FrameworkEvent) -> usize;

    /// Total events published, delivered or not.
    fn events_published(&self) -> u64;
}

/// In-memory bus backed by `tokio::sync::broadcast`.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<FrameworkEvent>,
    active: Arc<AtomicUsize>,
    events_published: AtomicU64,
    events_dropped: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with a specific per-subscriber buffer.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            active: Arc::new(AtomicUsize::new(0)),
            events_published: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        self.active.fetch_add(1, Ordering::Relaxed);
        debug!(topics = ?filter.topics, "New bus subscription");
        Subscription::new(receiver, filter, self.active.clone())
    }

    /// Subscribe and wrap the subscription as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.sender.subscribe(), filter)
    }

    /// Live `Subscription` handles (streams are not counted).
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Receivers currently attached to the channel, streams included.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Per-subscriber buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events published while nobody was listening.
    #[must_use]
    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: FrameworkEvent) -> usize {
        let topic = event.topic();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(topic = ?topic, receivers, "Event published");
                receivers
            }
            Err(_) => {
                self.events_dropped.fetch_add(1, Ordering::Relaxed);
                trace!(topic = ?topic, "Event dropped (no receivers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
