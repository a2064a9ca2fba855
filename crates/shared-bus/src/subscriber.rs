//! # Event Subscriber
//!
//! The receiving side of the bus.

use crate::events::{EventFilter, FrameworkEvent};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was dropped.
    #[error("Event bus closed")]
    Closed,
}

/// A subscription handle; dropping it unsubscribes.
pub struct Subscription {
    receiver: broadcast::Receiver<FrameworkEvent>,
    filter: EventFilter,
    active: Arc<AtomicUsize>,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<FrameworkEvent>,
        filter: EventFilter,
        active: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            receiver,
            filter,
            active,
        }
    }

    /// Wait for the next matching event; `None` once the bus is gone.
    ///
    /// A lagging subscriber skips the events it missed rather than failing.
    pub async fn recv(&mut self) -> Option<FrameworkEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, events skipped");
                }
            }
        }
    }

    /// Take the next matching event if one is already buffered.
    pub fn try_recv(&mut self) -> Result<Option<FrameworkEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
            }
        }
    }

    /// Filter this subscription was created with.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        debug!("Bus subscription dropped");
    }
}

/// Filtered `Stream` over bus events.
pub struct EventStream {
    inner: BroadcastStream<FrameworkEvent>,
    filter: EventFilter,
}

impl EventStream {
    pub(crate) fn new(receiver: broadcast::Receiver<FrameworkEvent>, filter: EventFilter) -> Self {
        Self {
            inner: BroadcastStream::new(receiver),
            filter,
        }
    }

    /// Filter this stream was created with.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = FrameworkEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if self.filter.matches(&event) {
                        return Poll::Ready(Some(event));
                    }
                }
                // Lagged: skip what was missed and keep reading.
                Poll::Ready(Some(Err(_))) => {}
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
