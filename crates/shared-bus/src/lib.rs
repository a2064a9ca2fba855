//! # Shared Bus - Framework Notification Bus
//!
//! A process-wide broadcast channel for events that concern observers outside
//! a single object graph.
//!
//! Object-level notifications (property changed, child changed, busy changed)
//! are delivered synchronously to the object's own listeners by the engine.
//! The bus carries the events a caller may want to observe without holding a
//! reference to the object that produced them:
//!
//! - failures of background work (async rules, async property loads) that no
//!   caller is awaiting,
//! - validation completion of async rule batches,
//! - saves performed by the data portal,
//! - principal switches and registry evictions.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe()  ┌──────────────┐
//! │ Object graph │ ────────────→ │  Event Bus   │ ────────────→ │   Observer   │
//! └──────────────┘               └──────────────┘               └──────────────┘
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, FrameworkEvent, SaveOperation};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events buffered per subscriber before the slowest one lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
