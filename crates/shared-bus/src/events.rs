//! # Framework Events
//!
//! Every event that flows through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::{FrameworkError, TypeName};

/// Kind of write the data portal performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveOperation {
    Insert,
    Update,
    Delete,
}

/// All events that can be published to the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameworkEvent {
    /// Background work on an object failed and nobody awaited it.
    UnhandledAsyncException {
        type_name: TypeName,
        identity: i32,
        /// Property the failed rule or load was bound to, if any.
        property: Option<String>,
        error: FrameworkError,
    },

    /// The last running async rule on an object finished.
    ValidationComplete { type_name: TypeName, identity: i32 },

    /// The data portal persisted an object.
    ObjectSaved {
        type_name: TypeName,
        identity: i32,
        operation: SaveOperation,
    },

    /// The active principal was replaced.
    PrincipalChanged { name: String, authenticated: bool },

    /// A type's property and rule metadata were purged.
    TypeEvicted { type_name: TypeName },
}

impl FrameworkEvent {
    /// Topic used for filtering.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::UnhandledAsyncException { .. } => EventTopic::Errors,
            Self::ValidationComplete { .. } => EventTopic::Validation,
            Self::ObjectSaved { .. } => EventTopic::Persistence,
            Self::PrincipalChanged { .. } => EventTopic::Security,
            Self::TypeEvicted { .. } => EventTopic::Registry,
        }
    }

    /// Declaring type the event is about, when there is one.
    #[must_use]
    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            Self::UnhandledAsyncException { type_name, .. }
            | Self::ValidationComplete { type_name, .. }
            | Self::ObjectSaved { type_name, .. }
            | Self::TypeEvicted { type_name } => Some(type_name),
            Self::PrincipalChanged { .. } => None,
        }
    }
}

/// Event topics for filtering subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Failures of background work.
    Errors,
    /// Async validation lifecycle.
    Validation,
    /// Data portal saves.
    Persistence,
    /// Principal changes.
    Security,
    /// Metadata registry maintenance.
    Registry,
    /// Matches every topic.
    All,
}

/// Subscription filter.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Declaring types to include. Empty means all types; events without a
    /// type (principal changes) only pass an empty type list.
    pub type_names: Vec<TypeName>,
}

impl EventFilter {
    /// Accept everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accept only the given topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            type_names: Vec::new(),
        }
    }

    /// Narrow to events about the given types.
    #[must_use]
    pub fn for_types(mut self, type_names: Vec<TypeName>) -> Self {
        self.type_names = type_names;
        self
    }

    /// Check if an event passes the filter.
    #[must_use]
    pub fn matches(&self, event: &FrameworkEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let type_match = self.type_names.is_empty()
            || event
                .type_name()
                .is_some_and(|name| self.type_names.contains(name));

        topic_match && type_match
    }
}
