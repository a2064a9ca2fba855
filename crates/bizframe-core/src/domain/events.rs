//! Object, list and child notifications.
//!
//! Objects and lists raise their own events to local listeners. Anything a
//! child raises travels to its parent as one [`ChildEvent`] through the single
//! parent link, keeping the original source so listeners at the root can tell
//! which node changed.

use crate::object::{BusinessList, GraphNode};
use shared_types::FrameworkError;

/// Listener registration handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// Structural change of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange {
    ItemAdded { index: usize },
    ItemRemoved { index: usize },
    ItemChanged { index: usize, property: Option<String> },
    /// The list was rebuilt (undo, clear).
    Reset,
}

/// Notification bubbled from a child to its parent.
#[derive(Debug, Clone)]
pub enum ChildEvent {
    /// A property changed; `None` means all of them.
    PropertyChanged {
        source: GraphNode,
        property: Option<String>,
    },
    ListChanged {
        source: BusinessList,
        change: ListChange,
    },
    BusyChanged {
        source: GraphNode,
        property: Option<String>,
        busy: bool,
    },
    /// The source's broken rules changed.
    ErrorChanged { source: GraphNode },
    UnhandledException {
        source: GraphNode,
        property: Option<String>,
        error: FrameworkError,
    },
}

impl ChildEvent {
    /// Node that originally raised the event.
    #[must_use]
    pub fn source(&self) -> GraphNode {
        match self {
            Self::PropertyChanged { source, .. }
            | Self::BusyChanged { source, .. }
            | Self::ErrorChanged { source }
            | Self::UnhandledException { source, .. } => source.clone(),
            Self::ListChanged { source, .. } => GraphNode::List(source.clone()),
        }
    }
}

/// Events raised by a business object.
#[derive(Debug, Clone)]
pub enum ObjectEvent {
    PropertyChanging { property: String },
    PropertyChanged { property: String },
    /// State was replaced wholesale (undo, mark dirty).
    AllPropertiesChanged,
    /// Something below this object changed.
    ChildChanged(ChildEvent),
    BusyChanged { property: Option<String>, busy: bool },
    ErrorsChanged { property: Option<String> },
    /// Background work failed and nobody awaited it.
    UnhandledAsyncException {
        property: Option<String>,
        error: FrameworkError,
    },
    /// The last running async rule finished.
    ValidationComplete,
}

/// Events raised by a business list.
#[derive(Debug, Clone)]
pub enum ListEvent {
    ListChanged(ListChange),
    ChildChanged(ChildEvent),
    BusyChanged { busy: bool },
    UnhandledAsyncException {
        property: Option<String>,
        error: FrameworkError,
    },
}
