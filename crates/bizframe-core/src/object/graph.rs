//! # Object Graph
//!
//! Parent links, identity allocation and dispatch over the two kinds of graph
//! member (objects and lists).
//!
//! ## Ownership
//!
//! A parent owns its children through its field slots (or item vector). The
//! link back up is a `Weak`, so dropping a root frees the whole graph.
//!
//! ## Identity
//!
//! Identities are issued by the root only. Every other node forwards the
//! request through its parent link until it reaches a node without a parent.
//! Attaching a subtree re-issues identities for the whole subtree from the new
//! root.

use super::business_object::{BusinessObject, ObjectCell};
use super::list::{BusinessList, ListCell};
use crate::domain::events::ChildEvent;
use crate::domain::identity::{IdentityManager, IdentityState};
use crate::domain::value::FieldValue;
use parking_lot::{Mutex, RwLock};
use shared_types::FrameworkError;
use std::fmt;
use std::sync::Weak;

/// Weak back-reference from a child to its parent.
#[derive(Clone)]
pub(crate) enum ParentRef {
    Object(Weak<ObjectCell>),
    List(Weak<ListCell>),
}

impl ParentRef {
    pub(crate) fn upgrade(&self) -> Option<GraphNode> {
        match self {
            Self::Object(weak) => weak
                .upgrade()
                .map(|cell| GraphNode::Object(BusinessObject::from_cell(cell))),
            Self::List(weak) => weak
                .upgrade()
                .map(|cell| GraphNode::List(BusinessList::from_cell(cell))),
        }
    }

    pub(crate) fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => Weak::ptr_eq(a, b),
            (Self::List(a), Self::List(b)) => Weak::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Parent link and identity of one graph member.
pub(crate) struct GraphLink {
    parent: RwLock<Option<ParentRef>>,
    identity: Mutex<IdentityState>,
}

impl GraphLink {
    pub(crate) fn new() -> Self {
        Self {
            parent: RwLock::new(None),
            identity: Mutex::new(IdentityState::default()),
        }
    }

    pub(crate) fn parent(&self) -> Option<GraphNode> {
        let link = self.parent.read().clone();
        link.and_then(|p| p.upgrade())
    }

    pub(crate) fn is_linked_to(&self, parent: &ParentRef) -> bool {
        self.parent
            .read()
            .as_ref()
            .is_some_and(|current| current.same(parent))
    }

    pub(crate) fn identity(&self) -> i32 {
        self.identity.lock().identity
    }

    /// Next identity for a node holding `current`, from the root of this graph.
    pub(crate) fn issue_identity(&self, current: i32) -> i32 {
        if let Some(parent) = self.parent() {
            return parent.issue_identity(current);
        }
        let mut state = self.identity.lock();
        let own = state.identity;
        let manager = state.manager.get_or_insert_with(|| {
            let mut manager = IdentityManager::new();
            if own > 0 {
                manager.next_identity(own);
            }
            manager
        });
        manager.next_identity(current)
    }

    /// Replace the parent link. The local identity source is discarded either way.
    pub(crate) fn set_parent(&self, parent: Option<ParentRef>) {
        *self.parent.write() = parent;
        self.identity.lock().manager = None;
    }

    /// Start a root identity source that never issues `highest` or below.
    pub(crate) fn seed_identity(&self, highest: i32) {
        let mut manager = IdentityManager::new();
        if highest > 0 {
            manager.next_identity(highest);
        }
        self.identity.lock().manager = Some(manager);
    }

    /// Take a fresh identity from the root.
    pub(crate) fn renew_identity(&self) -> i32 {
        let current = self.identity();
        let next = self.issue_identity(current);
        self.identity.lock().identity = next;
        next
    }
}

/// A member of an object graph: a business object or a business list.
#[derive(Clone)]
pub enum GraphNode {
    Object(BusinessObject),
    List(BusinessList),
}

impl GraphNode {
    /// Graph member held by a field value.
    #[must_use]
    pub fn from_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Child(child) => Some(Self::Object(child.clone())),
            FieldValue::ChildList(list) => Some(Self::List(list.clone())),
            _ => None,
        }
    }

    /// Same underlying node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::List(a), Self::List(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&BusinessObject> {
        match self {
            Self::Object(object) => Some(object),
            Self::List(_) => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&BusinessList> {
        match self {
            Self::List(list) => Some(list),
            Self::Object(_) => None,
        }
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        match self {
            Self::Object(object) => object.is_dirty(),
            Self::List(list) => list.is_dirty(),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Object(object) => object.is_valid(),
            Self::List(list) => list.is_valid(),
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Object(object) => object.is_busy(),
            Self::List(list) => list.is_busy(),
        }
    }

    #[must_use]
    pub fn identity(&self) -> i32 {
        match self {
            Self::Object(object) => object.identity(),
            Self::List(list) => list.identity(),
        }
    }

    #[must_use]
    pub fn edit_level(&self) -> usize {
        match self {
            Self::Object(object) => object.edit_level(),
            Self::List(list) => list.edit_level(),
        }
    }

    fn link(&self) -> &GraphLink {
        match self {
            Self::Object(object) => object.link(),
            Self::List(list) => list.link(),
        }
    }

    pub(crate) fn issue_identity(&self, current: i32) -> i32 {
        self.link().issue_identity(current)
    }

    pub(crate) fn is_linked_to(&self, parent: &ParentRef) -> bool {
        self.link().is_linked_to(parent)
    }

    /// Link to a new parent (re-identifying the subtree) or unlink.
    ///
    /// An unlinked node keeps its identities and becomes a root seeded past
    /// the highest one in its subtree.
    pub(crate) fn set_parent(&self, parent: Option<ParentRef>) {
        let attached = parent.is_some();
        self.link().set_parent(parent);
        if attached {
            self.reidentify();
        } else {
            self.link().seed_identity(self.max_identity());
        }
    }

    /// Highest identity held by this node or any node below it.
    pub(crate) fn max_identity(&self) -> i32 {
        self.members()
            .iter()
            .map(GraphNode::max_identity)
            .fold(self.identity(), i32::max)
    }

    /// Take new identities for this node and everything below it.
    pub(crate) fn reidentify(&self) {
        self.link().renew_identity();
        for child in self.members() {
            child.reidentify();
        }
    }

    pub(crate) fn children(&self) -> Vec<GraphNode> {
        match self {
            Self::Object(object) => object.child_nodes(),
            Self::List(list) => list.items().into_iter().map(GraphNode::Object).collect(),
        }
    }

    /// Children plus the deleted items a list still holds.
    fn members(&self) -> Vec<GraphNode> {
        match self {
            Self::Object(object) => object.child_nodes(),
            Self::List(list) => list
                .items()
                .into_iter()
                .chain(list.deleted_items())
                .map(GraphNode::Object)
                .collect(),
        }
    }

    pub(crate) fn mark_as_child(&self) {
        match self {
            Self::Object(object) => object.mark_as_child(),
            Self::List(list) => list.mark_as_child(),
        }
    }

    pub(crate) fn set_edit_level_added(&self, level: usize) {
        match self {
            Self::Object(object) => object.set_edit_level_added(level),
            Self::List(list) => list.set_edit_level_added(level),
        }
    }

    pub(crate) fn copy_state(&self, parent_level: usize) -> Result<(), FrameworkError> {
        match self {
            Self::Object(object) => object.copy_state(parent_level),
            Self::List(list) => list.copy_state(parent_level),
        }
    }

    pub(crate) fn check_copy_state(&self, parent_level: usize) -> Result<(), FrameworkError> {
        match self {
            Self::Object(object) => object.check_copy_state(parent_level),
            Self::List(list) => list.check_copy_state(parent_level),
        }
    }

    pub(crate) fn push_state(&self) {
        match self {
            Self::Object(object) => object.push_state(),
            Self::List(list) => list.push_state(),
        }
    }

    pub(crate) fn undo_to(&self, level: usize) {
        match self {
            Self::Object(object) => object.undo_to(level),
            Self::List(list) => list.undo_to(level),
        }
    }

    pub(crate) fn accept_to(&self, level: usize) {
        match self {
            Self::Object(object) => object.accept_to(level),
            Self::List(list) => list.accept_to(level),
        }
    }

    /// Push or accept snapshots until the node sits at `level`.
    pub(crate) fn reset_edit_level(&self, level: usize) -> Result<(), FrameworkError> {
        while self.edit_level() < level {
            self.copy_state(self.edit_level() + 1)?;
        }
        while self.edit_level() > level {
            self.accept_to(self.edit_level() - 1);
        }
        Ok(())
    }

    /// Take `child` out of this node without deleting it.
    pub(crate) fn remove_child(&self, child: &GraphNode) {
        match (self, child) {
            (Self::Object(object), _) => object.remove_child(child),
            (Self::List(list), Self::Object(item)) => list.remove_child(item),
            (Self::List(_), Self::List(_)) => {}
        }
    }

    pub(crate) fn receive_child_event(&self, event: ChildEvent) {
        match self {
            Self::Object(object) => object.receive_child_event(event),
            Self::List(list) => list.receive_child_event(event),
        }
    }

    /// Mark the subtree as persisted: objects old and clean, deleted lists empty.
    pub(crate) fn mark_saved(&self) {
        match self {
            Self::Object(object) => object.mark_saved(),
            Self::List(list) => list.mark_saved(),
        }
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(object) => fmt::Debug::fmt(object, f),
            Self::List(list) => fmt::Debug::fmt(list, f),
        }
    }
}
