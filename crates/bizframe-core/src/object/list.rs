//! # Business List
//!
//! An owned collection of child business objects.
//!
//! ## Deleted Items
//!
//! Removing an item marks it deleted and moves it to the deleted list, where
//! it stays linked to the list until the graph is saved or an undo brings it
//! back. Items removed by cancel-to-origin skip the deleted list.
//!
//! ## Edit Levels
//!
//! The list keeps a level counter rather than snapshots. Undo rebuilds the
//! item vector from each item's `edit_level_added` and `is_deleted` after
//! cascading the undo to it.

use super::busy::{self, CancellationSignal};
use super::business_object::BusinessObject;
use super::graph::{GraphLink, GraphNode, ParentRef};
use super::listeners::Listeners;
use crate::context::ApplicationContext;
use crate::domain::events::{ChildEvent, ListChange, ListEvent, SubscriptionId};
use parking_lot::{Mutex, MutexGuard};
use shared_types::FrameworkError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::trace;

pub(crate) struct ListState {
    items: Vec<BusinessObject>,
    deleted: Vec<BusinessObject>,
    edit_level: usize,
    edit_level_added: usize,
    is_child: bool,
}

pub(crate) struct ListCell {
    context: Arc<ApplicationContext>,
    link: GraphLink,
    state: Mutex<ListState>,
    listeners: Listeners<ListEvent>,
    idle: Notify,
}

/// Handle to a collection of child business objects.
#[derive(Clone)]
pub struct BusinessList(Arc<ListCell>);

impl BusinessList {
    /// An empty root list.
    #[must_use]
    pub fn new(context: &Arc<ApplicationContext>) -> Self {
        let list = Self(Arc::new(ListCell {
            context: context.clone(),
            link: GraphLink::new(),
            state: Mutex::new(ListState {
                items: Vec::new(),
                deleted: Vec::new(),
                edit_level: 0,
                edit_level_added: 0,
                is_child: false,
            }),
            listeners: Listeners::new(),
            idle: Notify::new(),
        }));
        list.0.link.renew_identity();
        trace!(identity = list.identity(), "Business list created");
        list
    }

    pub(crate) fn from_cell(cell: Arc<ListCell>) -> Self {
        Self(cell)
    }

    fn state(&self) -> MutexGuard<'_, ListState> {
        self.0.state.lock()
    }

    pub(crate) fn link(&self) -> &GraphLink {
        &self.0.link
    }

    fn as_parent(&self) -> ParentRef {
        ParentRef::List(Arc::downgrade(&self.0))
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn context(&self) -> &Arc<ApplicationContext> {
        &self.0.context
    }

    // === Collection ===

    /// Append an item.
    pub fn add(&self, item: BusinessObject) -> Result<(), FrameworkError> {
        let index = self.len();
        self.insert(index, item)
    }

    /// Insert an item at `index`.
    ///
    /// The item becomes a child of this list and takes its edit level.
    pub fn insert(&self, index: usize, item: BusinessObject) -> Result<(), FrameworkError> {
        if item.parent().is_some() {
            return Err(FrameworkError::invalid_operation(format!(
                "{item:?} already belongs to an object graph"
            )));
        }
        let level = {
            let state = self.state();
            if index > state.items.len() {
                return Err(FrameworkError::invalid_operation(format!(
                    "index {index} out of range for list of {}",
                    state.items.len()
                )));
            }
            if state.items.iter().any(|existing| existing.ptr_eq(&item)) {
                return Err(FrameworkError::invalid_operation(format!(
                    "{item:?} is already in the list"
                )));
            }
            state.edit_level
        };

        let node = GraphNode::Object(item.clone());
        node.mark_as_child();
        node.set_parent(Some(self.as_parent()));
        node.reset_edit_level(level)?;
        node.set_edit_level_added(level);

        let index = {
            let mut state = self.state();
            let index = index.min(state.items.len());
            state.items.insert(index, item);
            index
        };
        self.emit(ListEvent::ListChanged(ListChange::ItemAdded { index }));
        Ok(())
    }

    /// Delete `item`, moving it to the deleted list. Returns whether it was present.
    pub fn remove(&self, item: &BusinessObject) -> bool {
        let index = self.state().items.iter().position(|i| i.ptr_eq(item));
        match index {
            Some(index) => self.remove_at(index).is_ok(),
            None => false,
        }
    }

    /// Delete the item at `index`, moving it to the deleted list.
    pub fn remove_at(&self, index: usize) -> Result<BusinessObject, FrameworkError> {
        let item = {
            let mut state = self.state();
            if index >= state.items.len() {
                return Err(FrameworkError::invalid_operation(format!(
                    "index {index} out of range for list of {}",
                    state.items.len()
                )));
            }
            state.items.remove(index)
        };
        item.mark_deleted();
        self.state().deleted.push(item.clone());
        self.emit(ListEvent::ListChanged(ListChange::ItemRemoved { index }));
        Ok(item)
    }

    /// Delete every item.
    pub fn clear(&self) {
        let items = std::mem::take(&mut self.state().items);
        if items.is_empty() {
            return;
        }
        for item in &items {
            item.mark_deleted();
        }
        self.state().deleted.extend(items);
        self.emit(ListEvent::ListChanged(ListChange::Reset));
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<BusinessObject> {
        self.state().items.get(index).cloned()
    }

    /// Current items in order.
    #[must_use]
    pub fn items(&self) -> Vec<BusinessObject> {
        self.state().items.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, item: &BusinessObject) -> bool {
        self.state().items.iter().any(|i| i.ptr_eq(item))
    }

    /// Items removed and awaiting deletion by the next save.
    #[must_use]
    pub fn deleted_items(&self) -> Vec<BusinessObject> {
        self.state().deleted.clone()
    }

    // === Status ===

    /// An item is dirty, or a persisted item is waiting to be deleted.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let (items, deleted) = {
            let state = self.state();
            (state.items.clone(), state.deleted.clone())
        };
        deleted.iter().any(|d| !d.is_new()) || items.iter().any(BusinessObject::is_dirty)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.items().iter().all(BusinessObject::is_valid)
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.items().iter().any(BusinessObject::is_busy)
    }

    #[must_use]
    pub fn identity(&self) -> i32 {
        self.0.link.identity()
    }

    #[must_use]
    pub fn edit_level(&self) -> usize {
        self.state().edit_level
    }

    #[must_use]
    pub fn is_child(&self) -> bool {
        self.state().is_child
    }

    #[must_use]
    pub fn parent(&self) -> Option<GraphNode> {
        self.0.link.parent()
    }

    // === Editing ===

    pub fn begin_edit(&self) -> Result<(), FrameworkError> {
        self.ensure_root("begin_edit")?;
        self.copy_state(self.edit_level() + 1)
    }

    pub fn cancel_edit(&self) -> Result<(), FrameworkError> {
        self.ensure_root("cancel_edit")?;
        let level = self.edit_level();
        if level > 0 {
            self.undo_to(level - 1);
        }
        Ok(())
    }

    pub fn apply_edit(&self) -> Result<(), FrameworkError> {
        self.ensure_root("apply_edit")?;
        let level = self.edit_level();
        if level > 0 {
            self.accept_to(level - 1);
        }
        Ok(())
    }

    fn ensure_root(&self, operation: &str) -> Result<(), FrameworkError> {
        if self.is_child() {
            return Err(FrameworkError::invalid_operation(format!(
                "{operation} is not allowed on a child list; edit its parent instead"
            )));
        }
        Ok(())
    }

    pub(crate) fn mark_as_child(&self) {
        self.state().is_child = true;
    }

    pub(crate) fn set_edit_level_added(&self, level: usize) {
        self.state().edit_level_added = level;
    }

    pub(crate) fn copy_state(&self, parent_level: usize) -> Result<(), FrameworkError> {
        self.check_copy_state(parent_level)?;
        self.push_state();
        Ok(())
    }

    pub(crate) fn check_copy_state(&self, parent_level: usize) -> Result<(), FrameworkError> {
        let (current, members) = {
            let state = self.state();
            let members: Vec<_> = state.items.iter().chain(&state.deleted).cloned().collect();
            (state.edit_level, members)
        };
        if current + 1 > parent_level {
            return Err(FrameworkError::invalid_operation(format!(
                "edit level mismatch: list at level {current} cannot copy state for level {parent_level}"
            )));
        }
        for item in members {
            item.check_copy_state(current + 1)?;
        }
        Ok(())
    }

    pub(crate) fn push_state(&self) {
        let members: Vec<_> = {
            let mut state = self.state();
            state.edit_level += 1;
            state.items.iter().chain(&state.deleted).cloned().collect()
        };
        for item in members {
            item.push_state();
        }
    }

    pub(crate) fn undo_to(&self, level: usize) {
        let (items, deleted) = {
            let mut state = self.state();
            if state.edit_level <= level {
                return;
            }
            state.edit_level = level;
            (
                std::mem::take(&mut state.items),
                std::mem::take(&mut state.deleted),
            )
        };

        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            item.undo_to(level);
            if item.edit_level_added() > level {
                GraphNode::Object(item.clone()).set_parent(None);
            } else {
                kept.push(item);
            }
        }
        let mut still_deleted = Vec::new();
        for item in deleted {
            item.undo_to(level);
            if item.edit_level_added() > level {
                GraphNode::Object(item.clone()).set_parent(None);
            } else if item.is_deleted() {
                still_deleted.push(item);
            } else {
                kept.push(item);
            }
        }

        {
            let mut state = self.state();
            kept.append(&mut state.items);
            state.items = kept;
            still_deleted.append(&mut state.deleted);
            state.deleted = still_deleted;
        }
        self.emit(ListEvent::ListChanged(ListChange::Reset));
    }

    pub(crate) fn accept_to(&self, level: usize) {
        let (items, deleted) = {
            let mut state = self.state();
            state.edit_level = state.edit_level.min(level);
            if state.edit_level_added > level {
                state.edit_level_added = level;
            }
            (state.items.clone(), std::mem::take(&mut state.deleted))
        };
        for item in items {
            item.accept_to(level);
        }
        let mut kept = Vec::with_capacity(deleted.len());
        for item in deleted {
            let added = item.edit_level_added();
            item.accept_to(level);
            if added > level {
                GraphNode::Object(item.clone()).set_parent(None);
            } else {
                kept.push(item);
            }
        }
        let mut state = self.state();
        kept.append(&mut state.deleted);
        state.deleted = kept;
    }

    /// Take `item` out of the list without deleting it.
    pub(crate) fn remove_child(&self, item: &BusinessObject) {
        let removed = {
            let mut state = self.state();
            if let Some(index) = state.items.iter().position(|i| i.ptr_eq(item)) {
                state.items.remove(index);
                Some(Some(index))
            } else if let Some(index) = state.deleted.iter().position(|i| i.ptr_eq(item)) {
                state.deleted.remove(index);
                Some(None)
            } else {
                None
            }
        };
        let Some(index) = removed else {
            return;
        };
        GraphNode::Object(item.clone()).set_parent(None);
        if let Some(index) = index {
            self.emit(ListEvent::ListChanged(ListChange::ItemRemoved { index }));
        }
    }

    /// Items persisted: mark them old and forget the deleted ones.
    pub(crate) fn mark_saved(&self) {
        let (items, deleted) = {
            let mut state = self.state();
            (state.items.clone(), std::mem::take(&mut state.deleted))
        };
        for item in deleted {
            GraphNode::Object(item).set_parent(None);
        }
        for item in items {
            item.mark_saved();
        }
    }

    // === Events ===

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ListEvent) + Send + Sync + 'static,
    {
        self.0.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.0.listeners.unsubscribe(id)
    }

    fn emit(&self, event: ListEvent) {
        self.0.listeners.notify(&event);
        if matches!(
            event,
            ListEvent::BusyChanged { .. }
                | ListEvent::ChildChanged(ChildEvent::BusyChanged { .. })
        ) {
            self.0.idle.notify_waiters();
        }
        if let Some(parent) = self.0.link.parent() {
            if let Some(bubbled) = self.bubbled(event) {
                parent.receive_child_event(bubbled);
            }
        }
    }

    /// Item-level notifications are derived from child events and stay local;
    /// the child event itself travels up.
    fn bubbled(&self, event: ListEvent) -> Option<ChildEvent> {
        match event {
            ListEvent::ListChanged(ListChange::ItemChanged { .. })
            | ListEvent::BusyChanged { .. }
            | ListEvent::UnhandledAsyncException { .. } => None,
            ListEvent::ListChanged(change) => Some(ChildEvent::ListChanged {
                source: self.clone(),
                change,
            }),
            ListEvent::ChildChanged(inner) => Some(inner),
        }
    }

    pub(crate) fn receive_child_event(&self, event: ChildEvent) {
        match &event {
            ChildEvent::PropertyChanged {
                source: GraphNode::Object(item),
                property,
            } => {
                let index = self.state().items.iter().position(|i| i.ptr_eq(item));
                if let Some(index) = index {
                    self.emit(ListEvent::ListChanged(ListChange::ItemChanged {
                        index,
                        property: property.clone(),
                    }));
                }
            }
            ChildEvent::BusyChanged { .. } => {
                self.emit(ListEvent::BusyChanged {
                    busy: self.is_busy(),
                });
            }
            ChildEvent::UnhandledException {
                property, error, ..
            } => {
                self.emit(ListEvent::UnhandledAsyncException {
                    property: property.clone(),
                    error: error.clone(),
                });
            }
            _ => {}
        }
        self.emit(ListEvent::ChildChanged(event));
    }

    // === Idle waits ===

    async fn idle(&self) {
        busy::until_idle(&self.0.idle, || self.is_busy()).await;
    }

    /// Wait until no item is busy, at most `timeout`.
    pub async fn wait_for_idle(&self, timeout: Duration) -> Result<(), FrameworkError> {
        busy::with_timeout(timeout, self.idle()).await
    }

    pub async fn wait_for_idle_until(
        &self,
        signal: &CancellationSignal,
    ) -> Result<(), FrameworkError> {
        busy::until_cancelled(signal, self.idle()).await
    }
}

impl fmt::Debug for BusinessList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BusinessList#{}", self.identity())
    }
}
