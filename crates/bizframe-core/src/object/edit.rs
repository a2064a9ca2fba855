//! # N-Level Undo
//!
//! `begin_edit` pushes a snapshot of fields, flags and broken rules and
//! cascades to every child so parent and children stay at the same edit
//! level. `cancel_edit` restores the snapshot of the current level,
//! `apply_edit` discards it. Both are no-ops at level 0.
//!
//! Restoring fields may bring back children that were replaced since the
//! snapshot; those are re-linked, and children absent from the restored state
//! are detached.

use super::business_object::BusinessObject;
use super::graph::GraphNode;
use crate::domain::events::ObjectEvent;
use crate::domain::undo::EditSnapshot;
use crate::domain::value::FieldValue;
use shared_types::FrameworkError;

impl BusinessObject {
    /// Snapshot the current state and raise the edit level.
    pub fn begin_edit(&self) -> Result<(), FrameworkError> {
        self.copy_state(self.edit_level() + 1)
    }

    /// Restore the state of the previous level.
    ///
    /// A child that is new, never committed and back at the level it was
    /// added at is removed from its parent.
    pub fn cancel_edit(&self) {
        let level = self.edit_level();
        if level == 0 {
            return;
        }
        self.undo_to(level - 1);

        let back_to_origin = {
            let state = self.state();
            state.is_child
                && state.flags.is_new
                && state.never_committed
                && state.undo.level() <= state.edit_level_added
        };
        if back_to_origin {
            if let Some(parent) = self.parent() {
                parent.remove_child(&GraphNode::Object(self.clone()));
            }
        }
    }

    /// Keep the changes made since the matching `begin_edit`.
    pub fn apply_edit(&self) {
        let level = self.edit_level();
        if level == 0 {
            return;
        }
        self.accept_to(level - 1);

        if self.is_child() {
            let owner = match self.parent() {
                Some(GraphNode::Object(parent)) => Some(parent),
                Some(GraphNode::List(list)) => match list.parent() {
                    Some(GraphNode::Object(parent)) => Some(parent),
                    _ => None,
                },
                None => None,
            };
            if let Some(owner) = owner {
                owner.hooks().on_child_edit_applied(&owner, self);
            }
        }
    }

    /// Push one snapshot here and below, once the whole subtree can take it.
    pub(crate) fn copy_state(&self, parent_level: usize) -> Result<(), FrameworkError> {
        self.check_copy_state(parent_level)?;
        self.push_state();
        Ok(())
    }

    pub(crate) fn check_copy_state(&self, parent_level: usize) -> Result<(), FrameworkError> {
        let (current, children) = {
            let state = self.state();
            (state.undo.level(), state.fields.children())
        };
        if current + 1 > parent_level {
            return Err(FrameworkError::invalid_operation(format!(
                "edit level mismatch: {} at level {current} cannot copy state for level {parent_level}",
                self.type_name()
            )));
        }
        for child in children {
            child.check_copy_state(current + 1)?;
        }
        Ok(())
    }

    pub(crate) fn push_state(&self) {
        let children = {
            let mut state = self.state();
            let snapshot = EditSnapshot {
                fields: state.fields.snapshot(),
                flags: state.flags,
                broken_rules: state.broken_rules.clone(),
            };
            state.undo.push(snapshot);
            state.fields.children()
        };
        for child in children {
            child.push_state();
        }
    }

    pub(crate) fn undo_to(&self, level: usize) {
        let (previous, restored) = {
            let mut state = self.state();
            let mut snapshot = None;
            while state.undo.level() > level {
                snapshot = state.undo.pop();
            }
            let Some(snapshot) = snapshot else {
                return;
            };
            let previous = state.fields.children();
            state.fields.restore(snapshot.fields);
            state.flags = snapshot.flags;
            state.broken_rules = snapshot.broken_rules;
            (previous, state.fields.children())
        };

        for node in &previous {
            if !restored.iter().any(|r| r.ptr_eq(node)) {
                self.detach_child(node);
            }
        }
        let link = self.as_parent();
        for node in &restored {
            if !node.is_linked_to(&link) {
                node.mark_as_child();
                node.set_parent(Some(link.clone()));
            }
            node.undo_to(level);
        }
        self.emit(ObjectEvent::AllPropertiesChanged);
    }

    pub(crate) fn accept_to(&self, level: usize) {
        let children = {
            let mut state = self.state();
            while state.undo.level() > level {
                state.undo.pop();
            }
            state.never_committed = false;
            if state.edit_level_added > level {
                state.edit_level_added = level;
            }
            state.fields.children()
        };
        for child in children {
            child.accept_to(level);
        }
    }

    pub(crate) fn edit_level_added(&self) -> usize {
        self.state().edit_level_added
    }

    pub(crate) fn set_edit_level_added(&self, level: usize) {
        self.state().edit_level_added = level;
    }

    /// Link a child stored in one of this object's fields.
    pub(super) fn attach_child(&self, node: &GraphNode) -> Result<(), FrameworkError> {
        let level = self.edit_level();
        node.mark_as_child();
        node.set_parent(Some(self.as_parent()));
        node.reset_edit_level(level)?;
        node.set_edit_level_added(level);
        self.hooks().on_child_attached(self, node);
        Ok(())
    }

    pub(super) fn detach_child(&self, node: &GraphNode) {
        if node.is_linked_to(&self.as_parent()) {
            node.set_parent(None);
            self.hooks().on_child_detached(self, node);
        }
    }

    /// Clear the field holding `child`.
    pub(crate) fn remove_child(&self, child: &GraphNode) {
        let Some(descriptor) = self.state().fields.find_child(child) else {
            return;
        };
        if self.store(&descriptor, FieldValue::Null, false).is_ok() {
            self.emit(ObjectEvent::PropertyChanged {
                property: descriptor.name.clone(),
            });
        }
    }
}
