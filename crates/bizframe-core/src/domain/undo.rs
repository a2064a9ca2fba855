//! # Undo Stack
//!
//! N-level undo as a stack of state snapshots. The edit level of an object is
//! the number of snapshots outstanding; it can never go negative because an
//! empty stack simply has nothing to pop.

use super::broken_rules::BrokenRulesCollection;
use super::field_store::FieldSnapshot;

/// Lifecycle flags captured with every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectFlags {
    pub is_new: bool,
    pub is_deleted: bool,
    pub is_dirty: bool,
}

impl Default for ObjectFlags {
    fn default() -> Self {
        Self {
            is_new: true,
            is_deleted: false,
            is_dirty: true,
        }
    }
}

/// State of one object at one edit level.
#[derive(Debug, Clone)]
pub struct EditSnapshot {
    pub fields: FieldSnapshot,
    pub flags: ObjectFlags,
    pub broken_rules: BrokenRulesCollection,
}

/// Snapshot stack; `level()` is the edit level.
#[derive(Debug, Clone)]
pub struct UndoStack<S> {
    snapshots: Vec<S>,
}

impl<S> Default for UndoStack<S> {
    fn default() -> Self {
        Self {
            snapshots: Vec::new(),
        }
    }
}

impl<S> UndoStack<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current edit level.
    #[must_use]
    pub fn level(&self) -> usize {
        self.snapshots.len()
    }

    /// Push the state for the next level; returns the new level.
    pub fn push(&mut self, snapshot: S) -> usize {
        self.snapshots.push(snapshot);
        self.snapshots.len()
    }

    /// Take the snapshot of the current level (for restore or discard).
    pub fn pop(&mut self) -> Option<S> {
        self.snapshots.pop()
    }

    /// Snapshot of the current level without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&S> {
        self.snapshots.last()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
