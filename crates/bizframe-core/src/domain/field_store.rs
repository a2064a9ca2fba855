//! # Field Store
//!
//! Per-instance storage for managed property values.
//!
//! A slot exists once a property has been read or written. Writes compare the
//! old and new value and do nothing when they are equal; the returned
//! [`FieldChange`] tells the graph layer which child, if any, was replaced.

use super::metadata::PropertyDescriptor;
use super::value::FieldValue;
use crate::object::GraphNode;
use std::collections::BTreeMap;

/// Current value of one property on one instance.
#[derive(Debug, Clone)]
pub struct FieldSlot {
    pub value: FieldValue,
    pub dirty: bool,
}

/// Outcome of a write or load.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    /// The new value equals the old one; nothing happened.
    Unchanged,
    /// The value was replaced.
    Changed { old: FieldValue },
}

impl FieldChange {
    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Captured slots, restorable with [`FieldStore::restore`].
#[derive(Debug, Clone, Default)]
pub struct FieldSnapshot(BTreeMap<usize, (PropertyDescriptor, FieldSlot)>);

/// Ordered map from descriptor to slot, keyed by registration index.
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    slots: BTreeMap<usize, (PropertyDescriptor, FieldSlot)>,
}

impl FieldStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a property, creating a clean default slot if missing.
    pub fn read(&mut self, descriptor: &PropertyDescriptor) -> FieldValue {
        self.slots
            .entry(descriptor.index)
            .or_insert_with(|| {
                (
                    descriptor.clone(),
                    FieldSlot {
                        value: descriptor.default.clone(),
                        dirty: false,
                    },
                )
            })
            .1
            .value
            .clone()
    }

    /// Value of a property without creating a slot.
    #[must_use]
    pub fn peek(&self, descriptor: &PropertyDescriptor) -> Option<&FieldValue> {
        self.slots
            .get(&descriptor.index)
            .map(|(_, slot)| &slot.value)
    }

    /// Current value, or the default when no slot exists.
    #[must_use]
    pub fn value_or_default(&self, descriptor: &PropertyDescriptor) -> FieldValue {
        self.peek(descriptor)
            .cloned()
            .unwrap_or_else(|| descriptor.default.clone())
    }

    /// Store a value and mark the slot dirty.
    pub fn write(&mut self, descriptor: &PropertyDescriptor, value: FieldValue) -> FieldChange {
        self.store(descriptor, value, true)
    }

    /// Store a value without touching the dirty flag.
    pub fn load(&mut self, descriptor: &PropertyDescriptor, value: FieldValue) -> FieldChange {
        self.store(descriptor, value, false)
    }

    fn store(
        &mut self,
        descriptor: &PropertyDescriptor,
        value: FieldValue,
        mark_dirty: bool,
    ) -> FieldChange {
        match self.slots.get_mut(&descriptor.index) {
            Some((_, slot)) => {
                if slot.value == value {
                    return FieldChange::Unchanged;
                }
                let old = std::mem::replace(&mut slot.value, value);
                slot.dirty |= mark_dirty;
                FieldChange::Changed { old }
            }
            None => {
                let old = descriptor.default.clone();
                let changed = old != value;
                self.slots.insert(
                    descriptor.index,
                    (
                        descriptor.clone(),
                        FieldSlot {
                            value,
                            dirty: changed && mark_dirty,
                        },
                    ),
                );
                if changed {
                    FieldChange::Changed { old }
                } else {
                    FieldChange::Unchanged
                }
            }
        }
    }

    #[must_use]
    pub fn exists(&self, descriptor: &PropertyDescriptor) -> bool {
        self.slots.contains_key(&descriptor.index)
    }

    /// Drop a slot, returning its value.
    pub fn remove(&mut self, descriptor: &PropertyDescriptor) -> Option<FieldValue> {
        self.slots
            .remove(&descriptor.index)
            .map(|(_, slot)| slot.value)
    }

    /// Whether one property's slot is dirty.
    #[must_use]
    pub fn is_field_dirty(&self, descriptor: &PropertyDescriptor) -> bool {
        self.slots
            .get(&descriptor.index)
            .is_some_and(|(_, slot)| slot.dirty)
    }

    /// Any slot dirty, children not considered.
    #[must_use]
    pub fn is_self_dirty(&self) -> bool {
        self.slots.values().any(|(_, slot)| slot.dirty)
    }

    /// Any slot dirty or any child dirty.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.is_self_dirty() || self.children().iter().any(GraphNode::is_dirty)
    }

    /// Every child is valid.
    #[must_use]
    pub fn is_valid_aggregate(&self) -> bool {
        self.children().iter().all(GraphNode::is_valid)
    }

    /// Any child is busy.
    #[must_use]
    pub fn is_busy_aggregate(&self) -> bool {
        self.children().iter().any(GraphNode::is_busy)
    }

    /// Child objects and collections currently held, in property order.
    #[must_use]
    pub fn children(&self) -> Vec<GraphNode> {
        self.slots
            .values()
            .filter_map(|(_, slot)| GraphNode::from_value(&slot.value))
            .collect()
    }

    /// Descriptor of the slot holding `child`, if any.
    #[must_use]
    pub fn find_child(&self, child: &GraphNode) -> Option<PropertyDescriptor> {
        self.slots.values().find_map(|(descriptor, slot)| {
            GraphNode::from_value(&slot.value)
                .filter(|node| node.ptr_eq(child))
                .map(|_| descriptor.clone())
        })
    }

    /// Clear every slot's dirty flag.
    pub fn mark_clean(&mut self) {
        for (_, slot) in self.slots.values_mut() {
            slot.dirty = false;
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> FieldSnapshot {
        FieldSnapshot(self.slots.clone())
    }

    pub fn restore(&mut self, snapshot: FieldSnapshot) {
        self.slots = snapshot.0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
