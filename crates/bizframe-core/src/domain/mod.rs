//! Domain layer: values, metadata and per-instance state containers.

pub mod broken_rules;
pub mod events;
pub mod field_store;
pub mod identity;
pub mod metadata;
pub mod undo;
pub mod value;

pub use broken_rules::{BrokenRule, BrokenRulesCollection, RuleOrigin};
pub use events::{ChildEvent, ListChange, ListEvent, ObjectEvent, SubscriptionId};
pub use field_store::{FieldChange, FieldSlot, FieldSnapshot, FieldStore};
pub use identity::IdentityManager;
pub use metadata::{
    PropertyDefinition, PropertyDescriptor, PropertyInfo, PropertyKey, PropertyRegistry,
    RelationshipTypes, TypeProperties,
};
pub use undo::{EditSnapshot, ObjectFlags, UndoStack};
pub use value::{FieldValue, ValueKind};
