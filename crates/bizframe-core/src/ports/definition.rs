//! Business type definitions and their lifecycle hooks.

use crate::domain::metadata::PropertyDefinition;
use crate::object::{BusinessObject, GraphNode};
use crate::rules::RuleSetBuilder;
use shared_types::{FrameworkError, TypeName};

/// Callbacks an object raises at notable points of its lifecycle.
///
/// Every method defaults to a no-op.
pub trait ObjectHooks: Send + Sync {
    /// A child finished `apply_edit`.
    fn on_child_edit_applied(&self, _parent: &BusinessObject, _child: &BusinessObject) {}

    fn on_child_attached(&self, _parent: &BusinessObject, _child: &GraphNode) {}

    fn on_child_detached(&self, _parent: &BusinessObject, _child: &GraphNode) {}

    /// A property changed through `set_property`.
    fn on_property_changed(&self, _object: &BusinessObject, _property: &str) {}

    /// `delete` marked the object for deletion.
    fn on_deleted(&self, _object: &BusinessObject) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ObjectHooks for NoHooks {}

/// Declares a business type: its name, properties, rules and hooks.
pub trait BusinessType: Send + Sync {
    fn type_name(&self) -> TypeName;

    /// Managed properties, registered once per type.
    fn properties(&self) -> Vec<PropertyDefinition>;

    /// Register business and authorization rules. Runs once per type.
    fn add_business_rules(&self, _rules: &mut RuleSetBuilder<'_>) -> Result<(), FrameworkError> {
        Ok(())
    }

    fn hooks(&self) -> &dyn ObjectHooks {
        &NoHooks
    }
}
