//! Managed property access.
//!
//! | Operation | Authorization | Dirty | Notifies | Rules |
//! |-----------|---------------|-------|----------|-------|
//! | `get_property` | read | - | - | - |
//! | `read_property` | - | - | - | - |
//! | `set_property` | write | yes | yes | yes |
//! | `load_property` | - | - | - | - |
//! | `FieldAccessor::set` | - | yes | - | - |

use super::business_object::BusinessObject;
use super::graph::GraphNode;
use crate::domain::events::ObjectEvent;
use crate::domain::field_store::FieldChange;
use crate::domain::metadata::{PropertyDescriptor, PropertyKey};
use crate::domain::value::FieldValue;
use futures::FutureExt;
use shared_types::{AuthorizationAction, FrameworkError};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::debug;

impl BusinessObject {
    /// Read a property. Denied reads return the property's default.
    pub fn get_property(&self, key: impl PropertyKey) -> Result<FieldValue, FrameworkError> {
        let descriptor = self.property(key)?;
        if !self.can_read_property(&descriptor.name) {
            return Ok(descriptor.default.clone());
        }
        self.read_value(&descriptor)
    }

    /// Read a property, failing with `Authorization` when denied.
    pub fn try_get_property(&self, key: impl PropertyKey) -> Result<FieldValue, FrameworkError> {
        let descriptor = self.property(key)?;
        if !self.can_read_property(&descriptor.name) {
            return Err(self.denied(AuthorizationAction::ReadProperty, &descriptor));
        }
        self.read_value(&descriptor)
    }

    /// Read a property without authorization.
    pub fn read_property(&self, key: impl PropertyKey) -> Result<FieldValue, FrameworkError> {
        let descriptor = self.property(key)?;
        self.read_value(&descriptor)
    }

    /// Child object held by a property, if any.
    pub fn child(&self, key: impl PropertyKey) -> Result<Option<BusinessObject>, FrameworkError> {
        Ok(self.read_property(key)?.as_child().cloned())
    }

    /// Child list held by a property, if any.
    pub fn child_list(
        &self,
        key: impl PropertyKey,
    ) -> Result<Option<super::BusinessList>, FrameworkError> {
        Ok(self.read_property(key)?.as_list().cloned())
    }

    fn read_value(&self, descriptor: &PropertyDescriptor) -> Result<FieldValue, FrameworkError> {
        let mut state = self.state();
        if descriptor.is_lazy() && !state.fields.exists(descriptor) {
            if self.cell().busy.is_property_busy(&descriptor.name) {
                return Ok(descriptor.default.clone());
            }
            return Err(FrameworkError::invalid_operation(format!(
                "lazy property {} has not been loaded",
                descriptor.name
            )));
        }
        Ok(state.fields.read(descriptor))
    }

    /// Write a property. Denied writes are silently ignored.
    pub fn set_property(
        &self,
        key: impl PropertyKey,
        value: impl Into<FieldValue>,
    ) -> Result<(), FrameworkError> {
        let descriptor = self.property(key)?;
        self.set_value(&descriptor, value.into(), false)
    }

    /// Write a property, failing with `Authorization` when denied.
    pub fn try_set_property(
        &self,
        key: impl PropertyKey,
        value: impl Into<FieldValue>,
    ) -> Result<(), FrameworkError> {
        let descriptor = self.property(key)?;
        self.set_value(&descriptor, value.into(), true)
    }

    fn set_value(
        &self,
        descriptor: &PropertyDescriptor,
        value: FieldValue,
        throw_on_denied: bool,
    ) -> Result<(), FrameworkError> {
        let value = value.coerce(descriptor.kind, &descriptor.name)?;

        if self.is_bypassing() {
            self.store(descriptor, value, true)?;
            return Ok(());
        }

        if !self.can_write_property(&descriptor.name) {
            if throw_on_denied {
                return Err(self.denied(AuthorizationAction::WriteProperty, descriptor));
            }
            debug!(type_name = %self.type_name(), property = %descriptor.name, "Write denied");
            return Ok(());
        }

        {
            let mut state = self.state();
            if state.fields.value_or_default(descriptor) == value {
                state.fields.read(descriptor);
                return Ok(());
            }
        }

        self.emit(ObjectEvent::PropertyChanging {
            property: descriptor.name.clone(),
        });
        self.store(descriptor, value, true)?;

        let changed = self.run_property_rules(descriptor)?;
        for property in changed {
            self.emit(ObjectEvent::PropertyChanged { property });
        }
        self.hooks().on_property_changed(self, &descriptor.name);
        Ok(())
    }

    /// Store without authorization, notification or rules.
    pub fn load_property(
        &self,
        key: impl PropertyKey,
        value: impl Into<FieldValue>,
    ) -> Result<(), FrameworkError> {
        let descriptor = self.property(key)?;
        let value = value.into().coerce(descriptor.kind, &descriptor.name)?;
        self.store(&descriptor, value, false)?;
        Ok(())
    }

    /// Put a value in the field store, rewiring children it replaces.
    ///
    /// `mark_dirty` makes it a write (slot and object dirty) instead of a load.
    pub(super) fn store(
        &self,
        descriptor: &PropertyDescriptor,
        value: FieldValue,
        mark_dirty: bool,
    ) -> Result<FieldChange, FrameworkError> {
        let change = {
            let mut state = self.state();
            let change = if mark_dirty {
                state.fields.write(descriptor, value.clone())
            } else {
                state.fields.load(descriptor, value.clone())
            };
            if mark_dirty && change.is_changed() {
                state.flags.is_dirty = true;
            }
            change
        };
        if let FieldChange::Changed { old } = &change {
            if let Some(previous) = GraphNode::from_value(old) {
                self.detach_child(&previous);
            }
            if let Some(next) = GraphNode::from_value(&value) {
                self.attach_child(&next)?;
            }
        }
        Ok(change)
    }

    /// Load a property from a future on the runtime.
    ///
    /// The property is busy until the future settles. On success the value is
    /// loaded and `PropertyChanged` raised; a failure (or panic) is reported
    /// as an unhandled async exception.
    pub fn load_property_async<F>(&self, key: impl PropertyKey, load: F) -> Result<(), FrameworkError>
    where
        F: Future<Output = Result<FieldValue, FrameworkError>> + Send + 'static,
    {
        let descriptor = self.property(key)?;
        let runtime = self.context().runtime()?;
        let name = descriptor.name.clone();

        self.cell().busy.load_started(&name);
        self.emit(ObjectEvent::BusyChanged {
            property: Some(name.clone()),
            busy: true,
        });

        let object = self.clone();
        runtime.spawn(async move {
            let outcome = AssertUnwindSafe(load).catch_unwind().await;
            let loaded = match outcome {
                Ok(Ok(value)) => value
                    .coerce(descriptor.kind, &descriptor.name)
                    .and_then(|value| object.store(&descriptor, value, false)),
                Ok(Err(error)) => Err(error),
                Err(_) => Err(FrameworkError::property_load(
                    &descriptor.name,
                    "async load panicked",
                )),
            };
            object.cell().busy.load_finished(&name);
            match loaded {
                Ok(_) => object.emit(ObjectEvent::PropertyChanged {
                    property: name.clone(),
                }),
                Err(error) => object.report_unhandled(Some(name.clone()), error),
            }
            object.emit(ObjectEvent::BusyChanged {
                property: Some(name),
                busy: false,
            });
        });
        Ok(())
    }

    /// Accessor for a property kept in a private backing field.
    pub fn field_accessor(&self, key: impl PropertyKey) -> Result<FieldAccessor, FrameworkError> {
        let descriptor = self.property(key)?;
        if !descriptor.is_private_field() {
            return Err(FrameworkError::invalid_operation(format!(
                "{} is not a private-field property",
                descriptor.name
            )));
        }
        Ok(FieldAccessor {
            object: self.clone(),
            descriptor,
        })
    }

    fn denied(&self, action: AuthorizationAction, descriptor: &PropertyDescriptor) -> FrameworkError {
        FrameworkError::Authorization {
            action,
            target: format!("{}.{}", self.type_name(), descriptor.name),
        }
    }
}

/// Direct access to a private backing field.
#[derive(Clone)]
pub struct FieldAccessor {
    object: BusinessObject,
    descriptor: PropertyDescriptor,
}

impl FieldAccessor {
    #[must_use]
    pub fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn get(&self) -> FieldValue {
        self.object.state().fields.value_or_default(&self.descriptor)
    }

    /// Store a value and mark the object dirty, without notification.
    pub fn set(&self, value: impl Into<FieldValue>) -> Result<(), FrameworkError> {
        let value = value
            .into()
            .coerce(self.descriptor.kind, &self.descriptor.name)?;
        self.object.store(&self.descriptor, value, true)?;
        Ok(())
    }
}

impl std::fmt::Debug for FieldAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("object", &self.object)
            .field("property", &self.descriptor.name)
            .finish()
    }
}
