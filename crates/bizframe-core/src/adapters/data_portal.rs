//! # Local Data Portal
//!
//! Runs create, fetch and save against an [`ObjectPersistence`] in-process,
//! enforcing the lifecycle rules around the persistence call.
//!
//! ## Save
//!
//! | State | Persistence call | Afterwards |
//! |-------|------------------|------------|
//! | deleted | `delete` (skipped when new) | `mark_new` |
//! | new | `insert` | graph marked old, deleted lists cleared |
//! | otherwise | `update` | graph marked old, deleted lists cleared |

use super::bus;
use crate::context::ApplicationContext;
use crate::object::BusinessObject;
use crate::ports::{BusinessType, ObjectPersistence};
use shared_bus::SaveOperation;
use shared_types::{AuthorizationAction, FrameworkError};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct LocalDataPortal<P: ObjectPersistence> {
    persistence: Arc<P>,
}

impl<P: ObjectPersistence> LocalDataPortal<P> {
    pub fn new(persistence: P) -> Self {
        Self {
            persistence: Arc::new(persistence),
        }
    }

    pub fn from_shared(persistence: Arc<P>) -> Self {
        Self { persistence }
    }

    #[must_use]
    pub fn persistence(&self) -> &Arc<P> {
        &self.persistence
    }

    /// A new root with its rules checked.
    pub async fn create(
        &self,
        definition: Arc<dyn BusinessType>,
        context: &Arc<ApplicationContext>,
    ) -> Result<BusinessObject, FrameworkError> {
        let object = BusinessObject::new(definition, context)?;
        Self::authorize(&object, AuthorizationAction::CreateObject)?;
        object.check_rules()?;
        Ok(object)
    }

    /// A root loaded from storage: old, clean and with its rules checked.
    pub async fn fetch(
        &self,
        definition: Arc<dyn BusinessType>,
        context: &Arc<ApplicationContext>,
        criteria: &str,
    ) -> Result<BusinessObject, FrameworkError> {
        let object = BusinessObject::new(definition, context)?;
        Self::authorize(&object, AuthorizationAction::GetObject)?;
        {
            let _bypass = object.bypass_property_checks();
            self.persistence.fetch(&object, criteria).await?;
        }
        object.mark_saved();
        object.mark_old();
        object.check_rules()?;
        debug!(type_name = %object.type_name(), criteria, "Object fetched");
        Ok(object)
    }

    /// Persist a root object graph.
    ///
    /// Returns the operation performed, or `None` when there was nothing to save.
    pub async fn save(
        &self,
        root: &BusinessObject,
    ) -> Result<Option<SaveOperation>, FrameworkError> {
        if root.is_child() {
            return Err(FrameworkError::invalid_operation(
                "a child object is saved through its root",
            ));
        }
        if root.edit_level() > 0 {
            return Err(FrameworkError::invalid_operation(format!(
                "{root:?} has {} pending edit level(s); apply or cancel them first",
                root.edit_level()
            )));
        }
        if root.is_busy() {
            return Err(FrameworkError::invalid_operation(format!(
                "{root:?} is busy and cannot be saved"
            )));
        }
        if !root.is_deleted() && !root.is_valid() {
            let message = root
                .broken_rules()
                .iter()
                .filter(|rule| rule.severity().blocks_validity())
                .map(|rule| rule.description().to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FrameworkError::Validation { message });
        }
        Self::authorize(root, root.save_action())?;
        if !root.is_dirty() {
            debug!(type_name = %root.type_name(), "Save skipped, object is clean");
            return Ok(None);
        }

        let operation = if root.is_deleted() {
            if !root.is_new() {
                self.run(root, SaveOperation::Delete).await?;
            }
            root.mark_new();
            SaveOperation::Delete
        } else {
            let operation = if root.is_new() {
                SaveOperation::Insert
            } else {
                SaveOperation::Update
            };
            self.run(root, operation).await?;
            root.mark_saved();
            root.mark_old();
            operation
        };

        info!(
            type_name = %root.type_name(),
            identity = root.identity(),
            operation = ?operation,
            "Object saved"
        );
        bus::publish_saved(root.context(), root.type_name(), root.identity(), operation);
        Ok(Some(operation))
    }

    async fn run(
        &self,
        root: &BusinessObject,
        operation: SaveOperation,
    ) -> Result<(), FrameworkError> {
        let result = match operation {
            SaveOperation::Insert => self.persistence.insert(root).await,
            SaveOperation::Update => self.persistence.update(root).await,
            SaveOperation::Delete => self.persistence.delete(root).await,
        };
        if let Err(error) = &result {
            warn!(
                type_name = %root.type_name(),
                identity = root.identity(),
                operation = ?operation,
                error = %error,
                "Persistence failed"
            );
        }
        result
    }

    fn authorize(
        object: &BusinessObject,
        action: AuthorizationAction,
    ) -> Result<(), FrameworkError> {
        if object.has_permission(action) {
            Ok(())
        } else {
            Err(FrameworkError::Authorization {
                action,
                target: object.type_name().to_string(),
            })
        }
    }
}
