//! Persistence port used by the data portal.

use crate::object::BusinessObject;
use async_trait::async_trait;
use shared_types::FrameworkError;

/// Storage for business objects.
///
/// Implementations read state with `read_property` and write fetched state
/// with `load_property`; the portal handles lifecycle flags.
#[async_trait]
pub trait ObjectPersistence: Send + Sync {
    async fn insert(&self, object: &BusinessObject) -> Result<(), FrameworkError>;

    async fn update(&self, object: &BusinessObject) -> Result<(), FrameworkError>;

    async fn delete(&self, object: &BusinessObject) -> Result<(), FrameworkError>;

    /// Populate a freshly created object from storage.
    async fn fetch(&self, object: &BusinessObject, criteria: &str) -> Result<(), FrameworkError>;
}
