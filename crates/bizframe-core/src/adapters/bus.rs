//! Notification bus adapter.
//!
//! Translates engine occurrences into [`FrameworkEvent`]s on the context's bus.

use crate::context::ApplicationContext;
use shared_bus::{FrameworkEvent, SaveOperation};
use shared_types::{FrameworkError, TypeName};
use tracing::debug;

pub(crate) fn publish_unhandled(
    context: &ApplicationContext,
    type_name: &TypeName,
    identity: i32,
    property: Option<String>,
    error: FrameworkError,
) {
    context.publish(FrameworkEvent::UnhandledAsyncException {
        type_name: type_name.clone(),
        identity,
        property,
        error,
    });
}

pub(crate) fn publish_validation_complete(
    context: &ApplicationContext,
    type_name: &TypeName,
    identity: i32,
) {
    debug!(type_name = %type_name, identity, "Async validation complete");
    context.publish(FrameworkEvent::ValidationComplete {
        type_name: type_name.clone(),
        identity,
    });
}

pub(crate) fn publish_saved(
    context: &ApplicationContext,
    type_name: &TypeName,
    identity: i32,
    operation: SaveOperation,
) {
    context.publish(FrameworkEvent::ObjectSaved {
        type_name: type_name.clone(),
        identity,
        operation,
    });
}
