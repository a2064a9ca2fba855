//! # Error Types
//!
//! The framework error taxonomy.
//!
//! Authorization failures are the one category the engine absorbs locally
//! (default value on read, no-op on write) unless the caller opts into
//! throwing. Every other variant propagates to the immediate caller.

use crate::entities::AuthorizationAction;
use thiserror::Error;

/// Errors raised by the business-object lifecycle engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameworkError {
    /// A required parameter was missing or empty.
    #[error("Argument error: {parameter} is required")]
    Argument { parameter: String },

    /// An access was denied and the caller asked for an error instead of the
    /// silent default.
    #[error("Authorization denied: {action} on {target}")]
    Authorization {
        action: AuthorizationAction,
        target: String,
    },

    /// Coercing or storing a property value failed.
    #[error("Property load error on {property}: {message}")]
    PropertyLoad { property: String, message: String },

    /// Structural misuse of an object or the graph.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// An idle wait exceeded its allotted duration.
    #[error("Timed out after {waited_ms}ms waiting for the object to become idle")]
    Timeout { waited_ms: u64 },

    /// An idle wait was cancelled by its caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// A rule is misconfigured (failed without a description, duplicate
    /// authorization rule, failing setup hook).
    #[error("Rule configuration error in {rule}: {message}")]
    RuleConfiguration { rule: String, message: String },

    /// No property with this name is registered on the type.
    #[error("Property not found: {type_name}.{property}")]
    NotFound { type_name: String, property: String },

    /// An object failed validation and cannot be saved.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// The persistence port reported a failure.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl FrameworkError {
    /// Shorthand for an `InvalidOperation` error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Shorthand for a `PropertyLoad` error.
    pub fn property_load(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PropertyLoad {
            property: property.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a `RuleConfiguration` error.
    pub fn rule_configuration(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleConfiguration {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for the two outcomes of an abandoned idle wait.
    #[must_use]
    pub fn is_wait_abandoned(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled)
    }
}
