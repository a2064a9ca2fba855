//! # Shared Entities
//!
//! Small value types that both the engine and the notification bus speak.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Name of a declaring business type.
///
/// Registries are keyed by this name. Cloning is cheap (shared string).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName(Arc<str>);

impl TypeName {
    /// Create a type name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeName({})", self.0)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TypeName {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Severity of a rule result.
///
/// Only `Error` makes an object invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleSeverity {
    Error,
    Warning,
    Information,
    Success,
}

impl RuleSeverity {
    /// Whether a result of this severity blocks validity.
    #[must_use]
    pub fn blocks_validity(self) -> bool {
        self == Self::Error
    }
}

impl fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Information => "Information",
            Self::Success => "Success",
        };
        f.write_str(label)
    }
}

/// Actions an authorization rule can govern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationAction {
    ReadProperty,
    WriteProperty,
    ExecuteMethod,
    CreateObject,
    GetObject,
    EditObject,
    DeleteObject,
}

impl AuthorizationAction {
    /// Object-level actions are checked against the type, not a member.
    #[must_use]
    pub fn is_object_level(self) -> bool {
        matches!(
            self,
            Self::CreateObject | Self::GetObject | Self::EditObject | Self::DeleteObject
        )
    }
}

impl fmt::Display for AuthorizationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
