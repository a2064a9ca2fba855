//! Dynamic field values and their coercion rules.

use crate::object::{BusinessList, BusinessObject};
use shared_types::FrameworkError;
use std::fmt;

/// Declared kind of a managed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    /// A single child business object.
    Child,
    /// An owned child collection.
    ChildList,
    /// Untyped; any value is accepted as-is.
    Any,
}

impl ValueKind {
    /// Default value for a property of this kind.
    #[must_use]
    pub fn default_value(self) -> FieldValue {
        match self {
            Self::Bool => FieldValue::Bool(false),
            Self::Int => FieldValue::Int(0),
            Self::Float => FieldValue::Float(0.0),
            Self::Text => FieldValue::Text(String::new()),
            Self::Child | Self::ChildList | Self::Any => FieldValue::Null,
        }
    }

    /// Whether values of this kind are graph members.
    #[must_use]
    pub fn is_child(self) -> bool {
        matches!(self, Self::Child | Self::ChildList)
    }
}

/// Value held by a field slot.
///
/// Graph members compare by reference; everything else by value.
#[derive(Clone, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Child(BusinessObject),
    ChildList(BusinessList),
}

impl FieldValue {
    /// Coerce to the declared kind of `property`.
    ///
    /// `Int` widens to `Float` and `Null` on a text property becomes `""`.
    pub fn coerce(self, kind: ValueKind, property: &str) -> Result<Self, FrameworkError> {
        match (kind, self) {
            (ValueKind::Any, value) => Ok(value),
            (_, Self::Null) if kind == ValueKind::Text => Ok(Self::Text(String::new())),
            (_, Self::Null) => Ok(Self::Null),
            (ValueKind::Bool, value @ Self::Bool(_)) => Ok(value),
            (ValueKind::Int, value @ Self::Int(_)) => Ok(value),
            (ValueKind::Float, value @ Self::Float(_)) => Ok(value),
            (ValueKind::Float, Self::Int(i)) => Ok(Self::Float(i as f64)),
            (ValueKind::Text, value @ Self::Text(_)) => Ok(value),
            (ValueKind::Child, value @ Self::Child(_)) => Ok(value),
            (ValueKind::ChildList, value @ Self::ChildList(_)) => Ok(value),
            (kind, value) => Err(FrameworkError::property_load(
                property,
                format!("expected {kind:?}, got {}", value.kind_name()),
            )),
        }
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Float(_) => "Float",
            Self::Text(_) => "Text",
            Self::Child(_) => "Child",
            Self::ChildList(_) => "ChildList",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_child(&self) -> Option<&BusinessObject> {
        match self {
            Self::Child(child) => Some(child),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&BusinessList> {
        match self {
            Self::ChildList(list) => Some(list),
            _ => None,
        }
    }

    /// True for `Null` and for empty text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Child(a), Self::Child(b)) => a.ptr_eq(b),
            (Self::ChildList(a), Self::ChildList(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Text(s) => write!(f, "Text({s:?})"),
            Self::Child(child) => write!(f, "Child({child:?})"),
            Self::ChildList(list) => write!(f, "ChildList({list:?})"),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Child(child) => write!(f, "{child:?}"),
            Self::ChildList(list) => write!(f, "{list:?}"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<BusinessObject> for FieldValue {
    fn from(value: BusinessObject) -> Self {
        Self::Child(value)
    }
}

impl From<BusinessList> for FieldValue {
    fn from(value: BusinessList) -> Self {
        Self::ChildList(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
