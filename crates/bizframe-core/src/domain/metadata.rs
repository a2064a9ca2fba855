//! # Property Metadata Registry
//!
//! Per-type registry of managed property descriptors.
//!
//! Descriptors are immutable once registered and shared by every instance of
//! the declaring type. The registry is owned by an `ApplicationContext`, so
//! tests and isolated hosts each get their own. Each type entry carries its
//! own lock; registering properties on one type never contends with lookups on
//! another.
//!
//! A type's declared properties are registered as one step under the entry's
//! declaration lock, so no reader sees a partly declared type.

use super::value::{FieldValue, ValueKind};
use parking_lot::{Mutex, RwLock};
use shared_types::{FrameworkError, TypeName};
use std::collections::HashMap;
use std::ops::BitOr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Relationship flags of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RelationshipTypes(u8);

impl RelationshipTypes {
    pub const NONE: Self = Self(0);
    /// Value is kept in a private backing field reached through a field accessor.
    pub const PRIVATE_FIELD: Self = Self(1);
    /// Value is a child object or child collection.
    pub const CHILD: Self = Self(1 << 1);
    /// Value is supplied on demand; reading it before then is an error.
    pub const LAZY_LOAD: Self = Self(1 << 2);

    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RelationshipTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// What a business type declares about one property.
#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    pub name: String,
    pub kind: ValueKind,
    pub default: Option<FieldValue>,
    pub relationships: RelationshipTypes,
    pub friendly_name: Option<String>,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        let relationships = if kind.is_child() {
            RelationshipTypes::CHILD
        } else {
            RelationshipTypes::NONE
        };
        Self {
            name: name.into(),
            kind,
            default: None,
            relationships,
            friendly_name: None,
        }
    }

    /// Shorthand for a text property.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Text)
    }

    /// Shorthand for an integer property.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Int)
    }

    /// Shorthand for a child-object property.
    pub fn child(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Child)
    }

    /// Shorthand for a child-collection property.
    pub fn child_list(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::ChildList)
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_friendly_name(mut self, friendly: impl Into<String>) -> Self {
        self.friendly_name = Some(friendly.into());
        self
    }

    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.relationships = self.relationships | RelationshipTypes::LAZY_LOAD;
        self
    }

    #[must_use]
    pub fn private_field(mut self) -> Self {
        self.relationships = self.relationships | RelationshipTypes::PRIVATE_FIELD;
        self
    }
}

/// A registered property.
#[derive(Debug)]
pub struct PropertyInfo {
    pub declaring_type: TypeName,
    pub name: String,
    pub friendly_name: String,
    pub kind: ValueKind,
    pub default: FieldValue,
    pub relationships: RelationshipTypes,
    /// Registration order within the declaring type.
    pub index: usize,
}

impl PropertyInfo {
    #[must_use]
    pub fn is_lazy(&self) -> bool {
        self.relationships.contains(RelationshipTypes::LAZY_LOAD)
    }

    #[must_use]
    pub fn is_child(&self) -> bool {
        self.relationships.contains(RelationshipTypes::CHILD)
    }

    #[must_use]
    pub fn is_private_field(&self) -> bool {
        self.relationships
            .contains(RelationshipTypes::PRIVATE_FIELD)
    }
}

/// Shared handle to a registered property.
pub type PropertyDescriptor = Arc<PropertyInfo>;

/// Properties of one type, in registration order.
#[derive(Debug)]
pub struct TypeProperties {
    type_name: TypeName,
    ordered: RwLock<Vec<PropertyDescriptor>>,
    by_name: RwLock<HashMap<String, PropertyDescriptor>>,
    write_lock: Mutex<()>,
    declared: AtomicBool,
    declare_lock: Mutex<()>,
}

impl TypeProperties {
    fn new(type_name: TypeName) -> Self {
        Self {
            type_name,
            ordered: RwLock::new(Vec::new()),
            by_name: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
            declared: AtomicBool::new(false),
            declare_lock: Mutex::new(()),
        }
    }

    /// Whether the type's declared properties are all registered.
    #[must_use]
    pub fn is_declared(&self) -> bool {
        self.declared.load(Ordering::Acquire)
    }

    fn declare_with<F>(&self, declare: F)
    where
        F: FnOnce() -> Vec<PropertyDefinition>,
    {
        if self.is_declared() {
            return;
        }
        let _guard = self.declare_lock.lock();
        if self.is_declared() {
            return;
        }
        for definition in declare() {
            self.register(definition);
        }
        self.declared.store(true, Ordering::Release);
        debug!(type_name = %self.type_name, properties = self.len(), "Properties declared");
    }

    /// Declaring type.
    #[must_use]
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    fn register(&self, definition: PropertyDefinition) -> PropertyDescriptor {
        let _guard = self.write_lock.lock();
        if let Some(existing) = self.by_name.read().get(&definition.name) {
            return existing.clone();
        }

        let index = self.ordered.read().len();
        let default = definition
            .default
            .unwrap_or_else(|| definition.kind.default_value());
        let info = Arc::new(PropertyInfo {
            declaring_type: self.type_name.clone(),
            friendly_name: definition
                .friendly_name
                .unwrap_or_else(|| definition.name.clone()),
            name: definition.name,
            kind: definition.kind,
            default,
            relationships: definition.relationships,
            index,
        });

        self.ordered.write().push(info.clone());
        self.by_name
            .write()
            .insert(info.name.clone(), info.clone());
        info
    }

    /// Look up a property by name.
    pub fn get(&self, name: &str) -> Result<PropertyDescriptor, FrameworkError> {
        self.by_name
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| FrameworkError::NotFound {
                type_name: self.type_name.to_string(),
                property: name.to_string(),
            })
    }

    /// Every property in registration order.
    #[must_use]
    pub fn all(&self) -> Vec<PropertyDescriptor> {
        self.ordered.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-scoped registry of property descriptors, keyed by declaring type.
#[derive(Debug, Default)]
pub struct PropertyRegistry {
    types: RwLock<HashMap<TypeName, Arc<TypeProperties>>>,
}

impl PropertyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for a type, created empty on first use.
    pub fn entry(&self, type_name: &TypeName) -> Arc<TypeProperties> {
        if let Some(entry) = self.types.read().get(type_name) {
            return entry.clone();
        }
        self.types
            .write()
            .entry(type_name.clone())
            .or_insert_with(|| Arc::new(TypeProperties::new(type_name.clone())))
            .clone()
    }

    /// Entry for a type with its declared properties registered.
    ///
    /// `declare` runs at most once per type; concurrent callers wait for it.
    pub fn ensure_declared<F>(&self, type_name: &TypeName, declare: F) -> Arc<TypeProperties>
    where
        F: FnOnce() -> Vec<PropertyDefinition>,
    {
        let entry = self.entry(type_name);
        entry.declare_with(declare);
        entry
    }

    /// Register a property. Re-registering a name returns the existing descriptor.
    pub fn register(
        &self,
        type_name: &TypeName,
        definition: PropertyDefinition,
    ) -> PropertyDescriptor {
        self.entry(type_name).register(definition)
    }

    /// Every property of a type in registration order (empty if unknown).
    #[must_use]
    pub fn get_all(&self, type_name: &TypeName) -> Vec<PropertyDescriptor> {
        self.types
            .read()
            .get(type_name)
            .map(|entry| entry.all())
            .unwrap_or_default()
    }

    /// Look up one property.
    pub fn get(
        &self,
        type_name: &TypeName,
        name: &str,
    ) -> Result<PropertyDescriptor, FrameworkError> {
        let entry = self.types.read().get(type_name).cloned();
        match entry {
            Some(entry) => entry.get(name),
            None => Err(FrameworkError::NotFound {
                type_name: type_name.to_string(),
                property: name.to_string(),
            }),
        }
    }

    /// Drop a type's descriptors. Live instances keep the ones they hold.
    pub fn evict(&self, type_name: &TypeName) -> bool {
        let removed = self.types.write().remove(type_name).is_some();
        if removed {
            debug!(type_name = %type_name, "Evicted property metadata");
        }
        removed
    }

    /// Whether any property of the type is registered.
    #[must_use]
    pub fn contains_type(&self, type_name: &TypeName) -> bool {
        self.types
            .read()
            .get(type_name)
            .is_some_and(|entry| !entry.is_empty())
    }
}

/// Anything that identifies a property of an object's type.
pub trait PropertyKey {
    fn resolve(&self, properties: &TypeProperties) -> Result<PropertyDescriptor, FrameworkError>;
}

impl PropertyKey for str {
    fn resolve(&self, properties: &TypeProperties) -> Result<PropertyDescriptor, FrameworkError> {
        properties.get(self)
    }
}

impl PropertyKey for String {
    fn resolve(&self, properties: &TypeProperties) -> Result<PropertyDescriptor, FrameworkError> {
        properties.get(self)
    }
}

impl PropertyKey for PropertyDescriptor {
    fn resolve(&self, properties: &TypeProperties) -> Result<PropertyDescriptor, FrameworkError> {
        if &self.declaring_type != properties.type_name() {
            return Err(FrameworkError::NotFound {
                type_name: properties.type_name().to_string(),
                property: format!("{}.{}", self.declaring_type, self.name),
            });
        }
        Ok(self.clone())
    }
}

impl<K: PropertyKey + ?Sized> PropertyKey for &K {
    fn resolve(&self, properties: &TypeProperties) -> Result<PropertyDescriptor, FrameworkError> {
        (**self).resolve(properties)
    }
}
