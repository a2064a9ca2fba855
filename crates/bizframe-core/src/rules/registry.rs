//! # Rule Registry
//!
//! Per-type rule sets, built exactly once.
//!
//! ## Initialization
//!
//! The first instance of a type runs the type's setup hook. Construction
//! is double-checked: an unsynchronised read of the `initialized` flag, then
//! the type entry's own lock, a second check, setup, and finally the flag.
//! Unrelated types never share a lock. If setup fails the partially built set
//! is dropped and the flag stays clear, so the next instance retries.

use super::authorization::AuthorizationRule;
use super::rule::{AsyncBusinessRule, BusinessRule, RegisteredRule, RuleHandle, RuleInfo};
use crate::domain::metadata::TypeProperties;
use crate::ports::BusinessType;
use parking_lot::{Mutex, RwLock};
use shared_types::{AuthorizationAction, FrameworkError, TypeName};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type AuthorizationKey = (AuthorizationAction, Option<String>);

/// Immutable rules of one type.
pub struct RuleSet {
    type_name: TypeName,
    /// Sorted by (priority, registration order).
    rules: Vec<Arc<RegisteredRule>>,
    authorization: HashMap<AuthorizationKey, Arc<dyn AuthorizationRule>>,
}

impl RuleSet {
    fn empty(type_name: TypeName) -> Self {
        Self {
            type_name,
            rules: Vec::new(),
            authorization: HashMap::new(),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Rules bound to a property, in execution order.
    #[must_use]
    pub fn rules_for_property(&self, property: &str) -> Vec<Arc<RegisteredRule>> {
        self.rules
            .iter()
            .filter(|r| r.info().primary_property() == Some(property))
            .cloned()
            .collect()
    }

    /// Rules a property runs when it is re-checked as affected by another rule.
    #[must_use]
    pub fn rules_as_affected(&self, property: &str) -> Vec<Arc<RegisteredRule>> {
        self.rules
            .iter()
            .filter(|r| {
                r.info().primary_property() == Some(property)
                    && r.info().can_run_as_affected_property()
            })
            .cloned()
            .collect()
    }

    /// Rules not bound to any property.
    #[must_use]
    pub fn object_rules(&self) -> Vec<Arc<RegisteredRule>> {
        self.rules
            .iter()
            .filter(|r| r.info().primary_property().is_none())
            .cloned()
            .collect()
    }

    /// Properties with at least one rule, in first-rule order.
    #[must_use]
    pub fn properties_with_rules(&self) -> Vec<String> {
        let mut properties: Vec<String> = Vec::new();
        for rule in &self.rules {
            if let Some(p) = rule.info().primary_property() {
                if !properties.iter().any(|seen| seen == p) {
                    properties.push(p.to_string());
                }
            }
        }
        properties
    }

    /// Rule governing an action on an element (`None` for object-level).
    #[must_use]
    pub fn authorization_rule(
        &self,
        action: AuthorizationAction,
        element: Option<&str>,
    ) -> Option<Arc<dyn AuthorizationRule>> {
        self.authorization
            .get(&(action, element.map(str::to_string)))
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RegisteredRule>> {
        self.rules.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn authorization_len(&self) -> usize {
        self.authorization.len()
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("type_name", &self.type_name)
            .field("rules", &self.rules)
            .field("authorization", &self.authorization.len())
            .finish()
    }
}

/// Collects rules during a type's setup hook.
pub struct RuleSetBuilder<'a> {
    type_name: TypeName,
    properties: &'a TypeProperties,
    rules: Vec<Arc<RegisteredRule>>,
    names: HashMap<String, usize>,
    authorization: HashMap<AuthorizationKey, Arc<dyn AuthorizationRule>>,
}

impl<'a> RuleSetBuilder<'a> {
    pub(crate) fn new(type_name: TypeName, properties: &'a TypeProperties) -> Self {
        Self {
            type_name,
            properties,
            rules: Vec::new(),
            names: HashMap::new(),
            authorization: HashMap::new(),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Register a synchronous rule.
    pub fn add_rule<R: BusinessRule + 'static>(
        &mut self,
        rule: R,
    ) -> Result<&mut Self, FrameworkError> {
        self.register(RuleHandle::Sync(Arc::new(rule)))
    }

    /// Register an asynchronous rule.
    pub fn add_async_rule<R: AsyncBusinessRule + 'static>(
        &mut self,
        rule: R,
    ) -> Result<&mut Self, FrameworkError> {
        self.register(RuleHandle::Async(Arc::new(rule)))
    }

    /// Register an authorization rule; one per (action, element).
    pub fn add_authorization_rule<R: AuthorizationRule + 'static>(
        &mut self,
        rule: R,
    ) -> Result<&mut Self, FrameworkError> {
        let action = rule.action();
        let element = rule.element().map(str::to_string);

        if matches!(
            action,
            AuthorizationAction::ReadProperty | AuthorizationAction::WriteProperty
        ) {
            let property = element.as_deref().ok_or_else(|| FrameworkError::Argument {
                parameter: "element".into(),
            })?;
            self.properties.get(property)?;
        }

        let key = (action, element);
        if self.authorization.contains_key(&key) {
            return Err(FrameworkError::rule_configuration(
                format!("{}/{:?}", self.type_name, key.1.as_deref().unwrap_or("(object)")),
                format!("duplicate authorization rule for {action}"),
            ));
        }
        self.authorization.insert(key, Arc::new(rule));
        Ok(self)
    }

    fn register(&mut self, handle: RuleHandle) -> Result<&mut Self, FrameworkError> {
        let info = match &handle {
            RuleHandle::Sync(rule) => rule.info(),
            RuleHandle::Async(rule) => rule.info(),
        };
        self.check_properties(info)?;

        let base = format!(
            "rule://{}/{}/{}",
            self.type_name,
            info.rule_type(),
            info.primary_property().unwrap_or("(object)")
        );
        let seen = self.names.entry(base.clone()).or_insert(0);
        *seen += 1;
        let name = if *seen == 1 {
            base
        } else {
            format!("{base}?n={seen}")
        };

        let order = self.rules.len();
        debug!(type_name = %self.type_name, rule = %name, "Rule registered");
        self.rules
            .push(Arc::new(RegisteredRule::new(name, handle, order)));
        Ok(self)
    }

    fn check_properties(&self, info: &RuleInfo) -> Result<(), FrameworkError> {
        for property in info
            .read_properties()
            .chain(info.affected_properties().iter().map(String::as_str))
        {
            self.properties.get(property)?;
        }
        Ok(())
    }

    fn build(mut self) -> RuleSet {
        self.rules.sort_by_key(|r| (r.priority(), r.order()));
        RuleSet {
            type_name: self.type_name,
            rules: self.rules,
            authorization: self.authorization,
        }
    }
}

/// Registry entry for one type.
pub struct TypeRules {
    initialized: AtomicBool,
    init_lock: Mutex<()>,
    rule_set: RwLock<Arc<RuleSet>>,
}

impl TypeRules {
    fn new(type_name: TypeName) -> Self {
        Self {
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            rule_set: RwLock::new(Arc::new(RuleSet::empty(type_name))),
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn rule_set(&self) -> Arc<RuleSet> {
        self.rule_set.read().clone()
    }
}

/// Process-scoped rule registry, keyed by declaring type.
#[derive(Default)]
pub struct RuleRegistry {
    types: RwLock<HashMap<TypeName, Arc<TypeRules>>>,
}

impl RuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, type_name: &TypeName) -> Arc<TypeRules> {
        if let Some(entry) = self.types.read().get(type_name) {
            return entry.clone();
        }
        self.types
            .write()
            .entry(type_name.clone())
            .or_insert_with(|| Arc::new(TypeRules::new(type_name.clone())))
            .clone()
    }

    /// Rules of a type, running its setup hook the first time.
    pub fn ensure_initialized(
        &self,
        definition: &dyn BusinessType,
        properties: &TypeProperties,
    ) -> Result<Arc<RuleSet>, FrameworkError> {
        let type_name = definition.type_name();
        let entry = self.entry(&type_name);
        if entry.is_initialized() {
            return Ok(entry.rule_set());
        }

        let _guard = entry.init_lock.lock();
        if entry.is_initialized() {
            return Ok(entry.rule_set());
        }

        let mut builder = RuleSetBuilder::new(type_name.clone(), properties);
        if let Err(e) = definition.add_business_rules(&mut builder) {
            warn!(type_name = %type_name, error = %e, "Rule setup failed; rule set discarded");
            return Err(e);
        }

        let rule_set = Arc::new(builder.build());
        info!(
            type_name = %type_name,
            rules = rule_set.len(),
            authorization_rules = rule_set.authorization_len(),
            "Business rules initialized"
        );
        *entry.rule_set.write() = rule_set.clone();
        entry.initialized.store(true, Ordering::Release);
        Ok(rule_set)
    }

    /// Rules of an initialized type.
    #[must_use]
    pub fn get(&self, type_name: &TypeName) -> Option<Arc<RuleSet>> {
        self.types
            .read()
            .get(type_name)
            .filter(|entry| entry.is_initialized())
            .map(|entry| entry.rule_set())
    }

    #[must_use]
    pub fn is_initialized(&self, type_name: &TypeName) -> bool {
        self.get(type_name).is_some()
    }

    /// Drop a type's rules; the next instance runs setup again.
    pub fn evict(&self, type_name: &TypeName) -> bool {
        let removed = self.types.write().remove(type_name).is_some();
        if removed {
            debug!(type_name = %type_name, "Evicted rule set");
        }
        removed
    }
}
