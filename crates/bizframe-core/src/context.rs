//! # Application Context
//!
//! Everything shared by the objects of one application: metadata registries,
//! configuration, the active principal, the notification bus and the runtime
//! used for background rules and loads.
//!
//! Objects hold an `Arc<ApplicationContext>`; tests build a fresh context each
//! so registries never leak between them.

use crate::config::{ConfigError, FrameworkConfig};
use crate::domain::metadata::PropertyRegistry;
use crate::rules::{AuthorizationContext, RuleRegistry};
use parking_lot::RwLock;
use shared_bus::{EventFilter, EventPublisher, FrameworkEvent, InMemoryEventBus, Subscription};
use shared_types::{AuthorizationAction, FrameworkError, Principal, TypeName};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};

pub struct ApplicationContext {
    config: FrameworkConfig,
    properties: PropertyRegistry,
    rules: RuleRegistry,
    principal: RwLock<Arc<Principal>>,
    bus: Arc<InMemoryEventBus>,
    runtime: Option<Handle>,
}

impl ApplicationContext {
    /// A context with an anonymous principal and no pinned runtime.
    pub fn new(config: FrameworkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let bus = Arc::new(InMemoryEventBus::with_capacity(
            config.notifications.channel_capacity,
        ));
        info!(
            process_through_priority = config.rules.process_through_priority,
            cascade_on_dirty_properties = config.rules.cascade_on_dirty_properties,
            max_rule_depth = config.rules.max_rule_depth,
            "Application context created"
        );
        Ok(Self {
            config,
            properties: PropertyRegistry::new(),
            rules: RuleRegistry::new(),
            principal: RwLock::new(Arc::new(Principal::anonymous())),
            bus,
            runtime: None,
        })
    }

    /// Run background rules and loads on `runtime` instead of the ambient one.
    #[must_use]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    #[must_use]
    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    #[must_use]
    pub fn properties(&self) -> &PropertyRegistry {
        &self.properties
    }

    #[must_use]
    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    /// The active principal. A new `Arc` is installed on every change.
    #[must_use]
    pub fn principal(&self) -> Arc<Principal> {
        self.principal.read().clone()
    }

    /// Replace the active principal; cached authorization answers become stale.
    pub fn set_principal(&self, principal: Principal) {
        let event = FrameworkEvent::PrincipalChanged {
            name: principal.name().to_string(),
            authenticated: principal.is_authenticated(),
        };
        info!(
            principal = principal.name(),
            authenticated = principal.is_authenticated(),
            "Principal changed"
        );
        *self.principal.write() = Arc::new(principal);
        self.publish(event);
    }

    /// Purge a type's property and rule metadata.
    pub fn evict(&self, type_name: &TypeName) -> bool {
        let properties = self.properties.evict(type_name);
        let rules = self.rules.evict(type_name);
        let evicted = properties || rules;
        if evicted {
            info!(type_name = %type_name, "Type metadata evicted");
            self.publish(FrameworkEvent::TypeEvicted {
                type_name: type_name.clone(),
            });
        }
        evicted
    }

    /// Object-level permission for a type. Types whose rules were never
    /// initialized have no authorization rules, so everything is allowed.
    #[must_use]
    pub fn has_permission(&self, type_name: &TypeName, action: AuthorizationAction) -> bool {
        let Some(rule_set) = self.rules.get(type_name) else {
            return true;
        };
        let Some(rule) = rule_set.authorization_rule(action, None) else {
            return true;
        };
        let principal = self.principal();
        rule.execute(&AuthorizationContext {
            principal: &principal,
            type_name,
            target: None,
        })
    }

    /// Subscribe to framework events on the notification bus.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.bus.subscribe(filter)
    }

    /// Runtime for background work: the pinned handle, else the ambient one.
    pub(crate) fn runtime(&self) -> Result<Handle, FrameworkError> {
        if let Some(handle) = &self.runtime {
            return Ok(handle.clone());
        }
        Handle::try_current().map_err(|_| {
            FrameworkError::invalid_operation(
                "asynchronous work requires a tokio runtime; none is running and none was configured",
            )
        })
    }

    pub(crate) fn publish(&self, event: FrameworkEvent) {
        let receivers = self.bus.publish(event);
        debug!(receivers, "Framework event published");
    }
}

impl Default for ApplicationContext {
    fn default() -> Self {
        Self {
            config: FrameworkConfig::default(),
            properties: PropertyRegistry::new(),
            rules: RuleRegistry::new(),
            principal: RwLock::new(Arc::new(Principal::anonymous())),
            bus: Arc::new(InMemoryEventBus::new()),
            runtime: None,
        }
    }
}

impl std::fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("config", &self.config)
            .field("principal", &self.principal().name())
            .field("pinned_runtime", &self.runtime.is_some())
            .finish_non_exhaustive()
    }
}
