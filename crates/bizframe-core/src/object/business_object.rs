//! # Business Object
//!
//! The façade every business type instance is used through.
//!
//! ## Structure
//!
//! `BusinessObject` is a cheap, cloneable handle over one `ObjectCell`. The
//! cell keeps immutable type metadata, the parent link, atomic counters and a
//! single mutex around the mutable state (field store, flags, broken rules,
//! undo stack).
//!
//! ## Lock Discipline
//!
//! | Held | May then lock |
//! |------|---------------|
//! | own state | a child's state (downward) |
//! | nothing | a parent, listeners, rules |
//!
//! Listeners and parents are never called while the state lock is held, so a
//! listener may freely read the object that raised the event.

use super::busy::{self, BusyTracker, CancellationSignal};
use super::bypass::{BypassGuard, RuleSuppressionGuard};
use super::graph::{GraphLink, GraphNode, ParentRef};
use super::listeners::Listeners;
use crate::adapters::bus;
use crate::context::ApplicationContext;
use crate::domain::broken_rules::{BrokenRule, BrokenRulesCollection};
use crate::domain::events::{ChildEvent, ObjectEvent, SubscriptionId};
use crate::domain::field_store::FieldStore;
use crate::domain::metadata::{PropertyDescriptor, PropertyKey, TypeProperties};
use crate::domain::undo::{EditSnapshot, ObjectFlags, UndoStack};
use crate::ports::{BusinessType, ObjectHooks};
use crate::rules::{AuthorizationCache, RuleSet};
use parking_lot::{Mutex, MutexGuard};
use shared_types::{AuthorizationAction, FrameworkError, TypeName};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{trace, warn};

/// Mutable per-instance state, guarded by one lock.
pub(crate) struct ObjectState {
    pub(super) fields: FieldStore,
    pub(super) flags: ObjectFlags,
    pub(super) is_child: bool,
    pub(super) broken_rules: BrokenRulesCollection,
    pub(super) undo: UndoStack<EditSnapshot>,
    /// Cleared by the first accepted edit.
    pub(super) never_committed: bool,
    /// Parent edit level when this object was attached.
    pub(super) edit_level_added: usize,
    pub(super) auth_cache: AuthorizationCache,
}

pub(crate) struct ObjectCell {
    pub(super) definition: Arc<dyn BusinessType>,
    pub(super) type_name: TypeName,
    pub(super) context: Arc<ApplicationContext>,
    pub(super) properties: Arc<TypeProperties>,
    pub(super) rules: Arc<RuleSet>,
    pub(super) link: GraphLink,
    pub(super) state: Mutex<ObjectState>,
    pub(super) busy: BusyTracker,
    pub(super) listeners: Listeners<ObjectEvent>,
    pub(super) bypass: AtomicUsize,
    pub(super) rule_suppression: AtomicUsize,
    pub(super) rule_depth: AtomicUsize,
    pub(super) idle: Notify,
}

/// Handle to a business object instance.
#[derive(Clone)]
pub struct BusinessObject(Arc<ObjectCell>);

impl BusinessObject {
    /// A new, dirty instance of `definition`.
    ///
    /// The first instance of a type registers its properties and runs its
    /// rule setup. Rules are not run; see [`BusinessObject::create`].
    pub fn new(
        definition: Arc<dyn BusinessType>,
        context: &Arc<ApplicationContext>,
    ) -> Result<Self, FrameworkError> {
        let type_name = definition.type_name();
        let properties = context
            .properties()
            .ensure_declared(&type_name, || definition.properties());
        let rules = context
            .rules()
            .ensure_initialized(definition.as_ref(), &properties)?;

        let object = Self(Arc::new(ObjectCell {
            definition,
            type_name,
            context: context.clone(),
            properties,
            rules,
            link: GraphLink::new(),
            state: Mutex::new(ObjectState {
                fields: FieldStore::new(),
                flags: ObjectFlags::default(),
                is_child: false,
                broken_rules: BrokenRulesCollection::new(),
                undo: UndoStack::new(),
                never_committed: true,
                edit_level_added: 0,
                auth_cache: AuthorizationCache::new(),
            }),
            busy: BusyTracker::default(),
            listeners: Listeners::new(),
            bypass: AtomicUsize::new(0),
            rule_suppression: AtomicUsize::new(0),
            rule_depth: AtomicUsize::new(0),
            idle: Notify::new(),
        }));
        object.0.link.renew_identity();
        trace!(type_name = %object.0.type_name, identity = object.identity(), "Business object created");
        Ok(object)
    }

    /// A new instance with every rule already checked.
    pub fn create(
        definition: Arc<dyn BusinessType>,
        context: &Arc<ApplicationContext>,
    ) -> Result<Self, FrameworkError> {
        let object = Self::new(definition, context)?;
        object.check_rules()?;
        Ok(object)
    }

    pub(crate) fn from_cell(cell: Arc<ObjectCell>) -> Self {
        Self(cell)
    }

    pub(super) fn cell(&self) -> &ObjectCell {
        &self.0
    }

    pub(super) fn state(&self) -> MutexGuard<'_, ObjectState> {
        self.0.state.lock()
    }

    pub(crate) fn link(&self) -> &GraphLink {
        &self.0.link
    }

    /// Link handed to children of this object.
    pub(super) fn as_parent(&self) -> ParentRef {
        ParentRef::Object(Arc::downgrade(&self.0))
    }

    pub(super) fn hooks(&self) -> &dyn ObjectHooks {
        self.0.definition.hooks()
    }

    /// Same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn type_name(&self) -> &TypeName {
        &self.0.type_name
    }

    #[must_use]
    pub fn context(&self) -> &Arc<ApplicationContext> {
        &self.0.context
    }

    /// Registered properties of this object's type, in registration order.
    #[must_use]
    pub fn properties(&self) -> Vec<PropertyDescriptor> {
        self.0.properties.all()
    }

    /// Descriptor of one property.
    pub fn property(&self, key: impl PropertyKey) -> Result<PropertyDescriptor, FrameworkError> {
        key.resolve(&self.0.properties)
    }

    #[must_use]
    pub fn rule_set(&self) -> &Arc<RuleSet> {
        &self.0.rules
    }

    /// Identity, unique within this object's graph.
    #[must_use]
    pub fn identity(&self) -> i32 {
        self.0.link.identity()
    }

    #[must_use]
    pub fn parent(&self) -> Option<GraphNode> {
        self.0.link.parent()
    }

    // === Status ===

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.state().flags.is_new
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.state().flags.is_deleted
    }

    #[must_use]
    pub fn is_child(&self) -> bool {
        self.state().is_child
    }

    /// Own flag or any own field dirty; children not considered.
    #[must_use]
    pub fn is_self_dirty(&self) -> bool {
        let state = self.state();
        state.flags.is_dirty || state.fields.is_self_dirty()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let state = self.state();
        state.flags.is_dirty || state.fields.is_dirty()
    }

    /// No own broken rule of severity Error.
    #[must_use]
    pub fn is_self_valid(&self) -> bool {
        self.state().broken_rules.is_valid()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        let state = self.state();
        state.broken_rules.is_valid() && state.fields.is_valid_aggregate()
    }

    /// Marked busy, running an async rule, or loading a property.
    #[must_use]
    pub fn is_self_busy(&self) -> bool {
        self.0.busy.is_busy()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.is_self_busy() || self.state().fields.is_busy_aggregate()
    }

    /// Whether an async rule or load is in flight for one property.
    #[must_use]
    pub fn is_property_busy(&self, property: &str) -> bool {
        self.0.busy.is_property_busy(property)
    }

    /// Dirty, valid, idle, and the principal may perform the pending save.
    #[must_use]
    pub fn is_savable(&self) -> bool {
        if !(self.is_dirty() && self.is_valid() && !self.is_busy()) {
            return false;
        }
        self.has_permission(self.save_action())
    }

    pub(crate) fn save_action(&self) -> AuthorizationAction {
        let flags = self.state().flags;
        if flags.is_deleted {
            AuthorizationAction::DeleteObject
        } else if flags.is_new {
            AuthorizationAction::CreateObject
        } else {
            AuthorizationAction::EditObject
        }
    }

    /// Number of outstanding `begin_edit` snapshots.
    #[must_use]
    pub fn edit_level(&self) -> usize {
        self.state().undo.level()
    }

    /// Copy of the current broken rules.
    #[must_use]
    pub fn broken_rules(&self) -> BrokenRulesCollection {
        self.state().broken_rules.clone()
    }

    /// Broken rules of one property, in priority order.
    #[must_use]
    pub fn broken_rules_for(&self, property: &str) -> Vec<BrokenRule> {
        self.state()
            .broken_rules
            .for_property(property)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Highest-priority error of one property.
    #[must_use]
    pub fn first_broken_rule(&self, property: &str) -> Option<BrokenRule> {
        self.state()
            .broken_rules
            .first_broken_rule(property)
            .cloned()
    }

    pub(crate) fn child_nodes(&self) -> Vec<GraphNode> {
        self.state().fields.children()
    }

    // === Lifecycle flags ===

    /// New and dirty; clears the deleted flag.
    pub fn mark_new(&self) {
        {
            let mut state = self.state();
            state.flags.is_new = true;
            state.flags.is_deleted = false;
            state.flags.is_dirty = true;
        }
        self.emit(ObjectEvent::AllPropertiesChanged);
    }

    /// Persisted and clean.
    pub fn mark_old(&self) {
        {
            let mut state = self.state();
            state.flags.is_new = false;
            state.flags.is_dirty = false;
            state.fields.mark_clean();
        }
        self.emit(ObjectEvent::AllPropertiesChanged);
    }

    pub fn mark_dirty(&self) {
        self.state().flags.is_dirty = true;
        self.emit(ObjectEvent::AllPropertiesChanged);
    }

    /// Clear the own flag and every field's dirty flag.
    pub fn mark_clean(&self) {
        {
            let mut state = self.state();
            state.flags.is_dirty = false;
            state.fields.mark_clean();
        }
        self.emit(ObjectEvent::AllPropertiesChanged);
    }

    pub fn mark_as_child(&self) {
        self.state().is_child = true;
    }

    pub fn mark_busy(&self) {
        self.0.busy.mark();
        self.emit(ObjectEvent::BusyChanged {
            property: None,
            busy: true,
        });
    }

    pub fn mark_idle(&self) {
        if self.0.busy.unmark() {
            self.emit(ObjectEvent::BusyChanged {
                property: None,
                busy: false,
            });
        }
    }

    pub(crate) fn mark_deleted(&self) {
        {
            let mut state = self.state();
            state.flags.is_deleted = true;
            state.flags.is_dirty = true;
        }
        self.emit(ObjectEvent::AllPropertiesChanged);
    }

    /// Mark a root for deletion. Children are deleted through their collection.
    pub fn delete(&self) -> Result<(), FrameworkError> {
        if self.is_child() {
            return Err(FrameworkError::invalid_operation(
                "a child object is deleted through its parent",
            ));
        }
        self.mark_deleted();
        self.hooks().on_deleted(self);
        Ok(())
    }

    pub(crate) fn mark_saved(&self) {
        let children = {
            let mut state = self.state();
            state.flags.is_new = false;
            state.flags.is_dirty = false;
            state.fields.mark_clean();
            state.fields.children()
        };
        for child in children {
            child.mark_saved();
        }
    }

    // === Guards ===

    /// Suppress authorization, notifications and rules for property writes.
    pub fn bypass_property_checks(&self) -> BypassGuard {
        BypassGuard::new(self.clone())
    }

    #[must_use]
    pub fn is_bypassing(&self) -> bool {
        self.0.bypass.load(Ordering::Acquire) > 0
    }

    /// Turn rule checking off until the guard drops.
    pub fn suppress_rule_checking(&self) -> RuleSuppressionGuard {
        RuleSuppressionGuard::new(self.clone())
    }

    #[must_use]
    pub fn is_rule_checking_suppressed(&self) -> bool {
        self.0.rule_suppression.load(Ordering::Acquire) > 0
    }

    // === Events ===

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ObjectEvent) + Send + Sync + 'static,
    {
        self.0.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.0.listeners.unsubscribe(id)
    }

    /// Raise an event locally and bubble it to the parent.
    pub(crate) fn emit(&self, event: ObjectEvent) {
        self.0.listeners.notify(&event);
        if matches!(
            event,
            ObjectEvent::BusyChanged { .. }
                | ObjectEvent::ValidationComplete
                | ObjectEvent::ChildChanged(ChildEvent::BusyChanged { .. })
        ) {
            self.0.idle.notify_waiters();
        }
        if let Some(parent) = self.0.link.parent() {
            if let Some(bubbled) = self.bubbled(event) {
                parent.receive_child_event(bubbled);
            }
        }
    }

    fn bubbled(&self, event: ObjectEvent) -> Option<ChildEvent> {
        let source = GraphNode::Object(self.clone());
        match event {
            ObjectEvent::PropertyChanged { property } => Some(ChildEvent::PropertyChanged {
                source,
                property: Some(property),
            }),
            ObjectEvent::AllPropertiesChanged => Some(ChildEvent::PropertyChanged {
                source,
                property: None,
            }),
            ObjectEvent::ChildChanged(inner) => Some(inner),
            ObjectEvent::BusyChanged { property, busy } => Some(ChildEvent::BusyChanged {
                source,
                property,
                busy,
            }),
            ObjectEvent::ErrorsChanged { .. } => Some(ChildEvent::ErrorChanged { source }),
            ObjectEvent::UnhandledAsyncException { property, error } => {
                Some(ChildEvent::UnhandledException {
                    source,
                    property,
                    error,
                })
            }
            ObjectEvent::PropertyChanging { .. } | ObjectEvent::ValidationComplete => None,
        }
    }

    pub(crate) fn receive_child_event(&self, event: ChildEvent) {
        self.emit(ObjectEvent::ChildChanged(event));
    }

    /// Surface a failure of background work nobody is awaiting.
    pub(crate) fn report_unhandled(&self, property: Option<String>, error: FrameworkError) {
        warn!(
            type_name = %self.0.type_name,
            identity = self.identity(),
            property = ?property,
            error = %error,
            "Background work failed"
        );
        self.emit(ObjectEvent::UnhandledAsyncException {
            property: property.clone(),
            error: error.clone(),
        });
        bus::publish_unhandled(
            &self.0.context,
            &self.0.type_name,
            self.identity(),
            property,
            error,
        );
    }

    // === Idle waits ===

    async fn idle(&self) {
        busy::until_idle(&self.0.idle, || self.is_busy()).await;
    }

    /// Wait until the object and its children are idle, at most `timeout`.
    pub async fn wait_for_idle(&self, timeout: Duration) -> Result<(), FrameworkError> {
        busy::with_timeout(timeout, self.idle()).await
    }

    /// Wait until idle or until `signal` is cancelled.
    pub async fn wait_for_idle_until(
        &self,
        signal: &CancellationSignal,
    ) -> Result<(), FrameworkError> {
        busy::until_cancelled(signal, self.idle()).await
    }

    /// Wait with the configured default timeout.
    pub async fn wait_until_idle(&self) -> Result<(), FrameworkError> {
        self.wait_for_idle(self.0.context.config().idle.default_timeout())
            .await
    }
}

impl fmt::Debug for BusinessObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BusinessObject({}#{})", self.0.type_name, self.identity())
    }
}
