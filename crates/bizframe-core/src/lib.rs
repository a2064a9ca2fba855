//! # Bizframe Core - Business Object Lifecycle Engine
//!
//! Gives domain types a uniform lifecycle: managed properties with dirty
//! tracking, n-level undo, a priority-ordered rule engine (sync and async),
//! per-instance authorization, and parent/child graphs with bubbled
//! notifications.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     ApplicationContext                       │
//! │   PropertyRegistry │ RuleRegistry │ Principal │ EventBus     │
//! └──────────────────────────────────────────────────────────────┘
//!            ↑                  ↑                        ↑
//! ┌──────────────────┐  ┌───────────────┐   ┌────────────────────┐
//! │  BusinessObject  │──│ BusinessList  │   │  LocalDataPortal   │
//! │ fields │ undo    │  │ items│deleted │   │ ObjectPersistence  │
//! │ rules  │ busy    │  └───────────────┘   └────────────────────┘
//! └──────────────────┘
//! ```
//!
//! ## Defining a type
//!
//! A type implements [`BusinessType`]: it names itself, lists its managed
//! properties and registers rules once per context. Instances are created
//! with [`BusinessObject::new`] or [`BusinessObject::create`].
//!
//! ## Lifecycle
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | `set_property` | authorize, store dirty, run rules, notify |
//! | `load_property` | store clean, nothing else |
//! | `begin_edit` / `cancel_edit` / `apply_edit` | n-level undo across the graph |
//! | `check_rules` | run every rule of the type |
//! | `LocalDataPortal::save` | persist a root and clean the graph |

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod context;
pub mod domain;
pub mod object;
pub mod ports;
pub mod rules;

pub use adapters::LocalDataPortal;
pub use config::{ConfigError, FrameworkConfig, IdleConfig, NotificationConfig, RuleConfig};
pub use context::ApplicationContext;
pub use domain::{
    BrokenRule, BrokenRulesCollection, ChildEvent, FieldValue, ListChange, ListEvent,
    ObjectEvent, PropertyDefinition, PropertyDescriptor, PropertyKey, SubscriptionId, ValueKind,
};
pub use object::{
    BusinessList, BusinessObject, BypassGuard, CancellationSignal, FieldAccessor, GraphNode,
    RuleSuppressionGuard,
};
pub use ports::{BusinessType, NoHooks, ObjectHooks, ObjectPersistence};
pub use rules::{RuleResult, RuleSet, RuleSetBuilder};
pub use shared_types::{
    AuthorizationAction, FrameworkError, Principal, RuleSeverity, TypeName,
};
