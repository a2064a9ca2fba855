//! # Authorization Rules
//!
//! Per-type rules deciding whether the active principal may read or write a
//! property, execute a method, or create/fetch/edit/delete an object. A type
//! has at most one rule per (action, element); no rule means allowed.
//!
//! Instance checks are cached per object and the cache is dropped as soon as
//! the active principal is a different `Arc`.

use crate::object::BusinessObject;
use shared_types::{AuthorizationAction, Principal, TypeName};
use std::collections::HashMap;
use std::sync::Arc;

/// What an authorization rule is evaluated against.
pub struct AuthorizationContext<'a> {
    pub principal: &'a Principal,
    pub type_name: &'a TypeName,
    /// The instance, for property and method checks.
    pub target: Option<&'a BusinessObject>,
}

/// An authorization rule.
pub trait AuthorizationRule: Send + Sync {
    fn action(&self) -> AuthorizationAction;

    /// Property or method governed; `None` for object-level actions.
    fn element(&self) -> Option<&str>;

    /// Whether instances may cache the answer for the current principal.
    fn cache_result(&self) -> bool {
        true
    }

    fn execute(&self, context: &AuthorizationContext<'_>) -> bool;
}

/// Allowed when the principal holds any of the roles.
#[derive(Debug, Clone)]
pub struct IsInRole {
    action: AuthorizationAction,
    element: Option<String>,
    roles: Vec<String>,
}

impl IsInRole {
    pub fn new<I, S>(action: AuthorizationAction, element: Option<&str>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action,
            element: element.map(str::to_string),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

impl AuthorizationRule for IsInRole {
    fn action(&self) -> AuthorizationAction {
        self.action
    }

    fn element(&self) -> Option<&str> {
        self.element.as_deref()
    }

    fn execute(&self, context: &AuthorizationContext<'_>) -> bool {
        context.principal.is_in_any_role(&self.roles)
    }
}

/// Denied when the principal holds any of the roles.
#[derive(Debug, Clone)]
pub struct IsNotInRole {
    action: AuthorizationAction,
    element: Option<String>,
    roles: Vec<String>,
}

impl IsNotInRole {
    pub fn new<I, S>(action: AuthorizationAction, element: Option<&str>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action,
            element: element.map(str::to_string),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

impl AuthorizationRule for IsNotInRole {
    fn action(&self) -> AuthorizationAction {
        self.action
    }

    fn element(&self) -> Option<&str> {
        self.element.as_deref()
    }

    fn execute(&self, context: &AuthorizationContext<'_>) -> bool {
        !context.principal.is_in_any_role(&self.roles)
    }
}

type AuthorizationFn = dyn Fn(&AuthorizationContext<'_>) -> bool + Send + Sync;

/// Closure-backed rule.
pub struct AuthorizationLambda {
    action: AuthorizationAction,
    element: Option<String>,
    cache: bool,
    check: Box<AuthorizationFn>,
}

impl AuthorizationLambda {
    pub fn new<F>(action: AuthorizationAction, element: Option<&str>, check: F) -> Self
    where
        F: Fn(&AuthorizationContext<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            action,
            element: element.map(str::to_string),
            cache: true,
            check: Box::new(check),
        }
    }

    /// Re-evaluate on every check.
    #[must_use]
    pub fn without_caching(mut self) -> Self {
        self.cache = false;
        self
    }
}

impl AuthorizationRule for AuthorizationLambda {
    fn action(&self) -> AuthorizationAction {
        self.action
    }

    fn element(&self) -> Option<&str> {
        self.element.as_deref()
    }

    fn cache_result(&self) -> bool {
        self.cache
    }

    fn execute(&self, context: &AuthorizationContext<'_>) -> bool {
        (self.check)(context)
    }
}

/// Per-instance memo of authorization answers for one principal.
#[derive(Default)]
pub struct AuthorizationCache {
    principal: Option<Arc<Principal>>,
    entries: HashMap<(AuthorizationAction, String), bool>,
}

impl AuthorizationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sync_principal(&mut self, principal: &Arc<Principal>) {
        let same = self
            .principal
            .as_ref()
            .is_some_and(|cached| Arc::ptr_eq(cached, principal));
        if !same {
            self.entries.clear();
            self.principal = Some(principal.clone());
        }
    }

    /// Cached answer, if the principal is the one the cache was built for.
    pub fn get(
        &mut self,
        principal: &Arc<Principal>,
        action: AuthorizationAction,
        element: &str,
    ) -> Option<bool> {
        self.sync_principal(principal);
        self.entries.get(&(action, element.to_string())).copied()
    }

    pub fn insert(
        &mut self,
        principal: &Arc<Principal>,
        action: AuthorizationAction,
        element: &str,
        allowed: bool,
    ) {
        self.sync_principal(principal);
        self.entries.insert((action, element.to_string()), allowed);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for AuthorizationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
