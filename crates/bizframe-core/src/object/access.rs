//! Per-instance authorization checks.
//!
//! Property and method answers are cached per instance and principal; the
//! cache resets when the context's principal is replaced.

use super::business_object::BusinessObject;
use crate::rules::AuthorizationContext;
use shared_types::{AuthorizationAction, FrameworkError};

impl BusinessObject {
    #[must_use]
    pub fn can_read_property(&self, property: &str) -> bool {
        self.check_member(AuthorizationAction::ReadProperty, property)
    }

    #[must_use]
    pub fn can_write_property(&self, property: &str) -> bool {
        self.check_member(AuthorizationAction::WriteProperty, property)
    }

    #[must_use]
    pub fn can_execute_method(&self, method: &str) -> bool {
        self.check_member(AuthorizationAction::ExecuteMethod, method)
    }

    /// Fail with `Authorization` unless the principal may run `method`.
    pub fn authorize_method(&self, method: &str) -> Result<(), FrameworkError> {
        if self.can_execute_method(method) {
            Ok(())
        } else {
            Err(FrameworkError::Authorization {
                action: AuthorizationAction::ExecuteMethod,
                target: format!("{}.{method}", self.type_name()),
            })
        }
    }

    /// Object-level permission (create, get, edit, delete) for this instance.
    #[must_use]
    pub fn has_permission(&self, action: AuthorizationAction) -> bool {
        if self.is_bypassing() {
            return true;
        }
        let Some(rule) = self.cell().rules.authorization_rule(action, None) else {
            return true;
        };
        let principal = self.context().principal();
        rule.execute(&AuthorizationContext {
            principal: &principal,
            type_name: self.type_name(),
            target: Some(self),
        })
    }

    fn check_member(&self, action: AuthorizationAction, element: &str) -> bool {
        if self.is_bypassing() {
            return true;
        }
        let Some(rule) = self.cell().rules.authorization_rule(action, Some(element)) else {
            return true;
        };
        let principal = self.context().principal();
        let cacheable = rule.cache_result();
        if cacheable {
            if let Some(allowed) = self.state().auth_cache.get(&principal, action, element) {
                return allowed;
            }
        }

        let allowed = rule.execute(&AuthorizationContext {
            principal: &principal,
            type_name: self.type_name(),
            target: Some(self),
        });
        if cacheable {
            self.state()
                .auth_cache
                .insert(&principal, action, element, allowed);
        }
        allowed
    }
}
