//! # Authorization
//!
//! Member and object permissions as seen by the application.

#[cfg(test)]
mod tests {
    use crate::fixtures::{context, customer};
    use bizframe_core::rules::AuthorizationLambda;
    use bizframe_core::{
        AuthorizationAction, BusinessObject, BusinessType, FieldValue, FrameworkError,
        PropertyDefinition, Principal, RuleSetBuilder, TypeName,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn manager() -> Principal {
        Principal::new("mia", ["Manager"])
    }

    // =========================================================================
    // PROPERTY ACCESS
    // =========================================================================

    #[test]
    fn test_denied_write_is_ignored() {
        let ctx = context();
        let c = customer(&ctx);
        c.mark_old();
        assert!(c.can_read_property("CreditLimit"));
        assert!(!c.can_write_property("CreditLimit"));

        c.set_property("CreditLimit", 50_000).unwrap();
        assert_eq!(c.get_property("CreditLimit").unwrap(), FieldValue::from(1_000));
        assert!(!c.is_self_dirty());
    }

    #[test]
    fn test_try_set_reports_target() {
        let ctx = context();
        let c = customer(&ctx);
        assert_eq!(
            c.try_set_property("CreditLimit", 50_000),
            Err(FrameworkError::Authorization {
                action: AuthorizationAction::WriteProperty,
                target: "Customer.CreditLimit".into(),
            })
        );
    }

    #[test]
    fn test_manager_may_raise_limit() {
        let ctx = context();
        ctx.set_principal(manager());
        let c = customer(&ctx);
        c.mark_old();
        c.try_set_property("CreditLimit", 50_000).unwrap();
        assert_eq!(c.get_property("CreditLimit").unwrap(), FieldValue::from(50_000));
        assert!(c.is_self_dirty());
    }

    #[test]
    fn test_principal_change_invalidates_cached_answer() {
        let ctx = context();
        let c = customer(&ctx);
        assert!(!c.can_write_property("CreditLimit"));

        ctx.set_principal(manager());
        assert!(c.can_write_property("CreditLimit"));

        ctx.set_principal(Principal::anonymous());
        assert!(!c.can_write_property("CreditLimit"));
    }

    #[test]
    fn test_unruled_members_are_open() {
        let ctx = context();
        let c = customer(&ctx);
        assert!(c.can_write_property("Name"));
        assert!(c.can_execute_method("Recalculate"));
        assert!(c.authorize_method("Recalculate").is_ok());
    }

    // =========================================================================
    // OBJECT PERMISSIONS
    // =========================================================================

    #[test]
    fn test_type_permission_follows_principal() {
        let ctx = context();
        let customer_type = TypeName::new("Customer");
        // No instance yet, so no rules are known.
        assert!(ctx.has_permission(&customer_type, AuthorizationAction::DeleteObject));

        let _c = customer(&ctx);
        assert!(!ctx.has_permission(&customer_type, AuthorizationAction::DeleteObject));
        assert!(ctx.has_permission(&customer_type, AuthorizationAction::GetObject));

        ctx.set_principal(manager());
        assert!(ctx.has_permission(&customer_type, AuthorizationAction::DeleteObject));
    }

    struct Ledger {
        checks: Arc<AtomicUsize>,
    }

    impl BusinessType for Ledger {
        fn type_name(&self) -> TypeName {
            TypeName::new("Ledger")
        }

        fn properties(&self) -> Vec<PropertyDefinition> {
            vec![PropertyDefinition::int("Balance")]
        }

        fn add_business_rules(&self, rules: &mut RuleSetBuilder<'_>) -> Result<(), FrameworkError> {
            let checks = self.checks.clone();
            rules.add_authorization_rule(
                AuthorizationLambda::new(AuthorizationAction::ExecuteMethod, Some("Close"), move |c| {
                    checks.fetch_add(1, Ordering::SeqCst);
                    c.principal.is_authenticated()
                })
                .without_caching(),
            )?;
            Ok(())
        }
    }

    #[test]
    fn test_uncached_rule_runs_every_time() {
        let ctx = context();
        let checks = Arc::new(AtomicUsize::new(0));
        let ledger = BusinessObject::new(
            Arc::new(Ledger {
                checks: checks.clone(),
            }),
            &ctx,
        )
        .unwrap();

        assert!(matches!(
            ledger.authorize_method("Close"),
            Err(FrameworkError::Authorization {
                action: AuthorizationAction::ExecuteMethod,
                ..
            })
        ));
        assert!(!ledger.can_execute_method("Close"));
        ctx.set_principal(Principal::new("auditor", Vec::<String>::new()));
        assert!(ledger.can_execute_method("Close"));
        assert_eq!(checks.load(Ordering::SeqCst), 3);
    }
}
