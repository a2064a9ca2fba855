//! # Business Rules
//!
//! Rule ordering, computed outputs, dependencies and severities on the
//! fixture types.

#[cfg(test)]
mod tests {
    use crate::fixtures::{context, customer, order_line};
    use bizframe_core::rules::{Lambda, Required};
    use bizframe_core::{
        BusinessObject, BusinessType, FieldValue, FrameworkError, ObjectEvent,
        PropertyDefinition, RuleSetBuilder, RuleSeverity, TypeName,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn changed_properties(object: &BusinessObject) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        object.subscribe(move |e| {
            if let ObjectEvent::PropertyChanged { property } = e {
                sink.lock().push(property.clone());
            }
        });
        seen
    }

    // =========================================================================
    // COMPUTED VALUES
    // =========================================================================

    #[test]
    fn test_price_change_recomputes_total() {
        let ctx = context();
        let line = order_line(&ctx, "Anvil", 2);
        let seen = changed_properties(&line);

        line.set_property("Price", 10).unwrap();
        assert_eq!(line.read_property("Total").unwrap(), FieldValue::from(20));
        assert_eq!(*seen.lock(), vec!["Price", "Quantity", "Total"]);
        assert!(line.is_valid());
    }

    #[test]
    fn test_quantity_change_recomputes_total() {
        let ctx = context();
        let line = order_line(&ctx, "Anvil", 2);
        line.load_property("Price", 7).unwrap();
        let seen = changed_properties(&line);

        line.set_property("Quantity", 3).unwrap();
        assert_eq!(line.read_property("Total").unwrap(), FieldValue::from(21));
        assert_eq!(*seen.lock(), vec!["Quantity", "Total"]);
    }

    #[test]
    fn test_rule_output_marks_field_dirty() {
        let ctx = context();
        let line = order_line(&ctx, "Anvil", 2);
        line.mark_old();
        line.set_property("Price", 4).unwrap();
        assert!(line.is_self_dirty());
        assert_eq!(line.read_property("Total").unwrap(), FieldValue::from(8));
    }

    #[test]
    fn test_zero_quantity_is_broken() {
        let ctx = context();
        let line = order_line(&ctx, "Anvil", 2);
        line.set_property("Quantity", 0).unwrap();
        assert!(!line.is_valid());
        assert_eq!(
            line.first_broken_rule("Quantity").unwrap().description(),
            "Quantity must be at least 1"
        );

        line.set_property("Quantity", 1).unwrap();
        assert!(line.is_valid());
    }

    // =========================================================================
    // TEXT RULES
    // =========================================================================

    #[test]
    fn test_email_format() {
        let ctx = context();
        let c = customer(&ctx);
        c.set_property("Email", "not-an-address").unwrap();
        let broken = c.first_broken_rule("Email").unwrap();
        assert_eq!(broken.description(), "Email value is invalid");
        assert_eq!(broken.rule_name(), "rule://Customer/RegexMatch/Email");
        assert_eq!(broken.property(), Some("Email"));

        c.set_property("Email", "").unwrap();
        assert!(c.first_broken_rule("Email").is_none());
    }

    #[test]
    fn test_name_length_uses_friendly_name() {
        let ctx = context();
        let c = customer(&ctx);
        c.set_property("Name", "x".repeat(41)).unwrap();
        assert_eq!(c.broken_rules_for("Name").len(), 1);
        assert!(c
            .first_broken_rule("Name")
            .unwrap()
            .description()
            .starts_with("Customer name"));
    }

    #[test]
    fn test_rule_names_follow_registration() {
        let ctx = context();
        let c = customer(&ctx);
        let names: Vec<String> = c
            .rule_set()
            .iter()
            .map(|rule| rule.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "rule://Customer/Required/Name",
                "rule://Customer/MaxLength/Name",
                "rule://Customer/RegexMatch/Email",
                "rule://Customer/MinValue/CreditLimit",
                "rule://Customer/MaxValue/CreditLimit",
            ]
        );
        assert_eq!(c.rule_set().authorization_len(), 2);
    }

    // =========================================================================
    // SEVERITIES AND MISCONFIGURATION
    // =========================================================================

    struct Invoice;

    impl BusinessType for Invoice {
        fn type_name(&self) -> TypeName {
            TypeName::new("Invoice")
        }

        fn properties(&self) -> Vec<PropertyDefinition> {
            vec![
                PropertyDefinition::int("Amount"),
                PropertyDefinition::text("Memo"),
                PropertyDefinition::text("Code"),
            ]
        }

        fn add_business_rules(&self, rules: &mut RuleSetBuilder<'_>) -> Result<(), FrameworkError> {
            rules
                .add_rule(Lambda::new(Some("Amount"), |c| {
                    if c.primary_value().as_int().unwrap_or(0) > 500 {
                        c.add_warning("Large invoice");
                    }
                }))?
                .add_rule(Lambda::new(Some("Memo"), |c| {
                    if c.primary_value().is_empty() {
                        c.add_information("Memo is empty");
                    }
                }))?
                .add_rule(Required::new("Code"))?
                .add_rule(Lambda::new(Some("Code"), |c| {
                    if c.primary_value().to_string() == "BAD" {
                        c.add_error("");
                    }
                }))?;
            Ok(())
        }
    }

    fn invoice(ctx: &Arc<bizframe_core::ApplicationContext>) -> BusinessObject {
        BusinessObject::new(Arc::new(Invoice), ctx).unwrap()
    }

    #[test]
    fn test_warnings_do_not_block_validity() {
        let ctx = context();
        let i = invoice(&ctx);
        i.set_property("Code", "INV-1").unwrap();
        i.set_property("Amount", 900).unwrap();
        i.check_property_rules("Memo").unwrap();

        let broken = i.broken_rules();
        assert_eq!(broken.count(RuleSeverity::Warning), 1);
        assert_eq!(broken.count(RuleSeverity::Information), 1);
        assert_eq!(broken.error_count(), 0);
        assert!(i.is_valid());
    }

    #[test]
    fn test_error_without_description_is_a_configuration_error() {
        let ctx = context();
        let i = invoice(&ctx);
        assert!(matches!(
            i.set_property("Code", "BAD"),
            Err(FrameworkError::RuleConfiguration { .. })
        ));
    }

    #[test]
    fn test_lambda_names_carry_their_property() {
        let ctx = context();
        let i = invoice(&ctx);
        let lambdas: Vec<String> = i
            .rule_set()
            .iter()
            .map(|rule| rule.name().to_string())
            .filter(|name| name.contains("/Lambda/"))
            .collect();
        assert_eq!(
            lambdas,
            vec![
                "rule://Invoice/Lambda/Amount",
                "rule://Invoice/Lambda/Memo",
                "rule://Invoice/Lambda/Code",
            ]
        );
    }

    // =========================================================================
    // GUARDS AND REGISTRY
    // =========================================================================

    #[test]
    fn test_suppressed_rules_run_later() {
        let ctx = context();
        let c = customer(&ctx);
        {
            let _quiet = c.suppress_rule_checking();
            c.set_property("Email", "nope").unwrap();
            assert!(c.is_valid());
        }
        c.check_rules().unwrap();
        assert!(c.first_broken_rule("Email").is_some());
        assert!(c.first_broken_rule("Name").is_some());
    }

    #[test]
    fn test_bypass_skips_authorization_and_rules() {
        let ctx = context();
        let c = customer(&ctx);
        let seen = changed_properties(&c);
        {
            let _bypass = c.bypass_property_checks();
            c.set_property("CreditLimit", 250_000).unwrap();
        }
        assert_eq!(c.read_property("CreditLimit").unwrap(), FieldValue::from(250_000));
        assert!(c.is_valid());
        assert!(seen.lock().is_empty());

        c.check_rules().unwrap();
        assert!(c.first_broken_rule("CreditLimit").is_some());
    }

    #[test]
    fn test_evicted_type_registers_again() {
        let ctx = context();
        let first = customer(&ctx);
        let type_name = first.type_name().clone();
        assert!(ctx.evict(&type_name));
        assert!(!ctx.rules().is_initialized(&type_name));

        let second = customer(&ctx);
        assert!(ctx.rules().is_initialized(&type_name));
        assert_eq!(second.rule_set().len(), first.rule_set().len());
    }
}
