//! # Test Fixtures
//!
//! Business types shared by the integration scenarios and benchmarks.
//!
//! | Type | Properties | Notable rules |
//! |------|------------|---------------|
//! | `Customer` | Name, Email, CreditLimit, Notes (lazy), Address, Orders | Required, RegexMatch, write auth on CreditLimit |
//! | `OrderLine` | Product, Quantity, Price, Total | Total computed from Quantity and Price |
//! | `Address` | City, Zip | Zip format |
//! | `Account` | Username | async availability check |

use bizframe_core::rules::{
    AsyncLambda, Dependency, IsInRole, Lambda, MaxLength, MaxValue, MinValue, RegexMatch,
    Required,
};
use bizframe_core::{
    ApplicationContext, AuthorizationAction, BusinessObject, BusinessType, FieldValue,
    FrameworkConfig, FrameworkError, GraphNode, ObjectHooks, PropertyDefinition, RuleSetBuilder,
    TypeName,
};
use bizframe_telemetry::log_rule_event;
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Usernames the `Account` availability check treats as taken.
pub const TAKEN_USERNAMES: [&str; 2] = ["admin", "root"];

pub fn context() -> Arc<ApplicationContext> {
    bizframe_telemetry::init_for_tests();
    Arc::new(ApplicationContext::default())
}

pub fn context_with(config: FrameworkConfig) -> Arc<ApplicationContext> {
    bizframe_telemetry::init_for_tests();
    Arc::new(ApplicationContext::new(config).expect("valid test configuration"))
}

// =============================================================================
// CUSTOMER
// =============================================================================

/// Records every hook call as `"<hook> <detail>"`.
#[derive(Default)]
pub struct RecordingHooks {
    calls: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl ObjectHooks for RecordingHooks {
    fn on_child_edit_applied(&self, _parent: &BusinessObject, child: &BusinessObject) {
        self.record(format!("edit_applied {}", child.type_name()));
    }

    fn on_child_attached(&self, _parent: &BusinessObject, child: &GraphNode) {
        self.record(format!("attached {}", node_kind(child)));
    }

    fn on_child_detached(&self, _parent: &BusinessObject, child: &GraphNode) {
        self.record(format!("detached {}", node_kind(child)));
    }

    fn on_property_changed(&self, _object: &BusinessObject, property: &str) {
        self.record(format!("changed {property}"));
    }

    fn on_deleted(&self, object: &BusinessObject) {
        self.record(format!("deleted {}", object.type_name()));
    }
}

fn node_kind(node: &GraphNode) -> String {
    match node {
        GraphNode::Object(object) => object.type_name().to_string(),
        GraphNode::List(_) => "list".to_string(),
    }
}

#[derive(Default)]
pub struct Customer {
    pub hooks: RecordingHooks,
}

impl BusinessType for Customer {
    fn type_name(&self) -> TypeName {
        TypeName::new("Customer")
    }

    fn properties(&self) -> Vec<PropertyDefinition> {
        vec![
            PropertyDefinition::text("Name").with_friendly_name("Customer name"),
            PropertyDefinition::text("Email"),
            PropertyDefinition::int("CreditLimit").with_default(1_000),
            PropertyDefinition::text("Notes").lazy(),
            PropertyDefinition::child("Address"),
            PropertyDefinition::child_list("Orders"),
        ]
    }

    fn add_business_rules(&self, rules: &mut RuleSetBuilder<'_>) -> Result<(), FrameworkError> {
        rules
            .add_rule(Required::new("Name"))?
            .add_rule(MaxLength::new("Name", 40))?
            .add_rule(RegexMatch::new("Email", r"^[^@\s]+@[^@\s]+\.[a-z]+$")?)?
            .add_rule(MinValue::new("CreditLimit", 0))?
            .add_rule(MaxValue::new("CreditLimit", 100_000))?
            .add_authorization_rule(IsInRole::new(
                AuthorizationAction::WriteProperty,
                Some("CreditLimit"),
                ["Manager"],
            ))?
            .add_authorization_rule(IsInRole::new(
                AuthorizationAction::DeleteObject,
                None,
                ["Manager"],
            ))?;
        Ok(())
    }

    fn hooks(&self) -> &dyn ObjectHooks {
        &self.hooks
    }
}

pub fn customer(ctx: &Arc<ApplicationContext>) -> BusinessObject {
    BusinessObject::new(Arc::new(Customer::default()), ctx).expect("customer")
}

/// A customer plus a handle on the hooks it reports to.
pub fn customer_with_hooks(ctx: &Arc<ApplicationContext>) -> (BusinessObject, Arc<Customer>) {
    let definition = Arc::new(Customer::default());
    let object = BusinessObject::new(definition.clone(), ctx).expect("customer");
    (object, definition)
}

// =============================================================================
// ORDER LINE
// =============================================================================

pub struct OrderLine;

impl BusinessType for OrderLine {
    fn type_name(&self) -> TypeName {
        TypeName::new("OrderLine")
    }

    fn properties(&self) -> Vec<PropertyDefinition> {
        vec![
            PropertyDefinition::text("Product"),
            PropertyDefinition::int("Quantity").with_default(1),
            PropertyDefinition::int("Price"),
            PropertyDefinition::int("Total"),
        ]
    }

    fn add_business_rules(&self, rules: &mut RuleSetBuilder<'_>) -> Result<(), FrameworkError> {
        rules
            .add_rule(Required::new("Product"))?
            .add_rule(MinValue::new("Quantity", 1))?
            .add_rule(Dependency::new("Price", ["Quantity"]))?
            .add_rule(
                Lambda::new(Some("Quantity"), |c| {
                    let quantity = c.input("Quantity").and_then(FieldValue::as_int);
                    let price = c.input("Price").and_then(FieldValue::as_int);
                    if let (Some(quantity), Some(price)) = (quantity, price) {
                        c.add_output_value("Total", quantity * price);
                    }
                })
                .with_info(|i| i.with_inputs(["Quantity", "Price"]).affects(["Total"])),
            )?;
        Ok(())
    }
}

pub fn order_line(ctx: &Arc<ApplicationContext>, product: &str, quantity: i64) -> BusinessObject {
    let line = BusinessObject::new(Arc::new(OrderLine), ctx).expect("order line");
    line.load_property("Product", product).expect("product");
    line.load_property("Quantity", quantity).expect("quantity");
    line
}

// =============================================================================
// ADDRESS
// =============================================================================

pub struct Address;

impl BusinessType for Address {
    fn type_name(&self) -> TypeName {
        TypeName::new("Address")
    }

    fn properties(&self) -> Vec<PropertyDefinition> {
        vec![
            PropertyDefinition::text("City"),
            PropertyDefinition::text("Zip"),
        ]
    }

    fn add_business_rules(&self, rules: &mut RuleSetBuilder<'_>) -> Result<(), FrameworkError> {
        rules.add_rule(
            RegexMatch::new("Zip", r"^\d{5}$")?.with_message("Zip must have five digits"),
        )?;
        Ok(())
    }
}

pub fn address(ctx: &Arc<ApplicationContext>) -> BusinessObject {
    BusinessObject::new(Arc::new(Address), ctx).expect("address")
}

// =============================================================================
// ACCOUNT
// =============================================================================

pub struct Account;

impl BusinessType for Account {
    fn type_name(&self) -> TypeName {
        TypeName::new("Account")
    }

    fn properties(&self) -> Vec<PropertyDefinition> {
        vec![PropertyDefinition::text("Username")]
    }

    fn add_business_rules(&self, rules: &mut RuleSetBuilder<'_>) -> Result<(), FrameworkError> {
        rules
            .add_rule(Required::new("Username"))?
            .add_async_rule(
                AsyncLambda::new(Some("Username"), |mut c| {
                    async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        let name = c.primary_value().to_string();
                        let taken = TAKEN_USERNAMES.contains(&name.as_str());
                        log_rule_event!(debug, "Username checked", "Account", c.rule_name(), taken);
                        if taken {
                            c.add_error(format!("{name} is taken"));
                        }
                        c
                    }
                    .boxed()
                })
                .with_info(|i| i.with_priority(1)),
            )?;
        Ok(())
    }
}

pub fn account(ctx: &Arc<ApplicationContext>) -> BusinessObject {
    BusinessObject::new(Arc::new(Account), ctx).expect("account")
}
