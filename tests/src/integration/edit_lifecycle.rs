//! # Edit Lifecycle
//!
//! Dirty tracking and n-level undo across a customer graph.

#[cfg(test)]
mod tests {
    use crate::fixtures::{address, context, customer, customer_with_hooks, order_line};
    use bizframe_core::{BusinessList, FieldValue, ObjectEvent};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn text(value: &str) -> FieldValue {
        FieldValue::from(value)
    }

    // =============================================================================
    // DIRTY TRACKING
    // =============================================================================

    #[test]
    fn test_load_then_read_is_clean() {
        let ctx = context();
        let c = customer(&ctx);
        c.mark_old();
        c.load_property("Name", "Acme").unwrap();
        assert_eq!(c.get_property("Name").unwrap(), text("Acme"));
        assert!(!c.is_dirty());
    }

    #[test]
    fn test_same_value_write_is_silent() {
        let ctx = context();
        let c = customer(&ctx);
        c.load_property("Name", "Acme").unwrap();
        c.mark_old();

        let events = Arc::new(Mutex::new(0usize));
        let sink = events.clone();
        c.subscribe(move |e| {
            if matches!(e, ObjectEvent::PropertyChanged { .. }) {
                *sink.lock() += 1;
            }
        });

        c.set_property("Name", "Acme").unwrap();
        assert!(!c.is_dirty());
        assert_eq!(*events.lock(), 0);

        c.set_property("Name", "Acme Ltd").unwrap();
        assert!(c.is_dirty());
        assert_eq!(*events.lock(), 1);
    }

    #[test]
    fn test_null_text_becomes_empty_and_dirty() {
        let ctx = context();
        let c = customer(&ctx);
        c.load_property("Name", "Acme").unwrap();
        c.mark_old();
        c.set_property("Name", FieldValue::Null).unwrap();
        assert_eq!(c.read_property("Name").unwrap(), text(""));
        assert!(c.is_dirty());
        assert_eq!(
            c.first_broken_rule("Name").unwrap().description(),
            "Customer name required"
        );
    }

    // =============================================================================
    // N-LEVEL UNDO
    // =============================================================================

    #[test]
    fn test_two_level_cancel_restores_graph() {
        let ctx = context();
        let c = customer(&ctx);
        let home = address(&ctx);
        home.load_property("City", "Oslo").unwrap();
        c.load_property("Address", home.clone()).unwrap();
        c.mark_old();
        home.mark_old();

        c.begin_edit().unwrap();
        home.set_property("City", "Bergen").unwrap();
        c.begin_edit().unwrap();
        home.set_property("City", "Tromsø").unwrap();
        c.set_property("Name", "Changed").unwrap();
        assert_eq!(home.edit_level(), 2);

        c.cancel_edit();
        assert_eq!(home.read_property("City").unwrap(), text("Bergen"));
        c.cancel_edit();
        assert_eq!(home.read_property("City").unwrap(), text("Oslo"));
        assert_eq!(c.read_property("Name").unwrap(), text(""));
        assert!(!c.is_dirty());
    }

    #[test]
    fn test_begin_a_begin_b_cancel_apply_keeps_a() {
        let ctx = context();
        let c = customer(&ctx);
        c.begin_edit().unwrap();
        c.set_property("Name", "A").unwrap();
        c.begin_edit().unwrap();
        c.set_property("Name", "B").unwrap();
        c.cancel_edit();
        c.apply_edit();
        assert_eq!(c.read_property("Name").unwrap(), text("A"));
        assert_eq!(c.edit_level(), 0);
    }

    #[test]
    fn test_cancel_restores_broken_rules() {
        let ctx = context();
        let c = customer(&ctx);
        c.set_property("Name", "Acme").unwrap();
        assert!(c.is_valid());

        c.begin_edit().unwrap();
        c.set_property("Name", "").unwrap();
        assert!(!c.is_valid());
        c.cancel_edit();
        assert!(c.is_valid());
    }

    #[test]
    fn test_new_line_cancelled_to_origin_leaves_collection() {
        let ctx = context();
        let c = customer(&ctx);
        let orders = BusinessList::new(&ctx);
        c.set_property("Orders", orders.clone()).unwrap();

        let line = order_line(&ctx, "Widget", 2);
        orders.add(line.clone()).unwrap();
        line.begin_edit().unwrap();
        line.set_property("Quantity", 5).unwrap();
        line.cancel_edit();

        assert!(orders.is_empty());
        assert!(orders.deleted_items().is_empty());
        assert!(line.parent().is_none());
    }

    #[test]
    fn test_apply_on_child_notifies_owner() {
        let ctx = context();
        let (c, definition) = customer_with_hooks(&ctx);
        let orders = BusinessList::new(&ctx);
        c.set_property("Orders", orders.clone()).unwrap();
        let line = order_line(&ctx, "Widget", 1);
        orders.add(line.clone()).unwrap();

        line.begin_edit().unwrap();
        line.set_property("Quantity", 3).unwrap();
        line.apply_edit();

        let calls = definition.hooks.calls();
        assert!(calls.contains(&"attached list".to_string()));
        assert!(calls.contains(&"edit_applied OrderLine".to_string()));
    }

    #[test]
    fn test_detached_child_reported_to_hooks() {
        let ctx = context();
        let (c, definition) = customer_with_hooks(&ctx);
        let first = address(&ctx);
        c.set_property("Address", first).unwrap();
        c.set_property("Address", address(&ctx)).unwrap();

        let calls = definition.hooks.calls();
        assert_eq!(
            calls
                .iter()
                .filter(|call| call.as_str() == "attached Address")
                .count(),
            2
        );
        assert!(calls.contains(&"detached Address".to_string()));
        assert!(calls.contains(&"changed Address".to_string()));
    }
}
