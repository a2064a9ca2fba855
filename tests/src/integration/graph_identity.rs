//! # Graph and Identity
//!
//! Parent links, identity allocation, aggregated status and notification
//! bubbling through objects and lists.

#[cfg(test)]
mod tests {
    use crate::fixtures::{address, context, customer, order_line};
    use bizframe_core::{BusinessList, ChildEvent, GraphNode, ListChange, ObjectEvent};
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;

    // =============================================================================
    // IDENTITY
    // =============================================================================

    #[test]
    fn test_identities_unique_and_increasing() {
        let ctx = context();
        let c = customer(&ctx);
        let orders = BusinessList::new(&ctx);
        c.set_property("Orders", orders.clone()).unwrap();

        let mut seen = vec![c.identity(), orders.identity()];
        for i in 0..5 {
            let line = order_line(&ctx, &format!("P{i}"), 1);
            orders.add(line.clone()).unwrap();
            assert!(line.identity() > *seen.last().unwrap());
            seen.push(line.identity());
        }
        let unique: HashSet<_> = seen.iter().copied().collect();
        assert_eq!(unique.len(), seen.len());
    }

    #[test]
    fn test_attached_subtree_reidentified_from_new_root() {
        let ctx = context();
        let c = customer(&ctx);
        c.set_property("Address", address(&ctx)).unwrap();

        let detached = BusinessList::new(&ctx);
        let line = order_line(&ctx, "Bolt", 1);
        detached.add(line.clone()).unwrap();
        assert_eq!(detached.identity(), 1);
        assert_eq!(line.identity(), 2);

        c.set_property("Orders", detached.clone()).unwrap();
        let root_address = c.child("Address").unwrap().unwrap();
        assert!(detached.identity() > root_address.identity());
        assert!(line.identity() > detached.identity());
    }

    #[test]
    fn test_detach_keeps_identity() {
        let ctx = context();
        let c = customer(&ctx);
        let home = address(&ctx);
        c.set_property("Address", home.clone()).unwrap();
        let identity = home.identity();
        c.set_property("Address", bizframe_core::FieldValue::Null).unwrap();
        assert!(home.parent().is_none());
        assert_eq!(home.identity(), identity);
    }

    fn assert_unique(identities: &[i32]) {
        let unique: HashSet<_> = identities.iter().copied().collect();
        assert_eq!(unique.len(), identities.len(), "duplicate identity in {identities:?}");
    }

    #[test]
    fn test_detached_subtree_issues_past_its_descendants() {
        let ctx = context();
        let c = customer(&ctx);
        let orders = BusinessList::new(&ctx);
        c.set_property("Orders", orders.clone()).unwrap();
        let first = order_line(&ctx, "Bolt", 1);
        orders.add(first.clone()).unwrap();
        assert!(first.identity() > orders.identity());

        c.set_property("Orders", bizframe_core::FieldValue::Null).unwrap();
        assert!(orders.parent().is_none());

        let second = order_line(&ctx, "Nut", 1);
        orders.add(second.clone()).unwrap();
        assert!(second.identity() > first.identity());
        assert_unique(&[orders.identity(), first.identity(), second.identity()]);

        let other = customer(&ctx);
        other.set_property("Address", address(&ctx)).unwrap();
        other.set_property("Orders", orders.clone()).unwrap();
        let third = order_line(&ctx, "Gear", 1);
        orders.add(third.clone()).unwrap();
        let home = other.child("Address").unwrap().unwrap();
        assert_unique(&[
            other.identity(),
            home.identity(),
            orders.identity(),
            first.identity(),
            second.identity(),
            third.identity(),
        ]);
    }

    // =============================================================================
    // AGGREGATED STATUS
    // =============================================================================

    #[test]
    fn test_validity_and_dirtiness_aggregate_over_children() {
        let ctx = context();
        let c = customer(&ctx);
        c.set_property("Name", "Acme").unwrap();
        c.mark_old();
        let home = address(&ctx);
        home.mark_old();
        c.load_property("Address", home.clone()).unwrap();
        assert!(c.is_valid());
        assert!(!c.is_dirty());

        home.set_property("Zip", "12ab").unwrap();
        assert!(c.is_self_valid());
        assert!(!c.is_valid());
        assert!(!c.is_self_dirty());
        assert!(c.is_dirty());

        home.set_property("Zip", "12345").unwrap();
        assert!(c.is_valid());
    }

    #[test]
    fn test_deleted_persisted_line_makes_parent_dirty() {
        let ctx = context();
        let c = customer(&ctx);
        let orders = BusinessList::new(&ctx);
        c.load_property("Orders", orders.clone()).unwrap();
        let line = order_line(&ctx, "Nut", 4);
        line.mark_old();
        orders.add(line.clone()).unwrap();
        c.mark_old();
        assert!(!c.is_dirty());

        orders.remove(&line);
        assert!(line.is_deleted());
        assert!(c.is_dirty());
    }

    // =============================================================================
    // BUBBLING
    // =============================================================================

    #[test]
    fn test_grandchild_change_reaches_root_with_source() {
        let ctx = context();
        let c = customer(&ctx);
        let orders = BusinessList::new(&ctx);
        c.set_property("Orders", orders.clone()).unwrap();
        let line = order_line(&ctx, "Gear", 1);
        orders.add(line.clone()).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        c.subscribe(move |e| {
            if let ObjectEvent::ChildChanged(child) = e {
                sink.lock().push(child.clone());
            }
        });

        line.set_property("Quantity", 9).unwrap();
        let events = seen.lock();
        assert!(events.iter().any(|e| matches!(
            e,
            ChildEvent::PropertyChanged { source: GraphNode::Object(source), property: Some(p) }
                if source.ptr_eq(&line) && p == "Quantity"
        )));
    }

    #[test]
    fn test_list_structure_changes_bubble() {
        let ctx = context();
        let c = customer(&ctx);
        let orders = BusinessList::new(&ctx);
        c.set_property("Orders", orders.clone()).unwrap();

        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        c.subscribe(move |e| {
            if let ObjectEvent::ChildChanged(ChildEvent::ListChanged { change, .. }) = e {
                sink.lock().push(change.clone());
            }
        });

        let line = order_line(&ctx, "Cog", 1);
        orders.add(line.clone()).unwrap();
        orders.remove_at(0).unwrap();
        assert_eq!(
            *changes.lock(),
            vec![
                ListChange::ItemAdded { index: 0 },
                ListChange::ItemRemoved { index: 0 }
            ]
        );
    }

    #[test]
    fn test_detached_child_stops_bubbling() {
        let ctx = context();
        let c = customer(&ctx);
        let home = address(&ctx);
        c.set_property("Address", home.clone()).unwrap();
        c.set_property("Address", bizframe_core::FieldValue::Null).unwrap();

        let count = Arc::new(Mutex::new(0usize));
        let sink = count.clone();
        c.subscribe(move |e| {
            if matches!(e, ObjectEvent::ChildChanged(_)) {
                *sink.lock() += 1;
            }
        });
        home.set_property("City", "Lyon").unwrap();
        assert_eq!(*count.lock(), 0);
    }

    #[test]
    fn test_dropping_root_frees_graph() {
        let ctx = context();
        let c = customer(&ctx);
        let home = address(&ctx);
        c.set_property("Address", home.clone()).unwrap();
        drop(c);
        assert!(home.parent().is_none());
    }
}
