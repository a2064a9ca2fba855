//! # Managed Properties
//!
//! Reads, writes and n-level undo checked against a plain model of the
//! expected state.

#[cfg(test)]
mod tests {
    use crate::fixtures::{context, customer};
    use bizframe_core::{
        ApplicationContext, BusinessObject, BusinessType, FieldValue, FrameworkError,
        PropertyDefinition, TypeName,
    };
    use proptest::prelude::*;
    use std::sync::Arc;

    struct Note;

    impl BusinessType for Note {
        fn type_name(&self) -> TypeName {
            TypeName::new("Note")
        }

        fn properties(&self) -> Vec<PropertyDefinition> {
            vec![
                PropertyDefinition::text("Title"),
                PropertyDefinition::int("Count"),
            ]
        }
    }

    fn note(ctx: &Arc<ApplicationContext>) -> BusinessObject {
        let n = BusinessObject::new(Arc::new(Note), ctx).unwrap();
        n.mark_old();
        n
    }

    #[derive(Debug, Clone)]
    enum Op {
        SetTitle(String),
        SetCount(i64),
        Begin,
        Cancel,
        Apply,
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            "[a-c]{0,2}".prop_map(Op::SetTitle),
            (0i64..3).prop_map(Op::SetCount),
            Just(Op::Begin),
            Just(Op::Cancel),
            Just(Op::Apply),
        ]
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Model {
        title: String,
        count: i64,
        dirty: bool,
    }

    impl Model {
        fn observe(object: &BusinessObject) -> Self {
            Self {
                title: object.read_property("Title").unwrap().to_string(),
                count: object.read_property("Count").unwrap().as_int().unwrap(),
                dirty: object.is_self_dirty(),
            }
        }
    }

    proptest! {
        #[test]
        fn prop_undo_matches_model(ops in prop::collection::vec(arb_op(), 0..24)) {
            let ctx = context();
            let n = note(&ctx);
            let mut current = Model { title: String::new(), count: 0, dirty: false };
            let mut saved: Vec<Model> = Vec::new();

            for op in ops {
                match op {
                    Op::SetTitle(title) => {
                        n.set_property("Title", title.as_str()).unwrap();
                        if current.title != title {
                            current.title = title;
                            current.dirty = true;
                        }
                    }
                    Op::SetCount(count) => {
                        n.set_property("Count", count).unwrap();
                        if current.count != count {
                            current.count = count;
                            current.dirty = true;
                        }
                    }
                    Op::Begin => {
                        n.begin_edit().unwrap();
                        saved.push(current.clone());
                    }
                    Op::Cancel => {
                        n.cancel_edit();
                        if let Some(previous) = saved.pop() {
                            current = previous;
                        }
                    }
                    Op::Apply => {
                        n.apply_edit();
                        saved.pop();
                    }
                }
                prop_assert_eq!(Model::observe(&n), current.clone());
                prop_assert_eq!(n.edit_level(), saved.len());
            }
        }

        #[test]
        fn prop_load_never_dirties(title in "[a-z ]{0,12}", count in any::<i32>()) {
            let ctx = context();
            let n = note(&ctx);
            n.load_property("Title", title.as_str()).unwrap();
            n.load_property("Count", count).unwrap();
            prop_assert!(!n.is_dirty());
            prop_assert_eq!(n.read_property("Title").unwrap(), FieldValue::from(title));
            prop_assert_eq!(n.read_property("Count").unwrap(), FieldValue::from(count));
        }
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    #[test]
    fn test_unknown_property_is_not_found() {
        let ctx = context();
        let c = customer(&ctx);
        assert_eq!(
            c.get_property("Phone"),
            Err(FrameworkError::NotFound {
                type_name: "Customer".into(),
                property: "Phone".into(),
            })
        );
        assert!(c.set_property("Phone", "555").is_err());
    }

    #[test]
    fn test_descriptors_follow_declaration_order() {
        let ctx = context();
        let c = customer(&ctx);
        let names: Vec<String> = c.properties().iter().map(|d| d.name.clone()).collect();
        assert_eq!(
            names,
            vec!["Name", "Email", "CreditLimit", "Notes", "Address", "Orders"]
        );
        assert_eq!(c.property("Name").unwrap().friendly_name, "Customer name");
        assert_eq!(c.property("CreditLimit").unwrap().default, FieldValue::from(1_000));
    }

    #[test]
    fn test_default_value_until_written() {
        let ctx = context();
        let c = customer(&ctx);
        assert_eq!(c.read_property("CreditLimit").unwrap(), FieldValue::from(1_000));
        assert_eq!(c.read_property("Email").unwrap(), FieldValue::from(""));
        assert!(c.child("Address").unwrap().is_none());
    }
}
