//! # Async Rules and Loads
//!
//! Busy tracking, idle waits and failure reporting for background work.

#[cfg(test)]
mod tests {
    use crate::fixtures::{account, context, customer};
    use bizframe_core::{CancellationSignal, FieldValue, FrameworkError, ObjectEvent};
    use parking_lot::Mutex;
    use shared_bus::{EventFilter, EventTopic, FrameworkEvent};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_taken_username_reported_after_idle() {
        let ctx = context();
        let a = account(&ctx);
        a.set_property("Username", "admin").unwrap();
        assert!(a.is_busy());
        assert!(!a.is_savable());

        a.wait_for_idle(Duration::from_secs(2)).await.unwrap();
        assert!(!a.is_busy());
        assert_eq!(
            a.first_broken_rule("Username").unwrap().description(),
            "admin is taken"
        );
    }

    #[tokio::test]
    async fn test_free_username_is_valid() {
        let ctx = context();
        let a = account(&ctx);
        a.set_property("Username", "grace").unwrap();
        a.wait_until_idle().await.unwrap();
        assert!(a.is_valid());
        assert!(a.is_savable());
    }

    #[tokio::test]
    async fn test_sync_error_skips_async_rule() {
        let ctx = context();
        let a = account(&ctx);
        a.check_rules().unwrap();
        assert!(!a.is_busy());
        assert_eq!(a.broken_rules_for("Username").len(), 1);
    }

    #[tokio::test]
    async fn test_validation_complete_on_bus_stream() {
        let ctx = context();
        let mut stream = ctx
            .bus()
            .event_stream(EventFilter::topics(vec![EventTopic::Validation]));
        let a = account(&ctx);
        a.set_property("Username", "root").unwrap();

        let event = timeout(Duration::from_secs(2), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            FrameworkEvent::ValidationComplete {
                type_name: a.type_name().clone(),
                identity: a.identity(),
            }
        );
    }

    #[tokio::test]
    async fn test_wait_times_out_while_marked_busy() {
        let ctx = context();
        let c = customer(&ctx);
        c.mark_busy();
        let result = c.wait_for_idle(Duration::from_millis(30)).await;
        assert!(matches!(result, Err(FrameworkError::Timeout { .. })));

        c.mark_idle();
        c.wait_for_idle(Duration::from_millis(30)).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_cancelled_by_signal() {
        let ctx = context();
        let c = customer(&ctx);
        c.mark_busy();
        let signal = CancellationSignal::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        assert!(matches!(
            c.wait_for_idle_until(&signal).await,
            Err(FrameworkError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_parent_waits_for_busy_child() {
        let ctx = context();
        let c = customer(&ctx);
        let a = account(&ctx);
        let list = bizframe_core::BusinessList::new(&ctx);
        c.set_property("Orders", list.clone()).unwrap();
        list.add(a.clone()).unwrap();

        a.set_property("Username", "linus").unwrap();
        assert!(c.is_busy());
        c.wait_for_idle(Duration::from_secs(2)).await.unwrap();
        assert!(!c.is_busy());
        assert!(a.is_valid());
    }

    #[tokio::test]
    async fn test_lazy_notes_load_in_background() {
        let ctx = context();
        let c = customer(&ctx);
        assert!(matches!(
            c.read_property("Notes"),
            Err(FrameworkError::InvalidOperation(_))
        ));

        let changed = Arc::new(Mutex::new(Vec::new()));
        let sink = changed.clone();
        c.subscribe(move |e| {
            if let ObjectEvent::PropertyChanged { property } = e {
                sink.lock().push(property.clone());
            }
        });

        c.load_property_async("Notes", async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(FieldValue::from("VIP since 2019"))
        })
        .unwrap();
        assert!(c.is_property_busy("Notes"));
        assert_eq!(c.read_property("Notes").unwrap(), FieldValue::from(""));

        c.wait_for_idle(Duration::from_secs(1)).await.unwrap();
        assert_eq!(
            c.read_property("Notes").unwrap(),
            FieldValue::from("VIP since 2019")
        );
        assert_eq!(*changed.lock(), vec!["Notes".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_load_is_published_as_unhandled() {
        let ctx = context();
        let mut errors = ctx.subscribe(EventFilter::topics(vec![EventTopic::Errors]));
        let c = customer(&ctx);
        c.load_property_async("Notes", async {
            Err(FrameworkError::Persistence("notes store offline".into()))
        })
        .unwrap();

        let event = timeout(Duration::from_secs(1), errors.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            FrameworkEvent::UnhandledAsyncException {
                property, error, ..
            } => {
                assert_eq!(property.as_deref(), Some("Notes"));
                assert_eq!(
                    error,
                    FrameworkError::Persistence("notes store offline".into())
                );
            }
            other => panic!("unexpected event {other:?}"),
        }
        c.wait_for_idle(Duration::from_secs(1)).await.unwrap();
    }
}
