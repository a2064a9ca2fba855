//! Local event listeners of one object or list.

use crate::domain::events::SubscriptionId;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Registered callbacks. Notification runs on a copy of the list, so a
/// listener may subscribe or unsubscribe while being called.
pub(crate) struct Listeners<E> {
    next_id: AtomicU64,
    entries: RwLock<Vec<(u64, Listener<E>)>>,
}

impl<E> Listeners<E> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().push((id, Arc::new(listener)));
        SubscriptionId(id)
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id.0);
        entries.len() != before
    }

    pub(crate) fn notify(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .entries
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}
