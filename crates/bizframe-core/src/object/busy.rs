//! # Busy Tracking
//!
//! An object is busy while it is explicitly marked busy, while any async rule
//! is running, or while any async property load is pending. Waiters park on a
//! `Notify` that is signalled whenever one of those counters (or a child's)
//! changes, then re-check.

use parking_lot::Mutex;
use shared_types::FrameworkError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Notify};

/// Counters behind `is_self_busy`.
#[derive(Default)]
pub(crate) struct BusyTracker {
    marked: AtomicUsize,
    rules_running: AtomicUsize,
    loads_pending: AtomicUsize,
    properties: Mutex<HashMap<String, usize>>,
}

impl BusyTracker {
    pub(crate) fn is_busy(&self) -> bool {
        self.marked.load(Ordering::Acquire) > 0
            || self.rules_running.load(Ordering::Acquire) > 0
            || self.loads_pending.load(Ordering::Acquire) > 0
    }

    pub(crate) fn is_property_busy(&self, property: &str) -> bool {
        self.properties
            .lock()
            .get(property)
            .is_some_and(|count| *count > 0)
    }

    pub(crate) fn rules_running(&self) -> usize {
        self.rules_running.load(Ordering::Acquire)
    }

    pub(crate) fn mark(&self) {
        self.marked.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns `false` if the object was not marked busy.
    pub(crate) fn unmark(&self) -> bool {
        self.marked
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    pub(crate) fn rule_started(&self, property: Option<&str>) {
        self.rules_running.fetch_add(1, Ordering::AcqRel);
        if let Some(property) = property {
            self.property_started(property);
        }
    }

    /// Returns the number of async rules still running.
    pub(crate) fn rule_finished(&self, property: Option<&str>) -> usize {
        if let Some(property) = property {
            self.property_finished(property);
        }
        let previous = self
            .rules_running
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_sub(1))
            })
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    pub(crate) fn load_started(&self, property: &str) {
        self.loads_pending.fetch_add(1, Ordering::AcqRel);
        self.property_started(property);
    }

    pub(crate) fn load_finished(&self, property: &str) {
        self.property_finished(property);
        let _ = self
            .loads_pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    fn property_started(&self, property: &str) {
        *self
            .properties
            .lock()
            .entry(property.to_string())
            .or_insert(0) += 1;
    }

    fn property_finished(&self, property: &str) {
        let mut properties = self.properties.lock();
        if let Some(count) = properties.get_mut(property) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                properties.remove(property);
            }
        }
    }
}

/// Caller-controlled cancellation for idle waits.
#[derive(Clone)]
pub struct CancellationSignal {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancellationSignal {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Cancel every wait using this signal (or a clone of it).
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Resolve once `is_busy` reports false, re-checking on every notification.
pub(crate) async fn until_idle<F>(notify: &Notify, is_busy: F)
where
    F: Fn() -> bool,
{
    loop {
        let notified = notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if !is_busy() {
            return;
        }
        notified.await;
    }
}

/// Run an idle wait with a deadline.
pub(crate) async fn with_timeout<F>(timeout: Duration, wait: F) -> Result<(), FrameworkError>
where
    F: Future<Output = ()>,
{
    let started = Instant::now();
    tokio::time::timeout(timeout, wait)
        .await
        .map_err(|_| FrameworkError::Timeout {
            waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
}

/// Run an idle wait until the caller cancels it.
pub(crate) async fn until_cancelled<F>(
    signal: &CancellationSignal,
    wait: F,
) -> Result<(), FrameworkError>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        () = wait => Ok(()),
        () = signal.cancelled() => Err(FrameworkError::Cancelled),
    }
}
