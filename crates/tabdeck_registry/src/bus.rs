//! Synchronous notification fan-out.
//!
//! Listeners run in subscription order, on the caller's stack, once per
//! publish. The listener list is snapshotted before delivery, so subscribing
//! or unsubscribing from inside a listener only affects later publishes. A
//! panicking listener is isolated and reported; the remaining listeners still
//! run.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::model::{EventKind, TabField, TabId, TabRecord};

/// Token returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A listener that panicked during delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    pub subscription: SubscriptionId,
    pub message: String,
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ListenerSetInner<T: ?Sized> {
    listeners: Vec<(SubscriptionId, Listener<T>)>,
    next_id: u64,
}

/// Ordered set of callbacks for one event type.
pub struct ListenerSet<T: ?Sized> {
    inner: Mutex<ListenerSetInner<T>>,
}

impl<T: ?Sized> ListenerSet<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ListenerSetInner {
                listeners: Vec::new(),
                next_id: 1,
            }),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Returns false when the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(existing, _)| *existing != id);
        inner.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.lock().listeners.clear();
    }

    /// Delivers `event` to every listener subscribed when the call started.
    pub fn emit(&self, event: &T) -> Vec<ListenerFailure> {
        let snapshot: Vec<(SubscriptionId, Listener<T>)> = self.inner.lock().listeners.clone();

        let mut failures = Vec::new();
        for (id, listener) in snapshot {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener(event))) {
                let failure = ListenerFailure {
                    subscription: id,
                    message: panic_message(payload.as_ref()),
                };
                log::error!("listener {} failed: {}", failure.subscription, failure.message);
                failures.push(failure);
            }
        }
        failures
    }
}

impl<T: ?Sized> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// One committed mutation, as seen by subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct TabNotification {
    pub kind: EventKind,
    pub id: TabId,
    pub changed: Vec<TabField>,
    /// State after the mutation; for removals, the record as it was removed.
    pub record: TabRecord,
}

impl TabNotification {
    pub fn has_changed(&self, field: TabField) -> bool {
        self.changed.contains(&field)
    }

    /// True when this mutation made the tab the active one.
    pub fn activated(&self) -> bool {
        self.kind != EventKind::Remove && self.record.active && self.has_changed(TabField::Active)
    }
}

/// The registry's single notification channel.
#[derive(Default)]
pub struct NotificationBus {
    listeners: ListenerSet<TabNotification>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&TabNotification) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn clear(&self) {
        self.listeners.clear();
    }

    pub fn publish(
        &self,
        kind: EventKind,
        id: TabId,
        changed: Vec<TabField>,
        record: TabRecord,
    ) -> Vec<ListenerFailure> {
        let notification = TabNotification {
            kind,
            id,
            changed,
            record,
        };
        let failures = self.listeners.emit(&notification);
        for failure in &failures {
            tabdeck_shared::diagnostics::log(format!(
                "exception while notifying {} about {} #{}: {}",
                failure.subscription, kind, id, failure.message
            ));
        }
        failures
    }
}
