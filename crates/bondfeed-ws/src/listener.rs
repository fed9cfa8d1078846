//! Listener registry and subscription handles.

use crate::connection::ConnectorInner;
use crate::event::{EventKind, FeedEvent};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::error;

/// Listener callback.
pub type Handler = Arc<dyn Fn(&FeedEvent) + Send + Sync>;

/// Identifier of a single registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    kind: EventKind,
    handler: Handler,
}

/// Registered listeners, in registration order.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    entries: Vec<ListenerEntry>,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, kind: EventKind, handler: Handler) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push(ListenerEntry { id, kind, handler });
        id
    }

    /// Remove one registration and hand back its handler, or `None` if it
    /// was already gone.
    ///
    /// The handler may own other subscriptions, so the caller must drop it
    /// only after releasing the registry lock.
    pub(crate) fn remove(&mut self, id: ListenerId) -> Option<Handler> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index).handler)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handlers for `kind`, cloned so dispatch runs without the lock held.
    pub(crate) fn snapshot(&self, kind: EventKind) -> Vec<Handler> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.handler.clone())
            .collect()
    }
}

/// Invoke each handler in order. A panicking handler is logged and skipped.
pub(crate) fn dispatch(handlers: &[Handler], event: &FeedEvent) {
    for handler in handlers {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
            error!(
                event = %event.kind(),
                panic = %panic_message(panic.as_ref()),
                "Feed listener panicked"
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

/// Handle for one listener registration.
///
/// Dropping the handle removes the listener. Removing the last listener of a
/// connector tears its connection down.
#[must_use = "dropping a Subscription removes the listener immediately"]
pub struct Subscription {
    id: ListenerId,
    kind: EventKind,
    connector: Weak<ConnectorInner>,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(id: ListenerId, kind: EventKind, connector: Weak<ConnectorInner>) -> Self {
        Self {
            id,
            kind,
            connector,
            active: true,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove exactly this registration.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the listener registered for the connector's lifetime.
    pub fn detach(mut self) {
        self.active = false;
    }

    fn release(&mut self) {
        if !std::mem::take(&mut self.active) {
            return;
        }
        if let Some(connector) = self.connector.upgrade() {
            connector.remove_listener(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Handler {
        let log = log.clone();
        Arc::new(move |_event: &FeedEvent| log.lock().push(tag))
    }

    #[test]
    fn test_registry_order_and_filter() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::default();
        registry.add(EventKind::Open, recorder(&log, "a"));
        registry.add(EventKind::Close, recorder(&log, "x"));
        registry.add(EventKind::Open, recorder(&log, "b"));

        dispatch(&registry.snapshot(EventKind::Open), &FeedEvent::Open);

        assert_eq!(*log.lock(), vec!["a", "b"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_remove_exactly_one() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::default();
        let first = registry.add(EventKind::Open, recorder(&log, "a"));
        // Same handler registered twice: two distinct registrations
        let handler = recorder(&log, "b");
        let second = registry.add(EventKind::Open, handler.clone());
        registry.add(EventKind::Open, handler);

        assert!(registry.remove(second).is_some());
        assert!(registry.remove(second).is_none());
        dispatch(&registry.snapshot(EventKind::Open), &FeedEvent::Open);
        assert_eq!(*log.lock(), vec!["a", "b"]);

        assert!(registry.remove(first).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::default();
        registry.add(EventKind::Open, recorder(&log, "before"));
        registry.add(
            EventKind::Open,
            Arc::new(|_event: &FeedEvent| panic!("listener bug")),
        );
        registry.add(EventKind::Open, recorder(&log, "after"));

        dispatch(&registry.snapshot(EventKind::Open), &FeedEvent::Open);

        assert_eq!(*log.lock(), vec!["before", "after"]);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "<non-string panic>");
    }

    #[test]
    fn test_subscription_without_connector_is_inert() {
        let sub = Subscription::new(ListenerId(1), EventKind::Open, Weak::new());
        assert_eq!(sub.kind(), EventKind::Open);
        sub.unsubscribe();
    }
}
