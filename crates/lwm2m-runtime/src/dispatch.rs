//! Callback dispatch, the `dispatch_callbacks()` half of the cooperative
//! session loop: `process()` never runs user code, callbacks run only from
//! `dispatch_callbacks()`, on the caller's thread.
//!
//! `process(timeout)` (on [`crate::session::Session`]) only pumps the
//! transport and feeds delivered [`ChangeSet`]s into each subscription's
//! channel. Nothing here runs a callback until the application explicitly
//! calls [`CallbackDispatcher::dispatch_callbacks`].

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::subscription::{ChangeSet, SubscriptionId};

/// A user-supplied change handler. `FnMut` rather than `Fn` since most
/// handlers close over local state (a counter, a UI repaint flag, ...).
pub type ChangeCallback = Box<dyn FnMut(ChangeSet) + Send>;

struct Registration {
    receiver: mpsc::Receiver<ChangeSet>,
    callback: ChangeCallback,
}

/// Binds registered callbacks to their subscription channels and drains
/// them on demand.
#[derive(Default)]
pub struct CallbackDispatcher {
    registrations: HashMap<SubscriptionId, Registration>,
}

impl CallbackDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: SubscriptionId, receiver: mpsc::Receiver<ChangeSet>, callback: ChangeCallback) {
        self.registrations.insert(id, Registration { receiver, callback });
    }

    pub fn unregister(&mut self, id: SubscriptionId) {
        self.registrations.remove(&id);
    }

    /// Drain every pending notification across all registered subscriptions,
    /// invoking each one's callback in arrival order within that
    /// subscription. Must be called from the same thread that owns the
    /// session; never called implicitly by `process()`.
    pub fn dispatch_callbacks(&mut self) -> usize {
        let mut delivered = 0;
        for registration in self.registrations.values_mut() {
            while let Ok(change) = registration.receiver.try_recv() {
                (registration.callback)(change);
                delivered += 1;
            }
        }
        delivered
    }

    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.registrations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::SubscriptionTable;
    use lwm2m_core::{ChangeKind, Path, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn dispatch_callbacks_invokes_handler_only_when_called() {
        let mut table = SubscriptionTable::new();
        let path = Path::parse("/1000/0/104").unwrap();
        let (id, _cancel, rx) = table.subscribe(path, 4);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut dispatcher = CallbackDispatcher::new();
        dispatcher.register(id, rx, Box::new(move |_| { counter.fetch_add(1, Ordering::SeqCst); }));

        table
            .notify(ChangeSet { path, kind: ChangeKind::ResourceModified, value: Some(Value::Float(1.0)) })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let delivered = dispatcher.dispatch_callbacks();
        assert_eq!(delivered, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unregister_stops_further_delivery() {
        let mut table = SubscriptionTable::new();
        let path = Path::parse("/1000/0/104").unwrap();
        let (id, _cancel, rx) = table.subscribe(path, 4);
        let mut dispatcher = CallbackDispatcher::new();
        dispatcher.register(id, rx, Box::new(|_| {}));
        dispatcher.unregister(id);
        assert_eq!(dispatcher.registered_count(), 0);
    }
}
