//! Change subscriptions.
//!
//! A subscription is delivered over an `mpsc` channel rather than a raw
//! callback pointer: the receiver going away is the "free" event, so there
//! is no way to deliver into a freed subscription. A [`CancelHandle`]
//! additionally lets an explicit
//! `CancelObserve`/unsubscribe mark a subscription dead before its receiver
//! is dropped, without racing a delivery already in flight.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use lwm2m_core::{ChangeKind, Path, Value};
use tokio::sync::mpsc;

/// Cooperative cancellation flag shared between a subscription's table entry
/// and anything holding on to it externally.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// One delivered change notification.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    pub path: Path,
    pub kind: ChangeKind,
    pub value: Option<Value>,
}

struct Entry {
    id: SubscriptionId,
    path: Path,
    cancel: CancelHandle,
    sender: mpsc::Sender<ChangeSet>,
}

/// All live change subscriptions, keyed by the path they watch.
#[derive(Default)]
pub struct SubscriptionTable {
    next_id: AtomicU64,
    entries: Vec<Entry>,
}

impl SubscriptionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to changes under `path`. If a value already exists there,
    /// the caller is expected to have already delivered a `ChangeKind::Current`
    /// notification before `process()` ever sees new changes: `Current` fires
    /// once, synchronously, at establishment.
    pub fn subscribe(&mut self, path: Path, buffer: usize) -> (SubscriptionId, CancelHandle, mpsc::Receiver<ChangeSet>) {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let cancel = CancelHandle::new();
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.entries.push(Entry { id, path, cancel: cancel.clone(), sender: tx });
        (id, cancel, rx)
    }

    pub fn cancel(&mut self, id: SubscriptionId) {
        if let Some(entry) = self.entries.iter().find(|e| e.id == id) {
            entry.cancel.cancel();
        }
        self.entries.retain(|e| e.id != id);
    }

    /// Notify every live subscription whose path contains (or equals) `change.path`.
    /// Dead entries (cancelled, or whose receiver was dropped) are pruned.
    pub async fn notify(&mut self, change: ChangeSet) {
        let mut dead = Vec::new();
        for entry in &self.entries {
            if entry.cancel.is_cancelled() {
                dead.push(entry.id);
                continue;
            }
            if entry.path.contains(&change.path) && entry.sender.send(change.clone()).await.is_err() {
                dead.push(entry.id);
            }
        }
        self.entries.retain(|e| !dead.contains(&e.id));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwm2m_core::ObjectId;

    #[tokio::test]
    async fn notify_delivers_to_matching_subscriber() {
        let mut table = SubscriptionTable::new();
        let path = lwm2m_core::Path::parse("/1000/0/104").unwrap();
        let (_id, _cancel, mut rx) = table.subscribe(path, 4);

        table
            .notify(ChangeSet { path, kind: ChangeKind::ResourceModified, value: Some(Value::Float(1.0)) })
            .await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.path, path);
    }

    #[tokio::test]
    async fn cancelled_subscription_receives_nothing() {
        let mut table = SubscriptionTable::new();
        let path = lwm2m_core::Path::parse("/1000/0/104").unwrap();
        let (id, _cancel, mut rx) = table.subscribe(path, 4);
        table.cancel(id);

        table
            .notify(ChangeSet { path, kind: ChangeKind::ResourceModified, value: None })
            .await;

        assert!(rx.try_recv().is_err());
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn notify_matches_by_prefix() {
        let mut table = SubscriptionTable::new();
        let object_path = lwm2m_core::Path::parse(&format!("/{}", ObjectId::new(1000).unwrap())).unwrap();
        let (_id, _cancel, mut rx) = table.subscribe(object_path, 4);
        let resource_path = lwm2m_core::Path::parse("/1000/0/104").unwrap();

        table
            .notify(ChangeSet { path: resource_path, kind: ChangeKind::ResourceModified, value: None })
            .await;

        assert!(rx.try_recv().is_ok());
    }
}
