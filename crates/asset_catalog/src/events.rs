//! Path observers and item update delivery.
//!
//! Path add/remove notifications are fanned out to explicitly registered
//! observers. Item updates for the browser go through a crossbeam channel;
//! the browser drains it on its own schedule.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;

use crate::item::Item;

/// Receives structural changes of the path space.
pub trait PathObserver: Send + Sync {
    fn on_path_added(&self, path: &str, parent: &str);

    fn on_path_removed(&self, path: &str);

    fn on_root_added(&self, _root: &str, _virtual_root: &str) {}

    fn on_root_removed(&self, _root: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Registry of path observers.
pub struct PathEventHub {
    next_id: AtomicU64,
    observers: RwLock<Vec<(ObserverId, Arc<dyn PathObserver>)>>,
}

impl std::fmt::Debug for PathEventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathEventHub")
            .field("observers", &self.observers.read().len())
            .finish()
    }
}

impl Default for PathEventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl PathEventHub {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn PathObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    /// Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    pub fn notify_path_added(&self, path: &str, parent: &str) {
        for observer in self.snapshot() {
            observer.on_path_added(path, parent);
        }
    }

    pub fn notify_path_removed(&self, path: &str) {
        for observer in self.snapshot() {
            observer.on_path_removed(path);
        }
    }

    pub fn notify_root_added(&self, root: &str, virtual_root: &str) {
        for observer in self.snapshot() {
            observer.on_root_added(root, virtual_root);
        }
    }

    pub fn notify_root_removed(&self, root: &str) {
        for observer in self.snapshot() {
            observer.on_root_removed(root);
        }
    }

    // Observers may subscribe or unsubscribe from inside a callback.
    fn snapshot(&self) -> Vec<Arc<dyn PathObserver>> {
        self.observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Item updates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemUpdateKind {
    Added,
    Removed,
    Modified,
    Moved { old_virtual_path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub kind: ItemUpdateKind,
    pub item: Item,
}

impl ItemUpdate {
    pub fn added(item: Item) -> Self {
        Self {
            kind: ItemUpdateKind::Added,
            item,
        }
    }

    pub fn removed(item: Item) -> Self {
        Self {
            kind: ItemUpdateKind::Removed,
            item,
        }
    }

    pub fn modified(item: Item) -> Self {
        Self {
            kind: ItemUpdateKind::Modified,
            item,
        }
    }

    pub fn moved(item: Item, old_virtual_path: String) -> Self {
        Self {
            kind: ItemUpdateKind::Moved { old_virtual_path },
            item,
        }
    }
}

/// Ordered queue of item updates.
///
/// Updates are delivered in emission order, which follows causal order.
#[derive(Debug, Clone)]
pub struct ItemUpdateQueue {
    sender: Sender<ItemUpdate>,
    receiver: Receiver<ItemUpdate>,
}

impl Default for ItemUpdateQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemUpdateQueue {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    pub fn push(&self, update: ItemUpdate) {
        // The queue owns a receiver, so the channel can never be disconnected.
        let _ = self.sender.send(update);
    }

    /// Receiver for consumers that prefer to block or select on updates.
    pub fn receiver(&self) -> Receiver<ItemUpdate> {
        self.receiver.clone()
    }

    /// Takes every pending update.
    pub fn drain(&self) -> Vec<ItemUpdate> {
        self.receiver.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
