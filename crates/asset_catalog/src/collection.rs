//! Collection manager collaborator.
//!
//! Collections are named, user-curated lists of object paths. They may nest;
//! the compiler resolves a selection to a flat set of object paths.

use fnv::{FnvHashMap, FnvHashSet};
use parking_lot::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionShareType {
    Local,
    Private,
    Shared,
}

/// Identity of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    pub name: String,
    pub share_type: CollectionShareType,
}

impl CollectionRef {
    pub fn new(name: &str, share_type: CollectionShareType) -> Self {
        Self {
            name: name.to_string(),
            share_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionMode {
    SelfOnly,
    SelfAndChildren,
}

pub trait CollectionManager: Send + Sync {
    /// Object paths stored in a collection, optionally including children.
    fn get_objects_in_collection(
        &self,
        collection: &CollectionRef,
        recursion: RecursionMode,
    ) -> Vec<String>;
}

#[derive(Debug, Default)]
struct StoredCollection {
    objects: Vec<String>,
    children: Vec<CollectionRef>,
}

/// Collection manager held in memory.
#[derive(Debug, Default)]
pub struct MemoryCollectionManager {
    collections: RwLock<FnvHashMap<CollectionRef, StoredCollection>>,
}

impl MemoryCollectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the collection if needed and adds an object path to it.
    pub fn add_object(&self, collection: &CollectionRef, object_path: &str) {
        let mut collections = self.collections.write();
        let stored = collections.entry(collection.clone()).or_default();
        if !stored.objects.iter().any(|existing| existing == object_path) {
            stored.objects.push(object_path.to_string());
        }
    }

    /// Nests `child` under `parent`, creating both if needed.
    pub fn add_child(&self, parent: &CollectionRef, child: &CollectionRef) {
        let mut collections = self.collections.write();
        collections.entry(child.clone()).or_default();
        let stored = collections.entry(parent.clone()).or_default();
        if !stored.children.contains(child) {
            stored.children.push(child.clone());
        }
    }
}

impl CollectionManager for MemoryCollectionManager {
    fn get_objects_in_collection(
        &self,
        collection: &CollectionRef,
        recursion: RecursionMode,
    ) -> Vec<String> {
        let collections = self.collections.read();
        let mut objects = Vec::new();
        let mut seen_objects = FnvHashSet::default();
        let mut visited = FnvHashSet::default();
        let mut stack = vec![collection];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(stored) = collections.get(current) else {
                continue;
            };
            for object in &stored.objects {
                if seen_objects.insert(object.as_str()) {
                    objects.push(object.clone());
                }
            }
            if recursion == RecursionMode::SelfAndChildren {
                stack.extend(stored.children.iter());
            }
        }
        objects
    }
}
