//! Cache of recursive path scopes.
//!
//! A recursive compile walks every sub path below its target, which is the
//! expensive part of compilation. The resulting internal-path set is cached
//! per consumer and virtual path, then kept current from path add/remove
//! notifications instead of being rebuilt. Non-recursive scopes are cheap and
//! never cached.

use std::sync::atomic::{AtomicU64, Ordering};

use fnv::{FnvHashMap, FnvHashSet};
use parking_lot::Mutex;

use crate::config::RootClassifier;
use crate::events::PathObserver;
use crate::path::{is_path_or_descendant, passes_attribute_filter, path_depth};
use crate::types::ItemAttributeFilter;

/// Identity of a cache consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterCacheId(u64);

/// Allocates a process-unique cache id for one consumer.
#[derive(Debug)]
pub struct FilterCacheIdOwner {
    id: FilterCacheId,
}

impl Default for FilterCacheIdOwner {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCacheIdOwner {
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self {
            id: FilterCacheId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
        }
    }

    #[inline]
    pub fn id(&self) -> FilterCacheId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterCacheKey {
    pub id: FilterCacheId,
    pub recursive: bool,
    pub virtual_path: String,
}

#[derive(Debug, Clone)]
struct CachedScope {
    internal_paths: FnvHashSet<String>,
    attribute_filter: ItemAttributeFilter,
}

#[derive(Debug)]
pub struct FilterCache {
    roots: RootClassifier,
    entries: Mutex<FnvHashMap<FilterCacheKey, CachedScope>>,
}

impl FilterCache {
    pub fn new(roots: RootClassifier) -> Self {
        Self {
            roots,
            entries: Mutex::new(FnvHashMap::default()),
        }
    }

    fn key(id: FilterCacheId, virtual_path: &str) -> FilterCacheKey {
        FilterCacheKey {
            id,
            recursive: true,
            virtual_path: virtual_path.to_string(),
        }
    }

    /// Cached scope for a recursive query, if built with the same attributes.
    pub fn get(
        &self,
        id: FilterCacheId,
        virtual_path: &str,
        attribute_filter: ItemAttributeFilter,
    ) -> Option<FnvHashSet<String>> {
        let entries = self.entries.lock();
        let scope = entries.get(&Self::key(id, virtual_path))?;
        (scope.attribute_filter == attribute_filter).then(|| scope.internal_paths.clone())
    }

    pub fn put(
        &self,
        id: FilterCacheId,
        virtual_path: &str,
        attribute_filter: ItemAttributeFilter,
        internal_paths: FnvHashSet<String>,
    ) {
        self.entries.lock().insert(
            Self::key(id, virtual_path),
            CachedScope {
                internal_paths,
                attribute_filter,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Extends every scope that already covers `parent`.
    ///
    /// Scopes not containing the parent are left alone, so an addition never
    /// pulls a path into an unrelated scope.
    pub fn on_path_added(&self, path: &str, parent: &str) {
        let depth = path_depth(path);
        let mut entries = self.entries.lock();
        for scope in entries.values_mut() {
            if scope.internal_paths.contains(parent)
                && passes_attribute_filter(path, depth, scope.attribute_filter, &self.roots)
            {
                scope.internal_paths.insert(path.to_string());
            }
        }
    }

    pub fn on_path_removed(&self, path: &str) {
        let mut entries = self.entries.lock();
        for scope in entries.values_mut() {
            scope.internal_paths.remove(path);
        }
    }

    /// Evicts `root` and everything below it from every scope.
    pub fn remove_paths_under(&self, root: &str) {
        let mut entries = self.entries.lock();
        for scope in entries.values_mut() {
            scope
                .internal_paths
                .retain(|path| !is_path_or_descendant(path, root));
        }
    }

    /// Drops scopes whose target contains `virtual_path`.
    ///
    /// A newly mounted root falls inside those scopes but has no cached
    /// parent to attach to.
    pub fn invalidate_containing(&self, virtual_path: &str) {
        self.entries
            .lock()
            .retain(|key, _| !is_path_or_descendant(virtual_path, &key.virtual_path));
    }

    /// Drops data for paths the consumer no longer tracks.
    // TODO: keep entries whose virtual path is still in `in_use` instead of
    // clearing the whole consumer.
    pub fn remove_unused_cached_data(&self, id: FilterCacheId, in_use: &[String]) {
        log::debug!(
            "filter cache prune id={} in_use={}",
            id.0,
            in_use.len()
        );
        self.clear_cached_data(id);
    }

    pub fn clear_cached_data(&self, id: FilterCacheId) {
        self.entries.lock().retain(|key, _| key.id != id);
    }
}

impl PathObserver for FilterCache {
    fn on_path_added(&self, path: &str, parent: &str) {
        FilterCache::on_path_added(self, path, parent);
    }

    fn on_path_removed(&self, path: &str) {
        FilterCache::on_path_removed(self, path);
    }

    fn on_root_added(&self, _root: &str, virtual_root: &str) {
        self.invalidate_containing(virtual_root);
    }

    fn on_root_removed(&self, root: &str) {
        self.remove_paths_under(root);
    }
}
