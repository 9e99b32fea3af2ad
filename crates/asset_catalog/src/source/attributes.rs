//! Folder attribute bookkeeping.

use fnv::FnvHashMap;

use crate::path::{is_path_or_descendant, parent_path};
use crate::types::FolderAttributes;

/// Attributes per internal folder path.
///
/// Flags only accumulate. An upward population walk stops at the first
/// ancestor that was already given the same flags in the current batch.
/// Outside a batch the memo lives for one walk only.
#[derive(Debug, Default)]
pub struct FolderAttributeStore {
    attributes: FnvHashMap<String, FolderAttributes>,
    recently_populated: FnvHashMap<String, FolderAttributes>,
    batching: bool,
}

impl FolderAttributeStore {
    pub fn get(&self, path: &str) -> FolderAttributes {
        self.attributes.get(path).copied().unwrap_or_default()
    }

    /// Whether a folder is listed.
    ///
    /// An always-visible mark wins. A folder whose content is all cooked and
    /// private is hidden even when empty folders are shown.
    pub fn is_visible(&self, path: &str, hide_empty: bool) -> bool {
        let attributes = self.get(path);
        if attributes.contains(FolderAttributes::ALWAYS_VISIBLE) {
            return true;
        }
        let has_content = attributes.contains(FolderAttributes::HAS_CONTENT);
        let browsable = FolderAttributes::HAS_PUBLIC_CONTENT | FolderAttributes::HAS_SOURCE_CONTENT;
        if has_content && !attributes.intersects(browsable) {
            return false;
        }
        !hide_empty || has_content
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn begin_batch(&mut self) {
        self.recently_populated.clear();
        self.batching = true;
    }

    pub fn end_batch(&mut self) {
        self.recently_populated.clear();
        self.batching = false;
    }

    /// ORs `flags` into `path` and its ancestors.
    ///
    /// Returns the paths whose attributes changed, outermost first.
    pub fn populate(&mut self, path: &str, flags: FolderAttributes) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = Some(path);
        while let Some(candidate) = current {
            if candidate == "/" {
                break;
            }
            let memoized = self
                .recently_populated
                .get(candidate)
                .is_some_and(|seen| seen.contains(flags));
            if memoized {
                break;
            }
            chain.push(candidate);
            current = parent_path(candidate);
        }

        let mut changed = Vec::new();
        for candidate in chain.into_iter().rev() {
            let entry = self.attributes.entry(candidate.to_string()).or_default();
            if !entry.contains(flags) {
                *entry |= flags;
                changed.push(candidate.to_string());
            }
            *self
                .recently_populated
                .entry(candidate.to_string())
                .or_default() |= flags;
        }
        if !self.batching {
            self.recently_populated.clear();
        }
        changed
    }

    /// Sets flags on one path only.
    pub fn mark(&mut self, path: &str, flags: FolderAttributes) -> bool {
        let entry = self.attributes.entry(path.to_string()).or_default();
        let changed = !entry.contains(flags);
        *entry |= flags;
        changed
    }

    pub fn remove_path(&mut self, path: &str) {
        self.attributes.remove(path);
        self.recently_populated.remove(path);
    }

    /// Drops `root` and everything below it.
    pub fn remove_under(&mut self, root: &str) {
        self.attributes
            .retain(|path, _| !is_path_or_descendant(path, root));
        self.recently_populated
            .retain(|path, _| !is_path_or_descendant(path, root));
    }
}
