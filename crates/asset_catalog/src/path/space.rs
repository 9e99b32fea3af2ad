//! Bidirectional mapping between virtual and internal paths.

use std::collections::BTreeSet;

use super::tree::VirtualPathTree;
use super::util::{debug_check_path, is_path_or_descendant, root_of};
use crate::config::{CatalogConfig, RootClassifier};
use crate::error::{CatalogError, Result};
use crate::events::PathEventHub;
use crate::registry::AssetRegistry;
use crate::types::{PathType, RootKind};

/// Virtual folder plugin roots are grouped under when organized.
pub const PLUGINS_FOLDER: &str = "Plugins";

/// The set of mounted content roots and the virtual tree built over them.
///
/// Path add/remove notifications are broadcast through the owned
/// [`PathEventHub`] so dependent caches stay in sync without knowing about
/// the registry.
#[derive(Debug)]
pub struct PathSpace {
    config: CatalogConfig,
    classifier: RootClassifier,
    roots: BTreeSet<String>,
    tree: VirtualPathTree,
    observers: PathEventHub,
}

impl PathSpace {
    pub fn new(config: CatalogConfig) -> Self {
        let classifier = config.root_classifier();
        let mut pinned = Vec::new();
        if let Some(prefix) = config.virtual_root.as_deref() {
            pinned.push(prefix);
        }
        let tree = VirtualPathTree::new(&pinned);
        Self {
            config,
            classifier,
            roots: BTreeSet::new(),
            tree,
            observers: PathEventHub::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    #[inline]
    pub fn classifier(&self) -> &RootClassifier {
        &self.classifier
    }

    #[inline]
    pub fn tree(&self) -> &VirtualPathTree {
        &self.tree
    }

    #[inline]
    pub fn observers(&self) -> &PathEventHub {
        &self.observers
    }

    /// Mounted internal roots, sorted.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.roots.iter().map(String::as_str)
    }

    // -----------------------------------------------------------------------
    // Root management
    // -----------------------------------------------------------------------

    /// Mounts a content root and grafts it into the virtual tree.
    ///
    /// Returns the virtual paths that were created, ancestors first. Mounting
    /// an already-known root is a no-op.
    pub fn root_path_added(&mut self, root: &str) -> Result<Vec<String>> {
        debug_check_path(root);
        if root_of(root) != Some(root) {
            return Err(CatalogError::InvalidPath(format!(
                "content roots must be a single segment: {root}"
            )));
        }
        if !self.roots.insert(root.to_string()) {
            return Ok(Vec::new());
        }
        let virtual_root = self.root_virtual_path(root);
        let created = self.tree.insert_mount(&virtual_root, root);
        log::info!(
            "content root mounted root={} virtual={} kind={:?} created_nodes={}",
            root,
            virtual_root,
            self.classifier.kind(root),
            created.len()
        );
        self.observers.notify_root_added(root, &virtual_root);
        Ok(created)
    }

    /// Dismounts a content root.
    ///
    /// Returns the virtual paths removed from the tree, deepest first; empty
    /// if the root was not mounted.
    pub fn root_path_removed(&mut self, root: &str) -> Vec<String> {
        debug_check_path(root);
        if !self.roots.remove(root) {
            return Vec::new();
        }
        let virtual_root = self.root_virtual_path(root);
        let removed = self.tree.remove_mount(&virtual_root);
        log::info!(
            "content root dismounted root={} virtual={} removed_nodes={}",
            root,
            virtual_root,
            removed.len()
        );
        self.observers.notify_root_removed(root);
        removed
    }

    /// Broadcasts a registry path addition to observers.
    pub fn notify_path_added(&self, path: &str, parent: &str) {
        self.observers.notify_path_added(path, parent);
    }

    /// Broadcasts a registry path removal to observers.
    pub fn notify_path_removed(&self, path: &str) {
        self.observers.notify_path_removed(path);
    }

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    /// Virtual path a mounted (or mountable) root is presented at.
    pub fn root_virtual_path(&self, root: &str) -> String {
        let prefix = self.config.virtual_prefix();
        if self.config.organize_plugins && self.classifier.kind(root) == RootKind::Plugin {
            format!("{prefix}/{PLUGINS_FOLDER}{root}")
        } else {
            format!("{prefix}{root}")
        }
    }

    /// True if the internal path lies under a mounted root.
    ///
    /// Root comparison is case-insensitive, matching registry semantics.
    pub fn is_known_content_path(&self, internal: &str) -> bool {
        let Some(root) = root_of(internal) else {
            return false;
        };
        self.roots
            .iter()
            .any(|known| known.eq_ignore_ascii_case(root))
    }

    /// True if the internal path is itself a mounted root.
    pub fn is_root_content_path(&self, internal: &str) -> bool {
        self.roots.contains(internal)
    }

    /// Family of the root an internal path belongs to.
    pub fn root_kind(&self, internal: &str) -> Option<RootKind> {
        let root = root_of(internal)?;
        self.roots
            .contains(root)
            .then(|| self.classifier.kind(root))
    }

    pub fn path_type(&self, virtual_path: &str) -> PathType {
        debug_check_path(virtual_path);
        match self.tree.closest_node(virtual_path) {
            Some((_, node)) if node.internal.is_some() => PathType::Internal,
            Some((found, _)) if found == virtual_path => PathType::Virtual,
            _ => PathType::Invalid,
        }
    }

    /// Maps a virtual path to its internal path, if it lies under a mount.
    pub fn try_convert_virtual_to_internal(&self, virtual_path: &str) -> Option<String> {
        debug_check_path(virtual_path);
        let (found, node) = self.tree.closest_node(virtual_path)?;
        let internal = node.internal.as_deref()?;
        Some(format!("{internal}{}", &virtual_path[found.len()..]))
    }

    /// Maps an internal path to the virtual path callers see.
    pub fn try_convert_internal_to_virtual(&self, internal: &str) -> Option<String> {
        debug_check_path(internal);
        let root = root_of(internal)?;
        if !self.roots.contains(root) {
            return None;
        }
        Some(format!(
            "{}{}",
            self.root_virtual_path(root),
            &internal[root.len()..]
        ))
    }

    /// Nearest enclosing mount of a virtual path, as (virtual, internal).
    pub fn mount_for_virtual<'a>(&'a self, virtual_path: &'a str) -> Option<(&'a str, &'a str)> {
        let (found, node) = self.tree.closest_node(virtual_path)?;
        Some((found, node.internal.as_deref()?))
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    /// Walks the sub paths of a virtual path, parent before child.
    ///
    /// Fully virtual folders are reported with no internal path. Below a
    /// mount, sub paths come from the registry. The visitor returns `false`
    /// to stop; the return value reports whether the walk completed.
    pub fn enumerate_sub_paths<F>(
        &self,
        registry: &dyn AssetRegistry,
        virtual_path: &str,
        recursive: bool,
        mut visit: F,
    ) -> bool
    where
        F: FnMut(&str, Option<&str>) -> bool,
    {
        debug_check_path(virtual_path);
        if !self.tree.is_fully_virtual(virtual_path) {
            let Some(internal) = self.try_convert_virtual_to_internal(virtual_path) else {
                return true;
            };
            return self.enumerate_registry_sub_paths(registry, &internal, recursive, &mut visit);
        }

        let mut stack: Vec<&str> = match self.tree.get(virtual_path) {
            Some(node) => node.children.iter().rev().map(String::as_str).collect(),
            None => return true,
        };
        while let Some(current) = stack.pop() {
            let Some(node) = self.tree.get(current) else {
                continue;
            };
            match node.internal.as_deref() {
                Some(internal) => {
                    if !visit(current, Some(internal)) {
                        return false;
                    }
                    if recursive
                        && !self.enumerate_registry_sub_paths(registry, internal, true, &mut visit)
                    {
                        return false;
                    }
                }
                None => {
                    if !visit(current, None) {
                        return false;
                    }
                    if recursive {
                        stack.extend(node.children.iter().rev().map(String::as_str));
                    }
                }
            }
        }
        true
    }

    fn enumerate_registry_sub_paths<F>(
        &self,
        registry: &dyn AssetRegistry,
        internal: &str,
        recursive: bool,
        visit: &mut F,
    ) -> bool
    where
        F: FnMut(&str, Option<&str>) -> bool,
    {
        let mut completed = true;
        registry.enumerate_sub_paths(internal, recursive, &mut |sub_path| {
            let Some(virtual_sub) = self.try_convert_internal_to_virtual(sub_path) else {
                return true;
            };
            if !visit(&virtual_sub, Some(sub_path)) {
                completed = false;
                return false;
            }
            true
        });
        completed
    }

    /// True if a virtual path names a tree node or an existing registry path.
    pub fn path_exists(&self, registry: &dyn AssetRegistry, virtual_path: &str) -> bool {
        match self.path_type(virtual_path) {
            PathType::Virtual => true,
            PathType::Internal => self
                .try_convert_virtual_to_internal(virtual_path)
                .is_some_and(|internal| {
                    self.is_root_content_path(&internal) || registry.path_exists(&internal)
                }),
            PathType::Invalid => false,
        }
    }

    /// Internal paths of every mount at or under a virtual path.
    pub fn internal_roots_under(&self, virtual_path: &str) -> Vec<String> {
        if let Some(internal) = self.try_convert_virtual_to_internal(virtual_path) {
            return vec![internal];
        }
        self.tree
            .mounts_under(virtual_path)
            .into_iter()
            .map(|(_, internal)| internal)
            .collect()
    }

    /// True if `internal` lies under any mounted root below `virtual_path`.
    pub fn is_internal_in_scope(&self, virtual_path: &str, internal: &str) -> bool {
        self.internal_roots_under(virtual_path)
            .iter()
            .any(|root| is_path_or_descendant(internal, root))
    }
}
