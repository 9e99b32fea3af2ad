//! Virtual folder tree over the mounted content roots.
//!
//! The tree only holds the mount-level skeleton: synthetic folders plus one
//! node per mounted root. Everything below a mount is owned by the asset
//! registry and enumerated on demand.

use fnv::FnvHashMap;
use thin_vec::ThinVec;

use super::util::{is_descendant_path, parent_path};

/// A node of the virtual tree.
#[derive(Debug, Clone, Default)]
pub struct VirtualNode {
    /// Internal path for mount nodes; `None` for fully virtual folders.
    pub internal: Option<String>,
    /// Virtual paths of the children, kept sorted.
    pub children: ThinVec<String>,
}

impl VirtualNode {
    #[inline]
    pub fn is_fully_virtual(&self) -> bool {
        self.internal.is_none()
    }
}

/// Hierarchical map from virtual path to node; `/` is always present.
#[derive(Debug)]
pub struct VirtualPathTree {
    nodes: FnvHashMap<String, VirtualNode>,
    /// Virtual folders that survive even with no mounts below them.
    pinned: Vec<String>,
}

impl VirtualPathTree {
    /// Creates a tree holding only `/` and the given pinned folders.
    pub fn new(pinned: &[&str]) -> Self {
        let mut tree = Self {
            nodes: FnvHashMap::default(),
            pinned: vec!["/".to_string()],
        };
        tree.nodes.insert("/".to_string(), VirtualNode::default());
        for path in pinned {
            if *path != "/" {
                tree.pinned.push((*path).to_string());
                tree.ensure_virtual_chain(path);
            }
        }
        tree
    }

    #[inline]
    pub fn get(&self, virtual_path: &str) -> Option<&VirtualNode> {
        self.nodes.get(virtual_path)
    }

    #[inline]
    pub fn contains(&self, virtual_path: &str) -> bool {
        self.nodes.contains_key(virtual_path)
    }

    /// True if the path names a node with no internal counterpart.
    pub fn is_fully_virtual(&self, virtual_path: &str) -> bool {
        self.nodes
            .get(virtual_path)
            .is_some_and(VirtualNode::is_fully_virtual)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a mount node and any missing virtual ancestors.
    ///
    /// Returns the virtual paths that were created, ancestors first.
    pub fn insert_mount(&mut self, virtual_path: &str, internal_path: &str) -> Vec<String> {
        let mut created = self.ensure_virtual_chain_parent(virtual_path);
        if !self.nodes.contains_key(virtual_path) {
            created.push(virtual_path.to_string());
        }
        let node = self.nodes.entry(virtual_path.to_string()).or_default();
        node.internal = Some(internal_path.to_string());
        if let Some(parent) = parent_path(virtual_path) {
            self.link_child(parent, virtual_path);
        }
        created
    }

    /// Removes a mount node and prunes virtual ancestors left empty.
    ///
    /// Returns the virtual paths that were removed, deepest first.
    pub fn remove_mount(&mut self, virtual_path: &str) -> Vec<String> {
        let mut removed = Vec::new();
        if self.nodes.remove(virtual_path).is_none() {
            return removed;
        }
        removed.push(virtual_path.to_string());

        let mut child = virtual_path.to_string();
        while let Some(parent) = parent_path(&child).map(str::to_string) {
            let Some(node) = self.nodes.get_mut(&parent) else {
                break;
            };
            node.children.retain(|existing| existing != &child);
            let prunable = node.children.is_empty()
                && node.is_fully_virtual()
                && !self.pinned.iter().any(|p| p == &parent);
            if !prunable {
                break;
            }
            self.nodes.remove(&parent);
            removed.push(parent.clone());
            child = parent;
        }
        removed
    }

    /// Walks the subtree below `virtual_path`, parent before child.
    ///
    /// The visitor receives each descendant's virtual path and node and
    /// returns `false` to stop. Non-recursive walks only visit direct
    /// children.
    pub fn enumerate_sub_paths<F>(&self, virtual_path: &str, recursive: bool, mut visit: F) -> bool
    where
        F: FnMut(&str, &VirtualNode) -> bool,
    {
        let Some(start) = self.nodes.get(virtual_path) else {
            return true;
        };
        let mut stack: Vec<&str> = start.children.iter().rev().map(String::as_str).collect();
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            if !visit(current, node) {
                return false;
            }
            if recursive {
                stack.extend(node.children.iter().rev().map(String::as_str));
            }
        }
        true
    }

    /// Mount nodes at or below `virtual_path`, in tree order.
    pub fn mounts_under(&self, virtual_path: &str) -> Vec<(String, String)> {
        let mut mounts = Vec::new();
        if let Some(internal) = self.get(virtual_path).and_then(|n| n.internal.as_ref()) {
            mounts.push((virtual_path.to_string(), internal.clone()));
        }
        self.enumerate_sub_paths(virtual_path, true, |path, node| {
            if let Some(internal) = node.internal.as_ref() {
                mounts.push((path.to_string(), internal.clone()));
            }
            true
        });
        mounts
    }

    /// Nearest tree node at or above `virtual_path`.
    pub fn closest_node<'a>(&'a self, virtual_path: &'a str) -> Option<(&'a str, &'a VirtualNode)> {
        let mut current = virtual_path;
        loop {
            if let Some(node) = self.nodes.get(current) {
                return Some((current, node));
            }
            current = parent_path(current)?;
        }
    }

    /// True if any node strictly below `virtual_path` exists.
    pub fn has_descendants(&self, virtual_path: &str) -> bool {
        self.nodes
            .keys()
            .any(|path| is_descendant_path(path, virtual_path))
    }

    fn ensure_virtual_chain(&mut self, virtual_path: &str) -> Vec<String> {
        let mut created = self.ensure_virtual_chain_parent(virtual_path);
        if !self.nodes.contains_key(virtual_path) {
            self.nodes
                .insert(virtual_path.to_string(), VirtualNode::default());
            created.push(virtual_path.to_string());
            if let Some(parent) = parent_path(virtual_path) {
                self.link_child(parent, virtual_path);
            }
        }
        created
    }

    /// Creates missing virtual ancestors of `virtual_path`, top-down.
    fn ensure_virtual_chain_parent(&mut self, virtual_path: &str) -> Vec<String> {
        let mut missing = Vec::new();
        let mut current = parent_path(virtual_path);
        while let Some(path) = current {
            if self.nodes.contains_key(path) {
                break;
            }
            missing.push(path.to_string());
            current = parent_path(path);
        }
        missing.reverse();
        for path in &missing {
            self.nodes.insert(path.clone(), VirtualNode::default());
            if let Some(parent) = parent_path(path) {
                self.link_child(parent, path);
            }
        }
        missing
    }

    fn link_child(&mut self, parent: &str, child: &str) {
        let Some(node) = self.nodes.get_mut(parent) else {
            return;
        };
        if let Err(position) = node
            .children
            .binary_search_by(|existing| existing.as_str().cmp(child))
        {
            node.children.insert(position, child.to_string());
        }
    }
}
