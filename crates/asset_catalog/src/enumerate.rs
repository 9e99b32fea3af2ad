//! Item enumeration over a compiled filter.
//!
//! Bulk enumeration and the single-item predicate live side by side so they
//! stay in lockstep: every rule applied while walking folders or querying
//! assets has a matching check in [`EnumerationContext::does_item_pass_filter`].

use std::collections::VecDeque;

use fnv::FnvHashSet;

use crate::filter::{CompiledAssetDataFilter, CompiledFilter};
use crate::item::{DataSourceId, FileItem, FolderItem, Item};
use crate::path::{is_descendant_path, parent_path, PathSpace};
use crate::registry::{AssetData, AssetRegistry};
use crate::types::{ItemTypeFilter, PathType, RootKind};

/// How an asset that passes the file phase is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClassification {
    Normal,
    Unsupported,
}

/// Borrowed view of everything one enumeration needs.
pub struct EnumerationContext<'a> {
    pub owner: DataSourceId,
    pub space: &'a PathSpace,
    pub registry: &'a dyn AssetRegistry,
}

impl<'a> EnumerationContext<'a> {
    pub fn new(owner: DataSourceId, space: &'a PathSpace, registry: &'a dyn AssetRegistry) -> Self {
        Self {
            owner,
            space,
            registry,
        }
    }

    // -----------------------------------------------------------------------
    // Item construction
    // -----------------------------------------------------------------------

    pub fn folder_item(&self, virtual_path: &str, internal_path: Option<&str>) -> Item {
        let is_plugin = internal_path
            .and_then(|internal| self.space.root_kind(internal))
            .is_some_and(|kind| kind == RootKind::Plugin);
        Item::Folder(FolderItem {
            owner: self.owner,
            virtual_path: virtual_path.to_string(),
            internal_path: internal_path.map(str::to_string),
            is_plugin,
        })
    }

    /// File item for an asset, or `None` if its package has no virtual path.
    pub fn file_item(&self, asset: &AssetData, classification: AssetClassification) -> Option<Item> {
        let virtual_path = self
            .space
            .try_convert_internal_to_virtual(&asset.package_name)?;
        let file = FileItem {
            owner: self.owner,
            virtual_path,
            asset: asset.clone(),
        };
        Some(match classification {
            AssetClassification::Normal => Item::File(file),
            AssetClassification::Unsupported => Item::UnsupportedFile(file),
        })
    }

    // -----------------------------------------------------------------------
    // Bulk enumeration
    // -----------------------------------------------------------------------

    /// Emits every item matching `filter`, folders first.
    ///
    /// Returns `false` if the visitor stopped the walk.
    pub fn enumerate_items_matching_filter<F>(&self, filter: &CompiledFilter, mut visit: F) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        if filter.owner != self.owner {
            log::warn!(
                "compiled filter belongs to another data source path={} owner={}",
                filter.virtual_path,
                filter.owner.get()
            );
            return true;
        }
        if filter.includes_folders() && !self.enumerate_folders(filter, &mut visit) {
            return false;
        }
        if filter.includes_files() && !self.enumerate_files(filter, &mut visit) {
            return false;
        }
        true
    }

    fn enumerate_folders<F>(&self, filter: &CompiledFilter, visit: &mut F) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        let asset_filter = &filter.asset_filter;
        if let Some(scan_root) = asset_filter.virtual_path_to_scan_on_demand.as_deref() {
            return self.scan_folders_on_demand(asset_filter, scan_root, visit);
        }

        for virtual_path in &asset_filter.virtual_sub_paths {
            if !visit(self.folder_item(virtual_path, None)) {
                return false;
            }
        }
        for internal in &asset_filter.cached_sub_paths {
            let Some(virtual_path) = self.space.try_convert_internal_to_virtual(internal) else {
                continue;
            };
            if !visit(self.folder_item(&virtual_path, Some(internal.as_str()))) {
                return false;
            }
        }
        true
    }

    fn scan_folders_on_demand<F>(
        &self,
        filter: &CompiledAssetDataFilter,
        scan_root: &str,
        visit: &mut F,
    ) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        match self.space.path_type(scan_root) {
            PathType::Invalid => true,
            PathType::Internal => match self.space.try_convert_virtual_to_internal(scan_root) {
                Some(internal) => self.walk_internal_folders(filter, &internal, visit),
                None => true,
            },
            PathType::Virtual => self.scan_virtual_folders(filter, scan_root, visit),
        }
    }

    /// Breadth-first walk below an internal folder, descending only into
    /// folders that pass.
    fn walk_internal_folders<F>(
        &self,
        filter: &CompiledAssetDataFilter,
        internal_root: &str,
        visit: &mut F,
    ) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        let roots = self.space.classifier();
        let mut queue = VecDeque::from([internal_root.to_string()]);
        while let Some(current) = queue.pop_front() {
            let mut children = Vec::new();
            self.registry.enumerate_sub_paths(&current, false, &mut |child| {
                children.push(child.to_string());
                true
            });
            for child in children {
                if !filter.path_passes(&child, roots) {
                    continue;
                }
                let Some(virtual_path) = self.space.try_convert_internal_to_virtual(&child) else {
                    continue;
                };
                if !visit(self.folder_item(&virtual_path, Some(child.as_str()))) {
                    return false;
                }
                queue.push_back(child);
            }
        }
        true
    }

    /// Scan rooted at a fully virtual folder.
    ///
    /// Virtual folders carry no attributes, so mounts are tested first and
    /// the verdict is propagated up to their virtual ancestors. A second walk
    /// then emits in parent-before-child order.
    fn scan_virtual_folders<F>(
        &self,
        filter: &CompiledAssetDataFilter,
        scan_root: &str,
        visit: &mut F,
    ) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        let tree = self.space.tree();
        let roots = self.space.classifier();

        let mut passing: FnvHashSet<String> = FnvHashSet::default();
        for (mount, internal) in tree.mounts_under(scan_root) {
            if !filter.path_passes(&internal, roots) {
                continue;
            }
            let mut ancestor = parent_path(&mount);
            while let Some(path) = ancestor {
                if !is_descendant_path(path, scan_root) || !passing.insert(path.to_string()) {
                    break;
                }
                ancestor = parent_path(path);
            }
            passing.insert(mount);
        }

        let mut completed = true;
        tree.enumerate_sub_paths(scan_root, true, |path, node| {
            if !passing.contains(path) {
                return true;
            }
            let keep_going = match node.internal.as_deref() {
                None => visit(self.folder_item(path, None)),
                Some(internal) => {
                    visit(self.folder_item(path, Some(internal)))
                        && self.walk_internal_folders(filter, internal, visit)
                }
            };
            completed = keep_going;
            keep_going
        });
        completed
    }

    fn enumerate_files<F>(&self, filter: &CompiledFilter, visit: &mut F) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        let asset_filter = &filter.asset_filter;
        for asset in &asset_filter.custom_source_assets {
            let virtual_path = self
                .space
                .try_convert_internal_to_virtual(&asset.package_name)
                .unwrap_or_else(|| asset.package_name.clone());
            let item = Item::File(FileItem {
                owner: self.owner,
                virtual_path,
                asset: asset.clone(),
            });
            if !visit(item) {
                return false;
            }
        }

        if asset_filter.excludes_all_assets {
            return true;
        }

        let query = match filter.unsupported_filter.as_ref() {
            Some(unsupported) => &unsupported.inclusive,
            None => &asset_filter.inclusive,
        };
        let mut completed = true;
        self.registry.enumerate_assets(query, &mut |asset| {
            if asset_filter.is_custom_source_asset(asset) {
                return true;
            }
            let Some(item) = self
                .classify_asset(filter, asset)
                .and_then(|classification| self.file_item(asset, classification))
            else {
                return true;
            };
            completed = visit(item);
            completed
        });
        completed
    }

    // -----------------------------------------------------------------------
    // Single-item evaluation
    // -----------------------------------------------------------------------

    /// Decides whether a registry asset is shown, and how.
    pub fn classify_asset(
        &self,
        filter: &CompiledFilter,
        asset: &AssetData,
    ) -> Option<AssetClassification> {
        let asset_filter = &filter.asset_filter;
        if !asset.is_primary() || asset_filter.excludes_all_assets {
            return None;
        }

        let passes_main = !asset_filter.excludes_all_classes
            && self
                .registry
                .is_asset_included_by_filter(asset, &asset_filter.inclusive)
            && !self
                .registry
                .is_asset_excluded_by_filter(asset, &asset_filter.exclusive);

        let Some(unsupported) = filter.unsupported_filter.as_ref() else {
            return passes_main.then_some(AssetClassification::Normal);
        };
        if !unsupported.passes_query(self.registry, asset) {
            return None;
        }
        if passes_main {
            Some(AssetClassification::Normal)
        } else if !unsupported.passes_convert_if_fail(self.registry, asset)
            && unsupported.passes_show_filter(self.registry, asset)
        {
            Some(AssetClassification::Unsupported)
        } else {
            None
        }
    }

    /// True iff bulk enumeration of `filter` would produce `item`.
    pub fn does_item_pass_filter(&self, item: &Item, filter: &CompiledFilter) -> bool {
        if item.owner() != self.owner || filter.owner != self.owner {
            return false;
        }
        if !filter.item_types.contains(item.item_type()) {
            return false;
        }
        match item {
            Item::Folder(folder) => self.folder_passes(filter, &folder.virtual_path),
            Item::File(file) | Item::UnsupportedFile(file) => self.file_passes(filter, &file.asset),
        }
    }

    fn folder_passes(&self, filter: &CompiledFilter, virtual_path: &str) -> bool {
        let asset_filter = &filter.asset_filter;
        if let Some(scan_root) = asset_filter.virtual_path_to_scan_on_demand.as_deref() {
            return self.folder_passes_scan(asset_filter, scan_root, virtual_path);
        }

        if parent_path(virtual_path) != Some(filter.virtual_path.as_str()) {
            return false;
        }
        match self.space.path_type(virtual_path) {
            PathType::Internal => self
                .space
                .try_convert_virtual_to_internal(virtual_path)
                .is_some_and(|internal| {
                    asset_filter
                        .cached_sub_paths
                        .binary_search(&internal)
                        .is_ok()
                }),
            PathType::Virtual => asset_filter
                .virtual_sub_paths
                .binary_search_by(|candidate| candidate.as_str().cmp(virtual_path))
                .is_ok(),
            PathType::Invalid => false,
        }
    }

    fn folder_passes_scan(
        &self,
        filter: &CompiledAssetDataFilter,
        scan_root: &str,
        virtual_path: &str,
    ) -> bool {
        if !is_descendant_path(virtual_path, scan_root) {
            return false;
        }
        let roots = self.space.classifier();
        match self.space.path_type(scan_root) {
            PathType::Invalid => false,
            PathType::Internal => {
                let (Some(root), Some(internal)) = (
                    self.space.try_convert_virtual_to_internal(scan_root),
                    self.space.try_convert_virtual_to_internal(virtual_path),
                ) else {
                    return false;
                };
                self.internal_chain_passes(filter, &root, &internal)
            }
            PathType::Virtual => match self.space.tree().get(virtual_path) {
                Some(node) => match node.internal.as_deref() {
                    Some(internal) => filter.path_passes(internal, roots),
                    None => filter.virtual_folder_passes(self.space, virtual_path),
                },
                None => {
                    let Some((_, mount_internal)) = self.space.mount_for_virtual(virtual_path)
                    else {
                        return false;
                    };
                    let Some(internal) = self.space.try_convert_virtual_to_internal(virtual_path)
                    else {
                        return false;
                    };
                    filter.path_passes(mount_internal, roots)
                        && self.internal_chain_passes(filter, mount_internal, &internal)
                }
            },
        }
    }

    /// Every folder strictly below `root` down to `internal` passes, and
    /// `internal` exists.
    fn internal_chain_passes(
        &self,
        filter: &CompiledAssetDataFilter,
        root: &str,
        internal: &str,
    ) -> bool {
        if !is_descendant_path(internal, root) || !self.registry.path_exists(internal) {
            return false;
        }
        let roots = self.space.classifier();
        let mut current = internal;
        while current != root {
            if !filter.path_passes(current, roots) {
                return false;
            }
            match parent_path(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        true
    }

    fn file_passes(&self, filter: &CompiledFilter, asset: &AssetData) -> bool {
        let asset_filter = &filter.asset_filter;
        if asset_filter.is_custom_source_asset(asset) {
            return true;
        }
        if asset_filter.excludes_all_assets {
            return false;
        }
        self.space
            .try_convert_internal_to_virtual(&asset.package_name)
            .is_some()
            && self.classify_asset(filter, asset).is_some()
    }

    /// Switches a file item between its normal and unsupported variants.
    ///
    /// Returns `true` if the item changed.
    pub fn convert_item_for_filter(&self, item: &mut Item, filter: &CompiledFilter) -> bool {
        if item.owner() != self.owner {
            return false;
        }
        let Some(file) = item.as_file() else {
            return false;
        };
        let replacement = match (item.is_unsupported(), self.classify_asset(filter, &file.asset)) {
            (false, Some(AssetClassification::Unsupported)) => Item::UnsupportedFile(file.clone()),
            (true, Some(AssetClassification::Normal)) => Item::File(file.clone()),
            _ => return false,
        };
        *item = replacement;
        true
    }

    // -----------------------------------------------------------------------
    // Direct lookup
    // -----------------------------------------------------------------------

    /// Emits the folder at `virtual_path` and the primary assets of the
    /// package it names, as requested by `item_types`.
    pub fn enumerate_items_at_path<F>(
        &self,
        virtual_path: &str,
        item_types: ItemTypeFilter,
        mut visit: F,
    ) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        self.visit_items_at_path(virtual_path, item_types, &mut visit)
    }

    pub fn enumerate_items_at_paths<F>(
        &self,
        virtual_paths: &[&str],
        item_types: ItemTypeFilter,
        mut visit: F,
    ) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        virtual_paths
            .iter()
            .all(|virtual_path| self.visit_items_at_path(virtual_path, item_types, &mut visit))
    }

    fn visit_items_at_path<F>(
        &self,
        virtual_path: &str,
        item_types: ItemTypeFilter,
        visit: &mut F,
    ) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        let internal = self.space.try_convert_virtual_to_internal(virtual_path);

        if item_types.contains(ItemTypeFilter::FOLDERS)
            && self.space.path_exists(self.registry, virtual_path)
            && !visit(self.folder_item(virtual_path, internal.as_deref()))
        {
            return false;
        }

        if item_types.contains(ItemTypeFilter::FILES) {
            let Some(package_name) = internal else {
                return true;
            };
            for asset in self.registry.assets_by_package_name(&package_name) {
                if !asset.is_primary() {
                    continue;
                }
                let Some(item) = self.file_item(&asset, AssetClassification::Normal) else {
                    continue;
                };
                if !visit(item) {
                    return false;
                }
            }
        }
        true
    }
}
