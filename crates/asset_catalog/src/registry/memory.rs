//! In-memory asset registry.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use fnv::{FnvHashMap, FnvHashSet};
use parking_lot::RwLock;

use super::asset::AssetData;
use super::filter::{AssetFilter, CompiledAssetFilter};
use super::{AssetRegistry, FileLoadProgress};
use crate::path::{is_descendant_path, is_path_or_descendant, parent_path};

#[derive(Debug, Default)]
struct MemoryState {
    /// Every known folder path; `/` is implicit.
    paths: BTreeSet<String>,
    /// Assets keyed by object path.
    assets: BTreeMap<String, AssetData>,
    /// Parent class -> directly derived classes.
    derived_classes: FnvHashMap<String, Vec<String>>,
    prioritized: Vec<String>,
    progress: FileLoadProgress,
}

/// Registry held entirely in memory.
///
/// Mutators return the folder paths they created or removed so callers can
/// forward them to the change bridge, the way a live registry broadcasts
/// them.
#[derive(Debug, Default)]
pub struct MemoryAssetRegistry {
    state: RwLock<MemoryState>,
    temporary_caching: AtomicBool,
    sub_path_queries: AtomicUsize,
    asset_queries: AtomicUsize,
}

impl MemoryAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Adds a folder path and any missing ancestors.
    ///
    /// Returns the newly created paths, ancestors first.
    pub fn add_path(&self, path: &str) -> Vec<String> {
        let mut state = self.state.write();
        insert_path_chain(&mut state.paths, path)
    }

    /// Removes a folder path with everything below it.
    ///
    /// Returns the removed folder paths, deepest first.
    pub fn remove_path(&self, path: &str) -> Vec<String> {
        let mut state = self.state.write();
        let mut removed: Vec<String> = state
            .paths
            .iter()
            .filter(|existing| is_path_or_descendant(existing, path))
            .cloned()
            .collect();
        for existing in &removed {
            state.paths.remove(existing);
        }
        state
            .assets
            .retain(|_, asset| !is_path_or_descendant(&asset.package_path, path));
        removed.reverse();
        removed
    }

    /// Stores an asset, creating its folder chain.
    ///
    /// Returns the folder paths created for it, ancestors first.
    pub fn add_asset(&self, asset: AssetData) -> Vec<String> {
        let mut state = self.state.write();
        let created = insert_path_chain(&mut state.paths, &asset.package_path);
        state.assets.insert(asset.object_path.clone(), asset);
        created
    }

    pub fn remove_asset(&self, object_path: &str) -> Option<AssetData> {
        self.state.write().assets.remove(object_path)
    }

    /// Replaces `old_object_path` with `asset`.
    ///
    /// Returns the folder paths created for the new location.
    pub fn rename_asset(&self, old_object_path: &str, asset: AssetData) -> Vec<String> {
        let mut state = self.state.write();
        state.assets.remove(old_object_path);
        let created = insert_path_chain(&mut state.paths, &asset.package_path);
        state.assets.insert(asset.object_path.clone(), asset);
        created
    }

    /// Registers a class, optionally derived from `parent`.
    pub fn add_class(&self, class_path: &str, parent: Option<&str>) {
        let mut state = self.state.write();
        if let Some(parent) = parent {
            let derived = state.derived_classes.entry(parent.to_string()).or_default();
            if !derived.iter().any(|existing| existing == class_path) {
                derived.push(class_path.to_string());
            }
        }
    }

    pub fn set_progress(&self, progress: FileLoadProgress) {
        self.state.write().progress = progress;
    }

    pub fn prioritized_paths(&self) -> Vec<String> {
        self.state.read().prioritized.clone()
    }

    /// Number of sub path enumerations served so far.
    pub fn sub_path_queries(&self) -> usize {
        self.sub_path_queries.load(Ordering::Relaxed)
    }

    /// Number of asset enumerations served so far.
    pub fn asset_queries(&self) -> usize {
        self.asset_queries.load(Ordering::Relaxed)
    }

    fn collect_sub_paths(&self, path: &str, recursive: bool) -> Vec<String> {
        let state = self.state.read();
        let lower = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };
        state
            .paths
            .range(lower.clone()..)
            .take_while(|candidate| candidate.starts_with(lower.as_str()))
            .filter(|candidate| recursive || !candidate[lower.len()..].contains('/'))
            .cloned()
            .collect()
    }

    fn derived_closure(state: &MemoryState, classes: &[String]) -> FnvHashSet<String> {
        let mut result = FnvHashSet::default();
        let mut stack: Vec<&str> = classes.iter().map(String::as_str).collect();
        while let Some(class) = stack.pop() {
            if !result.insert(class.to_string()) {
                continue;
            }
            if let Some(derived) = state.derived_classes.get(class) {
                stack.extend(derived.iter().map(String::as_str));
            }
        }
        result
    }
}

fn insert_path_chain(paths: &mut BTreeSet<String>, path: &str) -> Vec<String> {
    let mut created = Vec::new();
    let mut current = Some(path);
    while let Some(candidate) = current {
        if candidate == "/" || paths.contains(candidate) {
            break;
        }
        created.push(candidate.to_string());
        current = parent_path(candidate);
    }
    created.reverse();
    for path in &created {
        paths.insert(path.clone());
    }
    created
}

impl AssetRegistry for MemoryAssetRegistry {
    fn enumerate_sub_paths(
        &self,
        path: &str,
        recursive: bool,
        visit: &mut dyn FnMut(&str) -> bool,
    ) {
        self.sub_path_queries.fetch_add(1, Ordering::Relaxed);
        // Collected first so visitors may call back into the registry.
        for sub_path in self.collect_sub_paths(path, recursive) {
            if !visit(&sub_path) {
                break;
            }
        }
    }

    fn enumerate_assets(
        &self,
        filter: &CompiledAssetFilter,
        visit: &mut dyn FnMut(&AssetData) -> bool,
    ) {
        self.asset_queries.fetch_add(1, Ordering::Relaxed);
        let matches: Vec<AssetData> = self
            .state
            .read()
            .assets
            .values()
            .filter(|asset| filter.includes(asset))
            .cloned()
            .collect();
        for asset in &matches {
            if !visit(asset) {
                break;
            }
        }
    }

    fn assets_by_package_name(&self, package_name: &str) -> Vec<AssetData> {
        self.state
            .read()
            .assets
            .values()
            .filter(|asset| asset.package_name == package_name)
            .cloned()
            .collect()
    }

    fn asset_by_object_path(&self, object_path: &str) -> Option<AssetData> {
        self.state.read().assets.get(object_path).cloned()
    }

    fn path_exists(&self, path: &str) -> bool {
        path == "/" || self.state.read().paths.contains(path)
    }

    fn compile_filter(&self, filter: &AssetFilter) -> CompiledAssetFilter {
        let state = self.state.read();
        let mut package_paths: FnvHashSet<String> = filter.package_paths.iter().cloned().collect();
        if filter.recursive_paths {
            for base in &filter.package_paths {
                package_paths.extend(
                    state
                        .paths
                        .iter()
                        .filter(|candidate| is_descendant_path(candidate, base))
                        .cloned(),
                );
            }
        }
        let class_paths = if filter.recursive_classes {
            Self::derived_closure(&state, &filter.class_paths)
        } else {
            filter.class_paths.iter().cloned().collect()
        };
        CompiledAssetFilter {
            package_names: filter.package_names.iter().cloned().collect(),
            package_paths,
            soft_object_paths: filter.soft_object_paths.iter().cloned().collect(),
            class_paths,
            tags_and_values: filter.tags_and_values.clone(),
        }
    }

    fn prioritize_search_path(&self, path: &str) {
        self.state.write().prioritized.push(path.to_string());
    }

    fn is_loading_assets(&self) -> bool {
        !self.state.read().progress.is_complete()
    }

    fn file_load_progress(&self) -> FileLoadProgress {
        self.state.read().progress
    }

    fn temporary_caching_mode(&self) -> bool {
        self.temporary_caching.load(Ordering::Relaxed)
    }

    fn set_temporary_caching_mode(&self, enabled: bool) {
        self.temporary_caching.store(enabled, Ordering::Relaxed);
    }
}
