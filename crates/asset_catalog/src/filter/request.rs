//! Declarative filter requests.

use std::sync::Arc;

use super::cache::FilterCacheId;
use crate::collection::CollectionRef;
use crate::permission::PathPermissionList;
use crate::registry::{AssetData, AssetFilter, CompiledAssetFilter};
use crate::types::{ItemAttributeFilter, ItemCategoryFilter, ItemTypeFilter};

/// Compiles a primitive registry filter on behalf of a legacy caller.
pub type CompileCallback = Arc<dyn Fn(&AssetFilter) -> CompiledAssetFilter + Send + Sync>;

/// Supplies extra, non-registry assets for a query.
pub type CustomSourceAssetsCallback = Arc<dyn Fn(&AssetFilter) -> Vec<AssetData> + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct ObjectFilter {
    pub object_names_to_include: Vec<String>,
    pub object_names_to_exclude: Vec<String>,
    pub tags_and_values_to_include: Vec<(String, Option<String>)>,
    pub tags_and_values_to_exclude: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    pub package_names_to_include: Vec<String>,
    pub package_names_to_exclude: Vec<String>,
    pub package_paths_to_include: Vec<String>,
    pub package_paths_to_exclude: Vec<String>,
    pub recursive_package_paths_to_include: bool,
    pub recursive_package_paths_to_exclude: bool,
    pub path_permission_list: Option<Arc<PathPermissionList>>,
}

#[derive(Debug, Clone, Default)]
pub struct ClassFilter {
    pub class_names_to_include: Vec<String>,
    pub class_names_to_exclude: Vec<String>,
    pub recursive_class_names_to_include: bool,
    pub recursive_class_names_to_exclude: bool,
    pub class_permission_list: Option<Arc<PathPermissionList>>,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionFilter {
    pub selected_collections: Vec<CollectionRef>,
    pub include_child_collections: bool,
}

/// Surfaces assets that fail class filtering as "unsupported" items.
#[derive(Debug, Clone)]
pub struct UnsupportedClassFilter {
    /// Classes an asset must pass to be shown normally.
    pub class_permission_list: Arc<PathPermissionList>,
    /// Folders in which unsupported assets may appear.
    pub folder_permission_list: Option<Arc<PathPermissionList>>,
}

/// Hooks for callers that compile primitive filters themselves.
#[derive(Clone, Default)]
pub struct LegacyFilter {
    pub compile: Option<CompileCallback>,
    pub custom_source_assets: Option<CustomSourceAssetsCallback>,
}

impl std::fmt::Debug for LegacyFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyFilter")
            .field("compile", &self.compile.is_some())
            .field("custom_source_assets", &self.custom_source_assets.is_some())
            .finish()
    }
}

/// What the browser asks a data source for.
#[derive(Debug, Clone, Default)]
pub struct DataFilter {
    pub recursive_paths: bool,
    pub item_types: ItemTypeFilter,
    pub item_categories: ItemCategoryFilter,
    pub item_attributes: ItemAttributeFilter,
    /// Enables caching of recursive path scopes for this consumer.
    pub cache_id: Option<FilterCacheId>,
    pub object_filter: Option<ObjectFilter>,
    pub package_filter: Option<PackageFilter>,
    pub class_filter: Option<ClassFilter>,
    pub collection_filter: Option<CollectionFilter>,
    pub unsupported_class_filter: Option<UnsupportedClassFilter>,
    pub legacy_filter: Option<LegacyFilter>,
}

impl DataFilter {
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive_paths = recursive;
        self
    }

    pub fn item_types(mut self, item_types: ItemTypeFilter) -> Self {
        self.item_types = item_types;
        self
    }

    pub fn attributes(mut self, attributes: ItemAttributeFilter) -> Self {
        self.item_attributes = attributes;
        self
    }

    pub fn cached(mut self, cache_id: FilterCacheId) -> Self {
        self.cache_id = Some(cache_id);
        self
    }

    pub fn path_permission_list(&self) -> Option<&Arc<PathPermissionList>> {
        self.package_filter
            .as_ref()
            .and_then(|filter| filter.path_permission_list.as_ref())
    }

    pub fn class_permission_list(&self) -> Option<&Arc<PathPermissionList>> {
        self.class_filter
            .as_ref()
            .and_then(|filter| filter.class_permission_list.as_ref())
    }
}
