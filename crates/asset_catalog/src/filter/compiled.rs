//! Compiled filter state.

use std::sync::Arc;

use fnv::FnvHashSet;

use crate::config::RootClassifier;
use crate::item::DataSourceId;
use crate::path::{passes_attribute_filter, PathSpace};
use crate::permission::PathPermissionList;
use crate::registry::{AssetData, AssetRegistry, CompiledAssetFilter};
use crate::types::{ItemAttributeFilter, ItemTypeFilter};

/// Asset and folder state produced by one compile.
///
/// Folder results are either pre-enumerated (`cached_sub_paths`,
/// `virtual_sub_paths`) or deferred to a scan from
/// `virtual_path_to_scan_on_demand`; the folder predicate fields drive both.
#[derive(Debug, Clone)]
pub struct CompiledAssetDataFilter {
    /// No file can match; checked before any set.
    pub excludes_all_assets: bool,
    /// Every file fails the main class test; only unsupported items remain.
    pub excludes_all_classes: bool,

    /// Root of a deferred recursive folder scan.
    pub virtual_path_to_scan_on_demand: Option<String>,
    /// Pre-enumerated internal folder paths, sorted.
    pub cached_sub_paths: Vec<String>,
    /// Pre-enumerated fully virtual folder paths, sorted.
    pub virtual_sub_paths: Vec<String>,

    pub package_paths_to_include: PathPermissionList,
    pub recursive_package_paths_to_include: bool,
    pub package_paths_to_exclude: PathPermissionList,
    pub recursive_package_paths_to_exclude: bool,
    pub path_permission_list: Option<Arc<PathPermissionList>>,
    /// Folder paths excluded by the package filter, fully expanded.
    pub excluded_package_paths: FnvHashSet<String>,
    pub item_attribute_filter: ItemAttributeFilter,

    pub inclusive: CompiledAssetFilter,
    pub exclusive: CompiledAssetFilter,
    /// Assets supplied by the caller instead of the registry; always shown.
    pub custom_source_assets: Vec<AssetData>,
}

impl Default for CompiledAssetDataFilter {
    fn default() -> Self {
        Self {
            excludes_all_assets: true,
            excludes_all_classes: false,
            virtual_path_to_scan_on_demand: None,
            cached_sub_paths: Vec::new(),
            virtual_sub_paths: Vec::new(),
            package_paths_to_include: PathPermissionList::new(),
            recursive_package_paths_to_include: false,
            package_paths_to_exclude: PathPermissionList::new(),
            recursive_package_paths_to_exclude: false,
            path_permission_list: None,
            excluded_package_paths: FnvHashSet::default(),
            item_attribute_filter: ItemAttributeFilter::default(),
            inclusive: CompiledAssetFilter::default(),
            exclusive: CompiledAssetFilter::default(),
            custom_source_assets: Vec::new(),
        }
    }
}

impl CompiledAssetDataFilter {
    #[inline]
    pub fn runs_folder_query_on_demand(&self) -> bool {
        self.virtual_path_to_scan_on_demand.is_some()
    }

    /// Folder predicate for one internal path.
    pub fn path_passes(&self, internal: &str, roots: &RootClassifier) -> bool {
        if self.package_paths_to_include.has_filtering() {
            let included = if self.recursive_package_paths_to_include {
                self.package_paths_to_include
                    .passes_starts_with_filter(internal, true)
            } else {
                self.package_paths_to_include.passes_filter(internal)
            };
            if !included {
                return false;
            }
        }

        if self.package_paths_to_exclude.has_filtering() {
            let kept = if self.recursive_package_paths_to_exclude {
                self.package_paths_to_exclude
                    .passes_starts_with_filter(internal, false)
            } else {
                self.package_paths_to_exclude.passes_filter(internal)
            };
            if !kept {
                return false;
            }
        }

        if let Some(list) = self.path_permission_list.as_deref() {
            if list.has_filtering() && !list.passes_starts_with_filter(internal, true) {
                return false;
            }
        }

        if self.excluded_package_paths.contains(internal) {
            return false;
        }

        passes_attribute_filter(internal, 0, self.item_attribute_filter, roots)
    }

    /// A fully virtual folder passes when some mount below it passes.
    pub fn virtual_folder_passes(&self, space: &PathSpace, virtual_path: &str) -> bool {
        space
            .tree()
            .mounts_under(virtual_path)
            .iter()
            .any(|(_, internal)| self.path_passes(internal, space.classifier()))
    }

    pub fn is_custom_source_asset(&self, asset: &AssetData) -> bool {
        self.custom_source_assets
            .iter()
            .any(|custom| custom.object_path == asset.object_path)
    }
}

/// Secondary filter that reclassifies assets failing the class test.
#[derive(Debug, Clone, Default)]
pub struct UnsupportedAssetFilter {
    /// Main filter without class permission narrowing; drives the query.
    pub inclusive: CompiledAssetFilter,
    pub exclusive: CompiledAssetFilter,
    /// Folders in which unsupported items may appear.
    pub show_inclusive: CompiledAssetFilter,
    pub show_exclusive: CompiledAssetFilter,
    /// Class test an asset must fail to be shown as unsupported.
    pub convert_if_fail_inclusive: CompiledAssetFilter,
    pub convert_if_fail_exclusive: CompiledAssetFilter,
    /// The class list denies everything, so every asset fails the test.
    pub fails_all_classes: bool,
}

impl UnsupportedAssetFilter {
    pub fn passes_query(&self, registry: &dyn AssetRegistry, asset: &AssetData) -> bool {
        registry.is_asset_included_by_filter(asset, &self.inclusive)
            && !registry.is_asset_excluded_by_filter(asset, &self.exclusive)
    }

    pub fn passes_show_filter(&self, registry: &dyn AssetRegistry, asset: &AssetData) -> bool {
        registry.is_asset_included_by_filter(asset, &self.show_inclusive)
            && !registry.is_asset_excluded_by_filter(asset, &self.show_exclusive)
    }

    pub fn passes_convert_if_fail(&self, registry: &dyn AssetRegistry, asset: &AssetData) -> bool {
        !self.fails_all_classes
            && registry.is_asset_included_by_filter(asset, &self.convert_if_fail_inclusive)
            && !registry.is_asset_excluded_by_filter(asset, &self.convert_if_fail_exclusive)
    }
}

/// Result of compiling a [`DataFilter`](super::DataFilter) at a virtual path.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    pub owner: DataSourceId,
    pub virtual_path: String,
    pub item_types: ItemTypeFilter,
    pub recursive: bool,
    pub asset_filter: CompiledAssetDataFilter,
    pub unsupported_filter: Option<UnsupportedAssetFilter>,
}

impl CompiledFilter {
    /// A filter that matches nothing.
    pub fn empty(
        owner: DataSourceId,
        virtual_path: &str,
        item_types: ItemTypeFilter,
        recursive: bool,
    ) -> Self {
        Self {
            owner,
            virtual_path: virtual_path.to_string(),
            item_types,
            recursive,
            asset_filter: CompiledAssetDataFilter::default(),
            unsupported_filter: None,
        }
    }

    #[inline]
    pub fn includes_folders(&self) -> bool {
        self.item_types.contains(ItemTypeFilter::FOLDERS)
    }

    #[inline]
    pub fn includes_files(&self) -> bool {
        self.item_types.contains(ItemTypeFilter::FILES)
    }

    #[inline]
    pub fn excludes_all_assets(&self) -> bool {
        self.asset_filter.excludes_all_assets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;

    const NONE: [&str; 0] = [];

    fn roots() -> RootClassifier {
        CatalogConfig::default().root_classifier()
    }

    #[test]
    fn default_excludes_everything() {
        let filter = CompiledAssetDataFilter::default();
        assert!(filter.excludes_all_assets);
        assert!(!filter.runs_folder_query_on_demand());
    }

    #[test]
    fn include_list_admits_parents_when_recursive() {
        let roots = roots();
        let filter = CompiledAssetDataFilter {
            package_paths_to_include: PathPermissionList::from_entries(["/Game/A/B"], NONE),
            recursive_package_paths_to_include: true,
            ..Default::default()
        };
        assert!(filter.path_passes("/Game/A", &roots));
        assert!(filter.path_passes("/Game/A/B/C", &roots));
        assert!(!filter.path_passes("/Game/A/C", &roots));
    }

    #[test]
    fn exclusions_and_attributes_reject() {
        let roots = roots();
        let filter = CompiledAssetDataFilter {
            package_paths_to_exclude: PathPermissionList::from_entries(NONE, ["/Game/Old"]),
            recursive_package_paths_to_exclude: true,
            excluded_package_paths: ["/Game/Tmp".to_string()].into_iter().collect(),
            ..Default::default()
        };
        assert!(!filter.path_passes("/Game/Old/Stuff", &roots));
        assert!(!filter.path_passes("/Game/Tmp", &roots));
        assert!(!filter.path_passes("/Game/Developers", &roots));
        assert!(filter.path_passes("/Game/New", &roots));
    }

    #[test]
    fn permission_list_allows_parents() {
        let roots = roots();
        let filter = CompiledAssetDataFilter {
            path_permission_list: Some(Arc::new(PathPermissionList::from_entries(
                ["/Game/Public"],
                NONE,
            ))),
            ..Default::default()
        };
        assert!(filter.path_passes("/Game", &roots));
        assert!(filter.path_passes("/Game/Public/A", &roots));
        assert!(!filter.path_passes("/Game/Private", &roots));
    }
}
