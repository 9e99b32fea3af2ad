//! The asset registry collaborator.
//!
//! The catalog never owns asset storage. It reads paths and assets through
//! [`AssetRegistry`] and is told about changes through the change bridge.
//! [`MemoryAssetRegistry`] is a complete in-process implementation used by
//! tests and embedders without a disk-backed registry.

mod asset;
mod filter;
mod memory;

pub use asset::{AssetData, PackageFlags};
pub use filter::{AssetFilter, CompiledAssetFilter};
pub use memory::MemoryAssetRegistry;

/// Progress of the registry's initial discovery and load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileLoadProgress {
    pub total_assets: usize,
    pub processed_assets: usize,
    /// Still searching the disk for package files.
    pub discovering_files: bool,
}

impl FileLoadProgress {
    pub fn is_complete(&self) -> bool {
        !self.discovering_files && self.processed_assets >= self.total_assets
    }
}

/// Read-side interface of the asset registry.
///
/// Visitors return `false` to stop enumeration early.
pub trait AssetRegistry: Send + Sync {
    /// Visits the sub paths of `path`, parent before child.
    fn enumerate_sub_paths(&self, path: &str, recursive: bool, visit: &mut dyn FnMut(&str) -> bool);

    /// Visits every asset the inclusive filter accepts.
    fn enumerate_assets(
        &self,
        filter: &CompiledAssetFilter,
        visit: &mut dyn FnMut(&AssetData) -> bool,
    );

    /// All assets stored in one package.
    fn assets_by_package_name(&self, package_name: &str) -> Vec<AssetData>;

    fn asset_by_object_path(&self, object_path: &str) -> Option<AssetData>;

    fn path_exists(&self, path: &str) -> bool;

    /// Expands a declarative filter into flat sets.
    fn compile_filter(&self, filter: &AssetFilter) -> CompiledAssetFilter;

    fn is_asset_included_by_filter(&self, asset: &AssetData, filter: &CompiledAssetFilter) -> bool {
        filter.includes(asset)
    }

    fn is_asset_excluded_by_filter(&self, asset: &AssetData, filter: &CompiledAssetFilter) -> bool {
        filter.excludes(asset)
    }

    /// Asks the registry to scan `path` ahead of everything else.
    fn prioritize_search_path(&self, path: &str);

    fn is_loading_assets(&self) -> bool;

    fn file_load_progress(&self) -> FileLoadProgress;

    fn temporary_caching_mode(&self) -> bool;

    fn set_temporary_caching_mode(&self, enabled: bool);
}

/// Enables the registry's temporary caching mode for a scope.
///
/// The previous mode is restored when the guard drops, on every exit path.
pub struct TemporaryCachingGuard<'a> {
    registry: &'a dyn AssetRegistry,
    previous: bool,
}

impl<'a> TemporaryCachingGuard<'a> {
    pub fn new(registry: &'a dyn AssetRegistry) -> Self {
        let previous = registry.temporary_caching_mode();
        registry.set_temporary_caching_mode(true);
        Self { registry, previous }
    }
}

impl Drop for TemporaryCachingGuard<'_> {
    fn drop(&mut self) {
        self.registry.set_temporary_caching_mode(self.previous);
    }
}
