//! The asset data source: the facade a content browser talks to.
//!
//! Owns the path space, the filter cache and the folder attribute store, and
//! borrows the registry, collection manager and asset operations
//! collaborators. Registry and mount notifications arrive through the
//! `on_*` handlers and leave as [`ItemUpdate`](crate::events::ItemUpdate)s
//! on the update queue.
//!
//! Visitors passed to enumeration run while the path space is read-locked;
//! they must not mount or dismount roots.

mod attributes;
mod bridge;
mod discovery;
mod operations;

use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

pub use attributes::FolderAttributeStore;
pub use discovery::discovery_status_text;
pub use operations::{AssetOperations, OperationTarget};

use crate::collection::CollectionManager;
use crate::config::CatalogConfig;
use crate::enumerate::EnumerationContext;
use crate::error::Result;
use crate::events::{ItemUpdateQueue, ObserverId};
use crate::filter::{CompiledFilter, DataFilter, FilterCache, FilterCacheId, FilterCompiler};
use crate::item::{DataSourceId, Item};
use crate::path::PathSpace;
use crate::permission::PathPermissionList;
use crate::registry::{AssetRegistry, FileLoadProgress};
use crate::types::{FolderAttributes, FolderVisibilityFlags, ItemTypeFilter, PathType};

pub struct AssetDataSource {
    id: DataSourceId,
    space: RwLock<PathSpace>,
    registry: Arc<dyn AssetRegistry>,
    collections: Arc<dyn CollectionManager>,
    operations: Option<Arc<dyn AssetOperations>>,
    write_permission: Option<Arc<PathPermissionList>>,
    cache: Arc<FilterCache>,
    cache_observer: ObserverId,
    attributes: Mutex<FolderAttributeStore>,
    updates: ItemUpdateQueue,
    last_progress: Mutex<Option<FileLoadProgress>>,
}

impl std::fmt::Debug for AssetDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetDataSource")
            .field("id", &self.id)
            .field("space", &*self.space.read())
            .field("cache_entries", &self.cache.len())
            .field("pending_updates", &self.updates.len())
            .finish()
    }
}

impl AssetDataSource {
    pub fn new(
        config: CatalogConfig,
        registry: Arc<dyn AssetRegistry>,
        collections: Arc<dyn CollectionManager>,
    ) -> Result<Self> {
        config.validate()?;
        let space = PathSpace::new(config);
        let cache = Arc::new(FilterCache::new(space.classifier().clone()));
        let cache_observer = space.observers().subscribe(cache.clone());
        let id = DataSourceId::next();
        log::info!("asset data source created id={}", id.get());
        Ok(Self {
            id,
            space: RwLock::new(space),
            registry,
            collections,
            operations: None,
            write_permission: None,
            cache,
            cache_observer,
            attributes: Mutex::new(FolderAttributeStore::default()),
            updates: ItemUpdateQueue::new(),
            last_progress: Mutex::new(None),
        })
    }

    /// Enables the item operations.
    pub fn with_operations(mut self, operations: Arc<dyn AssetOperations>) -> Self {
        self.operations = Some(operations);
        self
    }

    /// Restricts where item operations may write.
    pub fn with_write_permission(mut self, list: Arc<PathPermissionList>) -> Self {
        self.write_permission = Some(list);
        self
    }

    #[inline]
    pub fn id(&self) -> DataSourceId {
        self.id
    }

    /// Read access to the path space.
    pub fn space(&self) -> RwLockReadGuard<'_, PathSpace> {
        self.space.read()
    }

    #[inline]
    pub fn registry(&self) -> &dyn AssetRegistry {
        self.registry.as_ref()
    }

    #[inline]
    pub fn filter_cache(&self) -> &FilterCache {
        &self.cache
    }

    #[inline]
    pub fn update_queue(&self) -> &ItemUpdateQueue {
        &self.updates
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn compile_filter(&self, virtual_path: &str, filter: &DataFilter) -> CompiledFilter {
        let space = self.space.read();
        FilterCompiler::new(
            self.id,
            &space,
            self.registry.as_ref(),
            self.collections.as_ref(),
            &self.cache,
        )
        .compile(virtual_path, filter)
    }

    pub fn enumerate_items_matching_filter<F>(&self, filter: &CompiledFilter, visit: F) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        let space = self.space.read();
        self.context(&space)
            .enumerate_items_matching_filter(filter, visit)
    }

    pub fn enumerate_items_at_path<F>(
        &self,
        virtual_path: &str,
        item_types: ItemTypeFilter,
        visit: F,
    ) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        let space = self.space.read();
        self.context(&space)
            .enumerate_items_at_path(virtual_path, item_types, visit)
    }

    pub fn enumerate_items_at_paths<F>(
        &self,
        virtual_paths: &[&str],
        item_types: ItemTypeFilter,
        visit: F,
    ) -> bool
    where
        F: FnMut(Item) -> bool,
    {
        let space = self.space.read();
        self.context(&space)
            .enumerate_items_at_paths(virtual_paths, item_types, visit)
    }

    pub fn does_item_pass_filter(&self, item: &Item, filter: &CompiledFilter) -> bool {
        let space = self.space.read();
        self.context(&space).does_item_pass_filter(item, filter)
    }

    pub fn convert_item_for_filter(&self, item: &mut Item, filter: &CompiledFilter) -> bool {
        let space = self.space.read();
        self.context(&space).convert_item_for_filter(item, filter)
    }

    /// Whether a folder should be listed.
    ///
    /// Internal folders follow their attributes: always-visible folders are
    /// shown, cooked private folders never are, and empty folders only when
    /// hiding is off. Virtual folders need a visible mount below them when
    /// hiding is on.
    pub fn is_folder_visible(&self, virtual_path: &str, flags: FolderVisibilityFlags) -> bool {
        let space = self.space.read();
        let hide_empty = flags.contains(FolderVisibilityFlags::HIDE_EMPTY_FOLDERS)
            || space.config().hide_empty_folders;
        match space.path_type(virtual_path) {
            PathType::Invalid => false,
            PathType::Internal => space
                .try_convert_virtual_to_internal(virtual_path)
                .is_some_and(|internal| self.attributes.lock().is_visible(&internal, hide_empty)),
            PathType::Virtual if !hide_empty => true,
            PathType::Virtual => {
                let attributes = self.attributes.lock();
                space
                    .tree()
                    .mounts_under(virtual_path)
                    .iter()
                    .any(|(_, internal)| attributes.is_visible(internal, true))
            }
        }
    }

    pub fn folder_attributes(&self, internal_path: &str) -> FolderAttributes {
        self.attributes.lock().get(internal_path)
    }

    /// Asks the registry to scan the folder behind `virtual_path` first.
    pub fn prioritize_search_path(&self, virtual_path: &str) {
        let space = self.space.read();
        match space.try_convert_virtual_to_internal(virtual_path) {
            Some(internal) => self.registry.prioritize_search_path(&internal),
            None => {
                for internal in space.internal_roots_under(virtual_path) {
                    self.registry.prioritize_search_path(&internal);
                }
            }
        }
    }

    pub fn remove_unused_cached_data(&self, id: FilterCacheId, in_use: &[String]) {
        self.cache.remove_unused_cached_data(id, in_use);
    }

    pub fn clear_cached_data(&self, id: FilterCacheId) {
        self.cache.clear_cached_data(id);
    }

    fn context<'s>(&'s self, space: &'s PathSpace) -> EnumerationContext<'s> {
        EnumerationContext::new(self.id, space, self.registry.as_ref())
    }
}

impl Drop for AssetDataSource {
    fn drop(&mut self) {
        self.space.read().observers().unsubscribe(self.cache_observer);
    }
}
