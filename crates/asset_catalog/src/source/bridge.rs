//! Registry and mount notifications.
//!
//! Each handler updates folder attributes, the path space and the filter
//! cache, then queues the item updates the browser needs. Within one call,
//! folder updates are queued before the file updates they enable.

use super::AssetDataSource;
use crate::enumerate::AssetClassification;
use crate::error::Result;
use crate::events::ItemUpdate;
use crate::item::{FolderItem, Item};
use crate::path::{parent_path, passes_attribute_filter, PathSpace};
use crate::registry::AssetData;
use crate::types::{FolderAttributes, ItemAttributeFilter, RootKind};

impl AssetDataSource {
    // -----------------------------------------------------------------------
    // Assets
    // -----------------------------------------------------------------------

    pub fn on_asset_added(&self, asset: &AssetData) {
        let space = self.space.read();
        self.asset_added(&space, asset);
    }

    /// Batched form of [`on_asset_added`](Self::on_asset_added).
    pub fn on_assets_added(&self, assets: &[AssetData]) {
        let space = self.space.read();
        self.attributes.lock().begin_batch();
        for asset in assets {
            self.asset_added(&space, asset);
        }
        self.attributes.lock().end_batch();
    }

    pub fn on_asset_removed(&self, asset: &AssetData) {
        if !asset.is_primary() {
            return;
        }
        let space = self.space.read();
        if let Some(item) = self
            .context(&space)
            .file_item(asset, AssetClassification::Normal)
        {
            self.updates.push(ItemUpdate::removed(item));
        }
    }

    pub fn on_asset_renamed(&self, asset: &AssetData, old_object_path: &str) {
        if !asset.is_primary() {
            return;
        }
        let space = self.space.read();
        self.populate_folders(&space, asset);
        let old_package = old_object_path
            .split_once('.')
            .map_or(old_object_path, |(package, _)| package);
        let old_virtual_path = space
            .try_convert_internal_to_virtual(old_package)
            .unwrap_or_else(|| old_package.to_string());
        if let Some(item) = self
            .context(&space)
            .file_item(asset, AssetClassification::Normal)
        {
            self.updates.push(ItemUpdate::moved(item, old_virtual_path));
        }
    }

    pub fn on_asset_updated(&self, asset: &AssetData) {
        let space = self.space.read();
        self.asset_modified(&space, asset);
    }

    /// The package was rewritten on disk; its flags may have changed.
    pub fn on_asset_updated_on_disk(&self, asset: &AssetData) {
        let space = self.space.read();
        if asset.is_primary() {
            self.populate_folders(&space, asset);
        }
        self.asset_modified(&space, asset);
    }

    pub fn on_object_property_changed(&self, object_path: &str) {
        self.object_modified(object_path);
    }

    pub fn on_object_pre_save(&self, object_path: &str) {
        self.object_modified(object_path);
    }

    fn object_modified(&self, object_path: &str) {
        let Some(asset) = self.registry.asset_by_object_path(object_path) else {
            return;
        };
        let space = self.space.read();
        self.asset_modified(&space, &asset);
    }

    fn asset_added(&self, space: &PathSpace, asset: &AssetData) {
        if !asset.is_primary() {
            return;
        }
        self.populate_folders(space, asset);
        if let Some(item) = self
            .context(space)
            .file_item(asset, AssetClassification::Normal)
        {
            self.updates.push(ItemUpdate::added(item));
        }
    }

    fn asset_modified(&self, space: &PathSpace, asset: &AssetData) {
        if !asset.is_primary() {
            return;
        }
        if let Some(item) = self
            .context(space)
            .file_item(asset, AssetClassification::Normal)
        {
            self.updates.push(ItemUpdate::modified(item));
        }
    }

    /// Propagates an asset's attributes to its folders and queues a
    /// modification for each folder that changed.
    fn populate_folders(&self, space: &PathSpace, asset: &AssetData) {
        let mut flags = asset.folder_attributes();
        if space.root_kind(&asset.package_path) == Some(RootKind::Plugin) {
            flags |= FolderAttributes::IS_IN_PLUGIN;
        }
        let changed = self.attributes.lock().populate(&asset.package_path, flags);
        self.queue_folder_updates(space, &changed, ItemUpdate::modified);
    }

    fn queue_folder_updates(
        &self,
        space: &PathSpace,
        internal_paths: &[String],
        update: fn(Item) -> ItemUpdate,
    ) {
        let context = self.context(space);
        for internal in internal_paths {
            if let Some(virtual_path) = space.try_convert_internal_to_virtual(internal) {
                self.updates
                    .push(update(context.folder_item(&virtual_path, Some(internal.as_str()))));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Paths
    // -----------------------------------------------------------------------

    /// Registry folders that appeared.
    ///
    /// System folders no attribute filter can show are skipped. Folders
    /// under a plugin root are marked as plugin content.
    pub fn on_paths_added(&self, paths: &[&str]) {
        let space = self.space.read();
        let context = self.context(&space);
        self.attributes.lock().begin_batch();
        for &path in paths {
            let shown =
                passes_attribute_filter(path, 0, ItemAttributeFilter::INCLUDE_ALL, space.classifier());
            if !shown {
                continue;
            }
            if space.root_kind(path) == Some(RootKind::Plugin) {
                let changed: Vec<String> = self
                    .attributes
                    .lock()
                    .populate(path, FolderAttributes::IS_IN_PLUGIN)
                    .into_iter()
                    .filter(|changed| changed != path)
                    .collect();
                self.queue_folder_updates(&space, &changed, ItemUpdate::modified);
            }
            if let Some(virtual_path) = space.try_convert_internal_to_virtual(path) {
                self.updates
                    .push(ItemUpdate::added(context.folder_item(&virtual_path, Some(path))));
            }
            let parent = parent_path(path).unwrap_or("/");
            space.notify_path_added(path, parent);
        }
        self.attributes.lock().end_batch();
    }

    pub fn on_paths_removed(&self, paths: &[&str]) {
        let space = self.space.read();
        let context = self.context(&space);
        for &path in paths {
            self.attributes.lock().remove_path(path);
            space.notify_path_removed(path);
            if let Some(virtual_path) = space.try_convert_internal_to_virtual(path) {
                self.updates
                    .push(ItemUpdate::removed(context.folder_item(&virtual_path, Some(path))));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mounts and visibility
    // -----------------------------------------------------------------------

    /// Mounts a content root; the root is always visible from then on.
    pub fn on_content_path_mounted(&self, root: &str) -> Result<()> {
        let created = self.space.write().root_path_added(root)?;
        let space = self.space.read();

        let mut flags = FolderAttributes::ALWAYS_VISIBLE;
        if space.root_kind(root) == Some(RootKind::Plugin) {
            flags |= FolderAttributes::IS_IN_PLUGIN;
        }
        self.attributes.lock().mark(root, flags);

        let context = self.context(&space);
        for virtual_path in &created {
            let internal = space
                .tree()
                .get(virtual_path)
                .and_then(|node| node.internal.clone());
            self.updates.push(ItemUpdate::added(
                context.folder_item(virtual_path, internal.as_deref()),
            ));
        }
        Ok(())
    }

    pub fn on_content_path_dismounted(&self, root: &str) {
        let mut space = self.space.write();
        let root_virtual_path = space.root_virtual_path(root);
        let is_plugin = space.root_kind(root) == Some(RootKind::Plugin);
        let removed = space.root_path_removed(root);
        drop(space);

        self.attributes.lock().remove_under(root);
        for virtual_path in removed {
            let is_mount = virtual_path == root_virtual_path;
            let item = Item::Folder(FolderItem {
                owner: self.id,
                internal_path: is_mount.then(|| root.to_string()),
                is_plugin: is_mount && is_plugin,
                virtual_path,
            });
            self.updates.push(ItemUpdate::removed(item));
        }
    }

    /// Marks a folder and its ancestors as always visible.
    pub fn on_always_show_path(&self, virtual_path: &str) {
        let space = self.space.read();
        let Some(internal) = space.try_convert_virtual_to_internal(virtual_path) else {
            return;
        };
        let changed = self
            .attributes
            .lock()
            .populate(&internal, FolderAttributes::ALWAYS_VISIBLE);
        self.queue_folder_updates(&space, &changed, ItemUpdate::modified);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::collection::MemoryCollectionManager;
    use crate::config::CatalogConfig;
    use crate::events::{ItemUpdate, ItemUpdateKind};
    use crate::registry::{AssetData, MemoryAssetRegistry};
    use crate::source::AssetDataSource;
    use crate::types::FolderAttributes;

    fn source() -> (AssetDataSource, Arc<MemoryAssetRegistry>) {
        let registry = Arc::new(MemoryAssetRegistry::new());
        let source = AssetDataSource::new(
            CatalogConfig::default(),
            registry.clone(),
            Arc::new(MemoryCollectionManager::new()),
        )
        .unwrap();
        (source, registry)
    }

    fn summary(updates: &[ItemUpdate]) -> Vec<(String, String)> {
        updates
            .iter()
            .map(|update| {
                let kind = match &update.kind {
                    ItemUpdateKind::Added => "added".to_string(),
                    ItemUpdateKind::Removed => "removed".to_string(),
                    ItemUpdateKind::Modified => "modified".to_string(),
                    ItemUpdateKind::Moved { old_virtual_path } => format!("moved:{old_virtual_path}"),
                };
                (kind, update.item.virtual_path().to_string())
            })
            .collect()
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(kind, path)| (kind.to_string(), path.to_string()))
            .collect()
    }

    #[test]
    fn mount_marks_root_and_announces_folders() {
        let (source, _registry) = source();
        source.on_content_path_mounted("/Game").unwrap();
        source.on_content_path_mounted("/Paper2D").unwrap();
        assert!(source
            .folder_attributes("/Game")
            .contains(FolderAttributes::ALWAYS_VISIBLE));
        assert!(source
            .folder_attributes("/Paper2D")
            .contains(FolderAttributes::IS_IN_PLUGIN));
        let updates = source.update_queue().drain();
        assert_eq!(
            summary(&updates),
            pairs(&[("added", "/Game"), ("added", "/Paper2D")])
        );
        assert!(updates[1].item.as_folder().unwrap().is_plugin);
    }

    #[test]
    fn asset_added_updates_folders_before_the_file() {
        let (source, _registry) = source();
        source.on_content_path_mounted("/Game").unwrap();
        source.update_queue().drain();

        let asset = AssetData::new("/Game/Foo/Bar.Bar", "/Script/A").unwrap();
        source.on_asset_added(&asset);
        assert_eq!(
            summary(&source.update_queue().drain()),
            pairs(&[
                ("modified", "/Game"),
                ("modified", "/Game/Foo"),
                ("added", "/Game/Foo/Bar"),
            ])
        );

        let sub_object = AssetData::new("/Game/Foo/Bar.Inner", "/Script/A")
            .unwrap()
            .with_outer("/Game/Foo/Bar.Bar");
        source.on_asset_added(&sub_object);
        assert!(source.update_queue().is_empty());
    }

    #[test]
    fn rename_and_modification_events() {
        let (source, registry) = source();
        source.on_content_path_mounted("/Game").unwrap();
        let asset = AssetData::new("/Game/Foo/Bar.Bar", "/Script/A").unwrap();
        registry.add_asset(asset.clone());
        source.on_assets_added(&[asset.clone()]);
        source.update_queue().drain();

        let renamed = AssetData::new("/Game/Foo/Qux.Qux", "/Script/A").unwrap();
        source.on_asset_renamed(&renamed, "/Game/Foo/Bar.Bar");
        source.on_object_property_changed("/Game/Foo/Bar.Bar");
        source.on_object_pre_save("/Game/Missing.Missing");
        source.on_asset_removed(&renamed);
        assert_eq!(
            summary(&source.update_queue().drain()),
            pairs(&[
                ("moved:/Game/Foo/Bar", "/Game/Foo/Qux"),
                ("modified", "/Game/Foo/Bar"),
                ("removed", "/Game/Foo/Qux"),
            ])
        );
    }

    #[test]
    fn path_events_reach_the_cache_and_queue() {
        let (source, registry) = source();
        source.on_content_path_mounted("/Game").unwrap();
        source.update_queue().drain();

        registry.add_path("/Game/New");
        source.on_paths_added(&["/Game/New"]);
        source.on_paths_removed(&["/Game/New"]);
        assert_eq!(
            summary(&source.update_queue().drain()),
            pairs(&[("added", "/Game/New"), ("removed", "/Game/New")])
        );
    }

    #[test]
    fn added_paths_skip_external_folders_and_mark_plugins() {
        let (source, registry) = source();
        source.on_content_path_mounted("/Game").unwrap();
        source.on_content_path_mounted("/Paper2D").unwrap();
        source.update_queue().drain();

        registry.add_path("/Game/__ExternalActors__");
        registry.add_path("/Paper2D/Sprites/Trees");
        source.on_paths_added(&["/Game/__ExternalActors__", "/Paper2D/Sprites/Trees"]);
        assert_eq!(
            summary(&source.update_queue().drain()),
            pairs(&[
                ("modified", "/Paper2D/Sprites"),
                ("added", "/Paper2D/Sprites/Trees"),
            ])
        );
        assert!(source
            .folder_attributes("/Paper2D/Sprites/Trees")
            .contains(FolderAttributes::IS_IN_PLUGIN));
        assert!(!source
            .folder_attributes("/Paper2D/Sprites/Trees")
            .contains(FolderAttributes::HAS_CONTENT));
        assert_eq!(
            source.folder_attributes("/Game/__ExternalActors__"),
            FolderAttributes::empty()
        );
    }

    #[test]
    fn dismount_clears_attributes_and_prunes_virtual_folders() {
        let registry = Arc::new(MemoryAssetRegistry::new());
        let config = CatalogConfig {
            virtual_root: Some("/All".to_string()),
            organize_plugins: true,
            ..Default::default()
        };
        let source =
            AssetDataSource::new(config, registry, Arc::new(MemoryCollectionManager::new()))
                .unwrap();
        source.on_content_path_mounted("/Paper2D").unwrap();
        let asset = AssetData::new("/Paper2D/Sprites/Tree.Tree", "/Script/Sprite").unwrap();
        source.on_asset_added(&asset);
        assert!(source
            .folder_attributes("/Paper2D/Sprites")
            .contains(FolderAttributes::IS_IN_PLUGIN));
        source.update_queue().drain();

        source.on_content_path_dismounted("/Paper2D");
        assert_eq!(source.folder_attributes("/Paper2D/Sprites"), FolderAttributes::empty());
        let updates = source.update_queue().drain();
        assert_eq!(
            summary(&updates),
            pairs(&[("removed", "/All/Plugins/Paper2D"), ("removed", "/All/Plugins")])
        );
        assert_eq!(
            updates[0].item.internal_path(),
            Some("/Paper2D")
        );
        assert!(updates[1].item.as_folder().unwrap().is_virtual());
    }

    #[test]
    fn always_show_marks_the_chain() {
        let (source, _registry) = source();
        source.on_content_path_mounted("/Game").unwrap();
        source.update_queue().drain();
        source.on_always_show_path("/Game/Pinned/Deep");
        assert!(source
            .folder_attributes("/Game/Pinned")
            .contains(FolderAttributes::ALWAYS_VISIBLE));
        assert_eq!(
            summary(&source.update_queue().drain()),
            pairs(&[("modified", "/Game/Pinned"), ("modified", "/Game/Pinned/Deep")])
        );
    }
}
