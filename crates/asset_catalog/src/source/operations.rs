//! Item operations.
//!
//! The data source only validates requests: ownership, item kind, and
//! whether the target lies in writable content. The work itself is done by
//! an [`AssetOperations`] collaborator.

use std::sync::Arc;

use super::AssetDataSource;
use crate::enumerate::AssetClassification;
use crate::error::{CatalogError, Result};
use crate::item::Item;
use crate::path::{join_path, PathSpace};
use crate::registry::AssetData;
use crate::types::PathType;

const INVALID_NAME_CHARS: &[char] = &['/', '\\', '.', ':', '*', '?', '"', '<', '>', '|'];
const MAX_NAME_LEN: usize = 128;

/// What an operation acts on, in internal terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationTarget {
    Folder { internal_path: String },
    Asset(AssetData),
}

/// Performs item operations on behalf of a data source.
pub trait AssetOperations: Send + Sync {
    fn create_folder(&self, internal_path: &str) -> Result<()>;

    fn rename(&self, target: &OperationTarget, new_name: &str) -> Result<()>;

    fn move_to(&self, targets: &[OperationTarget], destination: &str) -> Result<()>;

    fn copy_to(&self, targets: &[OperationTarget], destination: &str) -> Result<()>;

    fn delete(&self, targets: &[OperationTarget]) -> Result<()>;

    /// Returns the new asset.
    fn duplicate(&self, asset: &AssetData, new_name: &str) -> Result<AssetData>;
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::InvalidName("name is empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CatalogError::InvalidName(format!(
            "'{name}' is longer than {MAX_NAME_LEN} characters"
        )));
    }
    if let Some(bad) = name.chars().find(|c| INVALID_NAME_CHARS.contains(c)) {
        return Err(CatalogError::InvalidName(format!(
            "'{name}' contains '{bad}'"
        )));
    }
    Ok(())
}

impl AssetDataSource {
    // -----------------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------------

    fn operations(&self) -> Result<&Arc<dyn AssetOperations>> {
        self.operations.as_ref().ok_or_else(|| {
            CatalogError::Unsupported("this data source cannot modify content".to_string())
        })
    }

    fn check_owner(&self, item: &Item) -> Result<()> {
        if item.owner() == self.id {
            return Ok(());
        }
        log::warn!(
            "item rejected path={} owner={} source={}",
            item.virtual_path(),
            item.owner().get(),
            self.id.get()
        );
        debug_assert!(false, "item is owned by another data source");
        Err(CatalogError::InconsistentPayload(format!(
            "'{}' is owned by another data source",
            item.virtual_path()
        )))
    }

    /// Internal folder behind a virtual folder that accepts writes.
    fn writable_folder(&self, space: &PathSpace, virtual_path: &str) -> Result<String> {
        if space.path_type(virtual_path) != PathType::Internal {
            return Err(CatalogError::ScopeViolation(format!(
                "'{virtual_path}' is not a content folder"
            )));
        }
        let internal = space
            .try_convert_virtual_to_internal(virtual_path)
            .ok_or_else(|| CatalogError::InvalidPath(virtual_path.to_string()))?;
        self.check_writable(space, &internal)?;
        Ok(internal)
    }

    fn check_writable(&self, space: &PathSpace, internal: &str) -> Result<()> {
        if !space.is_known_content_path(internal) {
            return Err(CatalogError::ScopeViolation(format!(
                "'{internal}' is outside every mounted content root"
            )));
        }
        if let Some(list) = self.write_permission.as_deref() {
            if !list.passes_starts_with_filter(internal, false) {
                return Err(CatalogError::ScopeViolation(format!(
                    "'{internal}' is read only"
                )));
            }
        }
        Ok(())
    }

    /// Resolves an item to a target that may be modified in place.
    fn mutable_target(&self, space: &PathSpace, item: &Item) -> Result<OperationTarget> {
        self.check_owner(item)?;
        match item {
            Item::Folder(folder) => {
                let Some(internal) = folder.internal_path.as_deref() else {
                    return Err(CatalogError::ScopeViolation(format!(
                        "'{}' is a virtual folder",
                        folder.virtual_path
                    )));
                };
                if space.is_root_content_path(internal) {
                    return Err(CatalogError::ScopeViolation(format!(
                        "'{}' is a content root",
                        folder.virtual_path
                    )));
                }
                self.check_writable(space, internal)?;
                Ok(OperationTarget::Folder {
                    internal_path: internal.to_string(),
                })
            }
            Item::File(file) | Item::UnsupportedFile(file) => {
                self.check_writable(space, &file.asset.package_name)?;
                Ok(OperationTarget::Asset(file.asset.clone()))
            }
        }
    }

    /// Resolves an item to a target that is only read.
    fn source_target(&self, item: &Item) -> Result<OperationTarget> {
        self.check_owner(item)?;
        match item {
            Item::Folder(folder) => folder
                .internal_path
                .clone()
                .map(|internal_path| OperationTarget::Folder { internal_path })
                .ok_or_else(|| {
                    CatalogError::ScopeViolation(format!(
                        "'{}' is a virtual folder",
                        folder.virtual_path
                    ))
                }),
            Item::File(file) | Item::UnsupportedFile(file) => {
                Ok(OperationTarget::Asset(file.asset.clone()))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub fn can_create_folder(&self, parent_virtual_path: &str, name: &str) -> Result<()> {
        self.operations()?;
        validate_name(name)?;
        let space = self.space.read();
        self.writable_folder(&space, parent_virtual_path)?;
        Ok(())
    }

    /// Creates `name` below a folder and returns the new folder item.
    pub fn create_folder(&self, parent_virtual_path: &str, name: &str) -> Result<Item> {
        let operations = self.operations()?;
        validate_name(name)?;
        let space = self.space.read();
        let parent = self.writable_folder(&space, parent_virtual_path)?;
        let internal = join_path(&parent, name);
        operations.create_folder(&internal)?;
        log::info!("folder created path={}", internal);
        let virtual_path = join_path(parent_virtual_path, name);
        Ok(self.context(&space).folder_item(&virtual_path, Some(&internal)))
    }

    pub fn can_rename(&self, item: &Item, new_name: Option<&str>) -> Result<()> {
        self.operations()?;
        if let Some(name) = new_name {
            validate_name(name)?;
        }
        let space = self.space.read();
        self.mutable_target(&space, item)?;
        Ok(())
    }

    pub fn rename(&self, item: &Item, new_name: &str) -> Result<()> {
        let operations = self.operations()?;
        validate_name(new_name)?;
        let target = {
            let space = self.space.read();
            self.mutable_target(&space, item)?
        };
        operations.rename(&target, new_name)
    }

    pub fn can_move(&self, items: &[Item], destination_virtual_path: &str) -> Result<()> {
        self.operations()?;
        let space = self.space.read();
        self.writable_folder(&space, destination_virtual_path)?;
        for item in items {
            self.mutable_target(&space, item)?;
        }
        Ok(())
    }

    pub fn move_items(&self, items: &[Item], destination_virtual_path: &str) -> Result<()> {
        let operations = self.operations()?;
        let (targets, destination) = {
            let space = self.space.read();
            let destination = self.writable_folder(&space, destination_virtual_path)?;
            let targets = items
                .iter()
                .map(|item| self.mutable_target(&space, item))
                .collect::<Result<Vec<_>>>()?;
            (targets, destination)
        };
        operations.move_to(&targets, &destination)
    }

    pub fn can_copy(&self, items: &[Item], destination_virtual_path: &str) -> Result<()> {
        self.operations()?;
        let space = self.space.read();
        self.writable_folder(&space, destination_virtual_path)?;
        for item in items {
            self.source_target(item)?;
        }
        Ok(())
    }

    pub fn copy_items(&self, items: &[Item], destination_virtual_path: &str) -> Result<()> {
        let operations = self.operations()?;
        let destination = {
            let space = self.space.read();
            self.writable_folder(&space, destination_virtual_path)?
        };
        let targets = items
            .iter()
            .map(|item| self.source_target(item))
            .collect::<Result<Vec<_>>>()?;
        operations.copy_to(&targets, &destination)
    }

    pub fn can_delete(&self, items: &[Item]) -> Result<()> {
        self.operations()?;
        let space = self.space.read();
        for item in items {
            self.mutable_target(&space, item)?;
        }
        Ok(())
    }

    pub fn delete_items(&self, items: &[Item]) -> Result<()> {
        let operations = self.operations()?;
        let targets = {
            let space = self.space.read();
            items
                .iter()
                .map(|item| self.mutable_target(&space, item))
                .collect::<Result<Vec<_>>>()?
        };
        log::info!("deleting items count={}", targets.len());
        operations.delete(&targets)
    }

    pub fn can_duplicate(&self, item: &Item) -> Result<()> {
        self.operations()?;
        self.duplicate_source(item).map(|_| ())
    }

    /// Duplicates a file item next to the original.
    pub fn duplicate(&self, item: &Item, new_name: &str) -> Result<Item> {
        let operations = self.operations()?;
        validate_name(new_name)?;
        let asset = self.duplicate_source(item)?;
        let duplicated = operations.duplicate(&asset, new_name)?;
        let space = self.space.read();
        self.context(&space)
            .file_item(&duplicated, AssetClassification::Normal)
            .ok_or_else(|| CatalogError::InvalidPath(duplicated.package_name.clone()))
    }

    fn duplicate_source(&self, item: &Item) -> Result<AssetData> {
        self.check_owner(item)?;
        let Some(file) = item.as_file() else {
            return Err(CatalogError::Unsupported(format!(
                "'{}' is a folder and cannot be duplicated",
                item.virtual_path()
            )));
        };
        let space = self.space.read();
        self.check_writable(&space, &file.asset.package_path)?;
        Ok(file.asset.clone())
    }
}
