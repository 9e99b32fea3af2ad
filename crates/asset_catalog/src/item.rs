//! Items produced by enumeration and carried by update events.
//!
//! Items are plain values. The variant is the discriminant; there is no
//! payload downcasting.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::path::short_name;
use crate::registry::AssetData;
use crate::types::ItemTypeFilter;

/// Identity of the data source that produced an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataSourceId(u64);

impl DataSourceId {
    /// Allocates a process-unique id.
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderItem {
    pub owner: DataSourceId,
    pub virtual_path: String,
    /// `None` for fully virtual folders.
    pub internal_path: Option<String>,
    pub is_plugin: bool,
}

impl FolderItem {
    #[inline]
    pub fn is_virtual(&self) -> bool {
        self.internal_path.is_none()
    }

    pub fn name(&self) -> &str {
        short_name(&self.virtual_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    pub owner: DataSourceId,
    /// Virtual package path, e.g. `/All/Game/Maps/Arena`.
    pub virtual_path: String,
    pub asset: AssetData,
}

impl FileItem {
    pub fn name(&self) -> &str {
        &self.asset.asset_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Folder(FolderItem),
    File(FileItem),
    /// An asset that failed class filtering but is still shown, marked as
    /// unsupported.
    UnsupportedFile(FileItem),
}

impl Item {
    pub fn owner(&self) -> DataSourceId {
        match self {
            Self::Folder(folder) => folder.owner,
            Self::File(file) | Self::UnsupportedFile(file) => file.owner,
        }
    }

    pub fn virtual_path(&self) -> &str {
        match self {
            Self::Folder(folder) => &folder.virtual_path,
            Self::File(file) | Self::UnsupportedFile(file) => &file.virtual_path,
        }
    }

    /// Folder internal path or file package name.
    pub fn internal_path(&self) -> Option<&str> {
        match self {
            Self::Folder(folder) => folder.internal_path.as_deref(),
            Self::File(file) | Self::UnsupportedFile(file) => Some(&file.asset.package_name),
        }
    }

    pub fn item_type(&self) -> ItemTypeFilter {
        match self {
            Self::Folder(_) => ItemTypeFilter::FOLDERS,
            Self::File(_) | Self::UnsupportedFile(_) => ItemTypeFilter::FILES,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderItem> {
        match self {
            Self::Folder(folder) => Some(folder),
            _ => None,
        }
    }

    /// File payload of either file variant.
    pub fn as_file(&self) -> Option<&FileItem> {
        match self {
            Self::File(file) | Self::UnsupportedFile(file) => Some(file),
            Self::Folder(_) => None,
        }
    }

    #[inline]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedFile(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(DataSourceId::next(), DataSourceId::next());
    }

    #[test]
    fn accessors_cover_every_variant() {
        let owner = DataSourceId::next();
        let folder = Item::Folder(FolderItem {
            owner,
            virtual_path: "/All".to_string(),
            internal_path: None,
            is_plugin: false,
        });
        let asset = AssetData::new("/Game/A.A", "/Script/X").unwrap();
        let file = Item::UnsupportedFile(FileItem {
            owner,
            virtual_path: "/Game/A".to_string(),
            asset,
        });
        assert_eq!(folder.item_type(), ItemTypeFilter::FOLDERS);
        assert!(folder.as_folder().is_some_and(FolderItem::is_virtual));
        assert_eq!(folder.internal_path(), None);
        assert_eq!(file.internal_path(), Some("/Game/A"));
        assert!(file.is_unsupported());
        assert_eq!(file.as_file().map(FileItem::name), Some("A"));
        assert_eq!(file.owner(), owner);
    }
}
