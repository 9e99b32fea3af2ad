//! Asset records as the registry reports them.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::error::{CatalogError, Result};
use crate::path::{parent_path, short_name};
use crate::types::FolderAttributes;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PackageFlags: u32 {
        const COOKED                       = 0b01;
        const NOT_EXTERNALLY_REFERENCEABLE = 0b10;
    }
}

/// One registry record: an object living in a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetData {
    /// Full object path, e.g. `/Game/Maps/Arena.Arena`.
    pub object_path: String,
    /// Package the object lives in, e.g. `/Game/Maps/Arena`.
    pub package_name: String,
    /// Folder holding the package, e.g. `/Game/Maps`.
    pub package_path: String,
    pub asset_name: String,
    pub class_path: String,
    pub package_flags: PackageFlags,
    /// Set for objects nested inside another object of the same package.
    pub outer_path: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl AssetData {
    /// Builds a record from an object path of the form `/Pkg/Path/Name.Object`.
    pub fn new(object_path: &str, class_path: &str) -> Result<Self> {
        let (package_name, asset_name) = object_path.rsplit_once('.').ok_or_else(|| {
            CatalogError::InvalidPath(format!("object path has no object name: {object_path}"))
        })?;
        if asset_name.is_empty() || package_name.is_empty() || !package_name.starts_with('/') {
            return Err(CatalogError::InvalidPath(format!(
                "malformed object path: {object_path}"
            )));
        }
        let package_path = parent_path(package_name).ok_or_else(|| {
            CatalogError::InvalidPath(format!("package has no folder: {package_name}"))
        })?;
        Ok(Self {
            object_path: object_path.to_string(),
            package_name: package_name.to_string(),
            package_path: package_path.to_string(),
            asset_name: asset_name.to_string(),
            class_path: class_path.to_string(),
            package_flags: PackageFlags::empty(),
            outer_path: None,
            tags: BTreeMap::new(),
        })
    }

    pub fn with_flags(mut self, flags: PackageFlags) -> Self {
        self.package_flags = flags;
        self
    }

    pub fn with_outer(mut self, outer_path: &str) -> Self {
        self.outer_path = Some(outer_path.to_string());
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    #[inline]
    pub fn is_cooked(&self) -> bool {
        self.package_flags.contains(PackageFlags::COOKED)
    }

    #[inline]
    pub fn is_public(&self) -> bool {
        !self
            .package_flags
            .contains(PackageFlags::NOT_EXTERNALLY_REFERENCEABLE)
    }

    /// True for the top-level object that represents its package.
    ///
    /// Cooked packages drop the naming convention, so any top-level object of
    /// a cooked package qualifies.
    pub fn is_primary(&self) -> bool {
        self.outer_path.is_none()
            && (self.is_cooked() || self.asset_name == short_name(&self.package_name))
    }

    /// Attributes this asset contributes to every folder above it.
    pub fn folder_attributes(&self) -> FolderAttributes {
        let mut attributes = FolderAttributes::HAS_CONTENT;
        if !self.is_cooked() {
            attributes |= FolderAttributes::HAS_SOURCE_CONTENT;
        }
        if self.is_public() {
            attributes |= FolderAttributes::HAS_PUBLIC_CONTENT;
        }
        attributes
    }
}
