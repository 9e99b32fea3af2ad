//! Flag sets shared by the compiler, the enumerator and the change bridge.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-folder state accumulated while the registry streams in data.
    ///
    /// Flags are only ever added; they are dropped when the folder itself is
    /// removed or its root is dismounted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FolderAttributes: u8 {
        const HAS_CONTENT        = 0b0000_0001;
        const HAS_SOURCE_CONTENT = 0b0000_0010;
        const HAS_PUBLIC_CONTENT = 0b0000_0100;
        const ALWAYS_VISIBLE     = 0b0000_1000;
        const IS_IN_PLUGIN       = 0b0001_0000;
    }
}

bitflags! {
    /// Which kinds of items a query produces.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ItemTypeFilter: u8 {
        const FOLDERS = 0b01;
        const FILES   = 0b10;
        const ALL     = Self::FOLDERS.bits() | Self::FILES.bits();
    }
}

impl Default for ItemTypeFilter {
    fn default() -> Self {
        Self::ALL
    }
}

bitflags! {
    /// Content categories; this catalog only ever serves `ASSETS`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ItemCategoryFilter: u8 {
        const ASSETS      = 0b0001;
        const CLASSES     = 0b0010;
        const COLLECTIONS = 0b0100;
        const MISC        = 0b1000;
        const ALL         = 0b1111;
    }
}

impl Default for ItemCategoryFilter {
    fn default() -> Self {
        Self::ALL
    }
}

bitflags! {
    /// Which families of content roots and system folders are visible.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ItemAttributeFilter: u8 {
        const INCLUDE_PROJECT   = 0b0_0001;
        const INCLUDE_ENGINE    = 0b0_0010;
        const INCLUDE_PLUGINS   = 0b0_0100;
        const INCLUDE_DEVELOPER = 0b0_1000;
        const INCLUDE_LOCALIZED = 0b1_0000;
        const INCLUDE_ALL       = 0b1_1111;
    }
}

impl Default for ItemAttributeFilter {
    fn default() -> Self {
        Self::INCLUDE_PROJECT | Self::INCLUDE_ENGINE | Self::INCLUDE_PLUGINS
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FolderVisibilityFlags: u8 {
        const HIDE_EMPTY_FOLDERS = 0b01;
    }
}

/// Classification of a virtual path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    /// Maps onto a mounted root or something below it.
    Internal,
    /// A synthetic node of the virtual tree with no internal counterpart.
    Virtual,
    Invalid,
}

impl PathType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Virtual => "virtual",
            Self::Invalid => "invalid",
        }
    }
}

/// Family a content root belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Project,
    Engine,
    Plugin,
}

impl RootKind {
    /// Attribute flag a caller needs to see content under this root.
    pub fn required_attribute(self) -> ItemAttributeFilter {
        match self {
            Self::Project => ItemAttributeFilter::INCLUDE_PROJECT,
            Self::Engine => ItemAttributeFilter::INCLUDE_ENGINE,
            Self::Plugin => ItemAttributeFilter::INCLUDE_PLUGINS,
        }
    }
}
