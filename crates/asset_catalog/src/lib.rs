//! Asset catalog filtering and virtual path resolution.
//!
//! This crate provides the query core of a content browser:
//! - A virtual path space over dynamically mounted content roots
//! - Filter compilation into flat inclusive/exclusive sets
//! - A filter cache kept coherent by path notifications
//! - Item enumeration with a matching single-item predicate
//! - A data source facade that turns registry events into item updates

pub mod collection;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod events;
pub mod filter;
pub mod item;
pub mod path;
pub mod permission;
pub mod registry;
pub mod source;
pub mod types;

#[cfg(test)]
mod scenarios;

// Re-export main types
pub use collection::{CollectionManager, CollectionRef, CollectionShareType, RecursionMode};
pub use config::CatalogConfig;
pub use enumerate::{AssetClassification, EnumerationContext};
pub use error::{CatalogError, Result};
pub use events::{ItemUpdate, ItemUpdateKind, ItemUpdateQueue, PathEventHub, PathObserver};
pub use filter::{CompiledFilter, DataFilter, FilterCacheId, FilterCacheIdOwner};
pub use item::{DataSourceId, FileItem, FolderItem, Item};
pub use path::PathSpace;
pub use permission::PathPermissionList;
pub use registry::{AssetData, AssetRegistry, FileLoadProgress};
pub use source::{AssetDataSource, AssetOperations, OperationTarget};
pub use types::{
    FolderAttributes, FolderVisibilityFlags, ItemAttributeFilter, ItemCategoryFilter,
    ItemTypeFilter, PathType,
};
