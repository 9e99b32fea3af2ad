//! Registry-level asset filters.
//!
//! An [`AssetFilter`] is declarative and may ask for recursive expansion of
//! paths or classes. Compiling it yields a [`CompiledAssetFilter`] made of
//! flat sets that are cheap to test membership against.

use fnv::FnvHashSet;

use super::asset::AssetData;

/// Declarative registry query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetFilter {
    pub package_names: Vec<String>,
    pub package_paths: Vec<String>,
    pub soft_object_paths: Vec<String>,
    pub class_paths: Vec<String>,
    /// Tag key with an optional required value.
    pub tags_and_values: Vec<(String, Option<String>)>,
    /// Also match every sub path of `package_paths`.
    pub recursive_paths: bool,
    /// Also match every class derived from `class_paths`.
    pub recursive_classes: bool,
}

impl AssetFilter {
    pub fn is_empty(&self) -> bool {
        self.package_names.is_empty()
            && self.package_paths.is_empty()
            && self.soft_object_paths.is_empty()
            && self.class_paths.is_empty()
            && self.tags_and_values.is_empty()
    }

    /// Appends every field of `other` onto this filter.
    pub fn append(&mut self, other: AssetFilter) {
        self.package_names.extend(other.package_names);
        self.package_paths.extend(other.package_paths);
        self.soft_object_paths.extend(other.soft_object_paths);
        self.class_paths.extend(other.class_paths);
        self.tags_and_values.extend(other.tags_and_values);
        self.recursive_paths |= other.recursive_paths;
        self.recursive_classes |= other.recursive_classes;
    }
}

/// Flat, fully expanded filter.
///
/// An empty field places no constraint. Used inclusively, every non-empty
/// field must match; used exclusively, any matching non-empty field rejects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledAssetFilter {
    pub package_names: FnvHashSet<String>,
    pub package_paths: FnvHashSet<String>,
    pub soft_object_paths: FnvHashSet<String>,
    pub class_paths: FnvHashSet<String>,
    pub tags_and_values: Vec<(String, Option<String>)>,
}

impl CompiledAssetFilter {
    pub fn is_empty(&self) -> bool {
        self.package_names.is_empty()
            && self.package_paths.is_empty()
            && self.soft_object_paths.is_empty()
            && self.class_paths.is_empty()
            && self.tags_and_values.is_empty()
    }

    /// Inclusive test: every constrained field matches.
    pub fn includes(&self, asset: &AssetData) -> bool {
        (self.package_names.is_empty() || self.package_names.contains(&asset.package_name))
            && (self.package_paths.is_empty() || self.package_paths.contains(&asset.package_path))
            && (self.soft_object_paths.is_empty()
                || self.soft_object_paths.contains(&asset.object_path))
            && (self.class_paths.is_empty() || self.class_paths.contains(&asset.class_path))
            && (self.tags_and_values.is_empty() || self.matches_any_tag(asset))
    }

    /// Exclusive test: any constrained field matches.
    pub fn excludes(&self, asset: &AssetData) -> bool {
        self.package_names.contains(&asset.package_name)
            || self.package_paths.contains(&asset.package_path)
            || self.soft_object_paths.contains(&asset.object_path)
            || self.class_paths.contains(&asset.class_path)
            || self.matches_any_tag(asset)
    }

    /// Declarative form of this filter with sorted fields and no recursion.
    pub fn to_asset_filter(&self) -> AssetFilter {
        fn sorted(set: &FnvHashSet<String>) -> Vec<String> {
            let mut items: Vec<String> = set.iter().cloned().collect();
            items.sort_unstable();
            items
        }
        AssetFilter {
            package_names: sorted(&self.package_names),
            package_paths: sorted(&self.package_paths),
            soft_object_paths: sorted(&self.soft_object_paths),
            class_paths: sorted(&self.class_paths),
            tags_and_values: self.tags_and_values.clone(),
            ..Default::default()
        }
    }

    fn matches_any_tag(&self, asset: &AssetData) -> bool {
        self.tags_and_values.iter().any(|(key, value)| {
            asset
                .tags
                .get(key)
                .is_some_and(|actual| value.as_ref().map_or(true, |wanted| wanted == actual))
        })
    }
}
