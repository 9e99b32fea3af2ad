//! Two-phase filter compilation.
//!
//! Phase A resolves the target virtual path: it fills the folder predicate,
//! pre-enumerates direct sub folders for non-recursive queries (recursive
//! ones are scanned on demand instead), and computes the internal-path scope
//! that files must live in. Phase B builds the inclusive and exclusive asset
//! sets from the sub-filters, narrows them by the scope and the permission
//! lists, and resolves conflicts between them.
//!
//! Any step that proves no file can match stops compilation and leaves
//! `excludes_all_assets` set.

use std::sync::Arc;

use fnv::FnvHashSet;

use super::cache::FilterCache;
use super::compiled::{CompiledAssetDataFilter, CompiledFilter, UnsupportedAssetFilter};
use super::request::{CompileCallback, DataFilter, UnsupportedClassFilter};
use crate::collection::{CollectionManager, RecursionMode};
use crate::item::DataSourceId;
use crate::path::{debug_check_path, passes_attribute_filter, path_depth, PathSpace};
use crate::permission::PathPermissionList;
use crate::registry::{AssetFilter, AssetRegistry, CompiledAssetFilter, TemporaryCachingGuard};
use crate::types::{ItemAttributeFilter, ItemCategoryFilter, ItemTypeFilter, PathType};

// ---------------------------------------------------------------------------
// Primitive compilation
// ---------------------------------------------------------------------------

/// Expands a declarative registry filter into flat sets.
pub trait PrimitiveCompiler {
    fn compile_primitive(&self, filter: &AssetFilter) -> CompiledAssetFilter;
}

/// Compiles through the asset registry.
pub struct RegistryCompiler<'a>(pub &'a dyn AssetRegistry);

impl PrimitiveCompiler for RegistryCompiler<'_> {
    fn compile_primitive(&self, filter: &AssetFilter) -> CompiledAssetFilter {
        self.0.compile_filter(filter)
    }
}

/// Compiles through a caller-supplied callback.
pub struct CallbackCompiler<'a>(pub &'a CompileCallback);

impl PrimitiveCompiler for CallbackCompiler<'_> {
    fn compile_primitive(&self, filter: &AssetFilter) -> CompiledAssetFilter {
        (self.0)(filter)
    }
}

// ---------------------------------------------------------------------------
// Input params
// ---------------------------------------------------------------------------

/// Reason a compile produced nothing without doing any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortCircuit {
    NoAssetCategory,
    NoItemTypes,
    PathsDenied,
    ClassesDenied,
}

impl ShortCircuit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoAssetCategory => "asset category not requested",
            Self::NoItemTypes => "neither folders nor files requested",
            Self::PathsDenied => "path permission list denies everything",
            Self::ClassesDenied => "class permission list denies everything",
        }
    }
}

/// Request-scoped view of a [`DataFilter`], resolved once per compile.
struct AssetFilterInputParams<'f> {
    include_folders: bool,
    include_files: bool,
    recursive: bool,
    attributes: ItemAttributeFilter,
    path_permission_list: Option<&'f Arc<PathPermissionList>>,
    class_permission_list: Option<&'f PathPermissionList>,
    unsupported: Option<&'f UnsupportedClassFilter>,
}

impl<'f> AssetFilterInputParams<'f> {
    fn populate(filter: &'f DataFilter) -> Result<Self, ShortCircuit> {
        if !filter.item_categories.contains(ItemCategoryFilter::ASSETS) {
            return Err(ShortCircuit::NoAssetCategory);
        }
        let include_folders = filter.item_types.contains(ItemTypeFilter::FOLDERS);
        let include_files = filter.item_types.contains(ItemTypeFilter::FILES);
        if !include_folders && !include_files {
            return Err(ShortCircuit::NoItemTypes);
        }

        let path_permission_list = filter.path_permission_list();
        if path_permission_list.is_some_and(|list| list.is_deny_list_all()) {
            return Err(ShortCircuit::PathsDenied);
        }

        let class_permission_list = filter.class_permission_list().map(Arc::as_ref);
        let unsupported = filter
            .unsupported_class_filter
            .as_ref()
            .filter(|u| u.class_permission_list.has_filtering());
        if unsupported.is_none() && class_permission_list.is_some_and(|l| l.is_deny_list_all()) {
            return Err(ShortCircuit::ClassesDenied);
        }

        Ok(Self {
            include_folders,
            include_files,
            recursive: filter.recursive_paths,
            attributes: filter.item_attributes,
            path_permission_list,
            class_permission_list,
            unsupported,
        })
    }
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

pub struct FilterCompiler<'a> {
    owner: DataSourceId,
    space: &'a PathSpace,
    registry: &'a dyn AssetRegistry,
    collections: &'a dyn CollectionManager,
    cache: &'a FilterCache,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(
        owner: DataSourceId,
        space: &'a PathSpace,
        registry: &'a dyn AssetRegistry,
        collections: &'a dyn CollectionManager,
        cache: &'a FilterCache,
    ) -> Self {
        Self {
            owner,
            space,
            registry,
            collections,
            cache,
        }
    }

    /// Compiles `filter` for the folder at `virtual_path`.
    pub fn compile(&self, virtual_path: &str, filter: &DataFilter) -> CompiledFilter {
        debug_check_path(virtual_path);
        let mut compiled = CompiledFilter::empty(
            self.owner,
            virtual_path,
            filter.item_types,
            filter.recursive_paths,
        );

        let params = match AssetFilterInputParams::populate(filter) {
            Ok(params) => params,
            Err(reason) => {
                log::debug!(
                    "filter compile short-circuit path={} reason={}",
                    virtual_path,
                    reason.as_str()
                );
                return compiled;
            }
        };

        let _caching = TemporaryCachingGuard::new(self.registry);
        let registry_compiler = RegistryCompiler(self.registry);
        let callback_compiler = filter
            .legacy_filter
            .as_ref()
            .and_then(|legacy| legacy.compile.as_ref())
            .map(CallbackCompiler);
        let primitive: &dyn PrimitiveCompiler = match callback_compiler.as_ref() {
            Some(callback) => callback,
            None => &registry_compiler,
        };

        let scope = self.create_path_filter(
            virtual_path,
            filter,
            &params,
            primitive,
            &mut compiled.asset_filter,
        );
        if let Some(scope) = scope {
            self.create_asset_filter(filter, &params, primitive, scope, &mut compiled);
        }
        compiled
    }

    // -----------------------------------------------------------------------
    // Phase A: path filter
    // -----------------------------------------------------------------------

    /// Fills folder state and returns the file scope, if files are wanted.
    fn create_path_filter(
        &self,
        virtual_path: &str,
        filter: &DataFilter,
        params: &AssetFilterInputParams<'_>,
        primitive: &dyn PrimitiveCompiler,
        out: &mut CompiledAssetDataFilter,
    ) -> Option<FnvHashSet<String>> {
        let path_type = self.space.path_type(virtual_path);
        if path_type == PathType::Invalid {
            log::debug!("filter compile skipped path={} reason=invalid path", virtual_path);
            return None;
        }

        if params.include_folders {
            self.populate_folder_predicate(filter, params, primitive, out);
            if params.recursive {
                out.virtual_path_to_scan_on_demand = Some(virtual_path.to_string());
            } else {
                self.cache_direct_sub_paths(virtual_path, out);
            }
        }

        if !params.include_files {
            return None;
        }
        Some(if params.recursive {
            self.recursive_scope(virtual_path, filter, params.attributes)
        } else {
            self.direct_scope(virtual_path, params.attributes)
        })
    }

    fn populate_folder_predicate(
        &self,
        filter: &DataFilter,
        params: &AssetFilterInputParams<'_>,
        primitive: &dyn PrimitiveCompiler,
        out: &mut CompiledAssetDataFilter,
    ) {
        out.item_attribute_filter = params.attributes;
        out.path_permission_list = params.path_permission_list.cloned();

        let Some(package) = filter.package_filter.as_ref() else {
            return;
        };
        let no_entries: [&str; 0] = [];
        out.package_paths_to_include =
            PathPermissionList::from_entries(&package.package_paths_to_include, no_entries);
        out.recursive_package_paths_to_include = package.recursive_package_paths_to_include;
        out.package_paths_to_exclude =
            PathPermissionList::from_entries(no_entries, &package.package_paths_to_exclude);
        out.recursive_package_paths_to_exclude = package.recursive_package_paths_to_exclude;

        if !package.package_paths_to_exclude.is_empty() {
            out.excluded_package_paths = primitive
                .compile_primitive(&AssetFilter {
                    package_paths: package.package_paths_to_exclude.clone(),
                    recursive_paths: package.recursive_package_paths_to_exclude,
                    ..Default::default()
                })
                .package_paths;
        }
    }

    fn cache_direct_sub_paths(&self, virtual_path: &str, out: &mut CompiledAssetDataFilter) {
        let roots = self.space.classifier();
        let mut cached = Vec::new();
        let mut virtual_folders = Vec::new();
        self.space
            .enumerate_sub_paths(self.registry, virtual_path, false, |child, internal| {
                match internal {
                    Some(internal) => {
                        if out.path_passes(internal, roots) {
                            cached.push(internal.to_string());
                        }
                    }
                    None => {
                        if out.virtual_folder_passes(self.space, child) {
                            virtual_folders.push(child.to_string());
                        }
                    }
                }
                true
            });
        cached.sort_unstable();
        virtual_folders.sort_unstable();
        out.cached_sub_paths = cached;
        out.virtual_sub_paths = virtual_folders;
    }

    /// Scope of a non-recursive query: the target folder itself.
    fn direct_scope(
        &self,
        virtual_path: &str,
        attributes: ItemAttributeFilter,
    ) -> FnvHashSet<String> {
        let mut scope = FnvHashSet::default();
        if let Some(internal) = self.space.try_convert_virtual_to_internal(virtual_path) {
            if self.space.is_known_content_path(&internal)
                && passes_attribute_filter(&internal, 0, attributes, self.space.classifier())
            {
                scope.insert(internal);
            }
        }
        scope
    }

    /// Scope of a recursive query, served from the filter cache when possible.
    fn recursive_scope(
        &self,
        virtual_path: &str,
        filter: &DataFilter,
        attributes: ItemAttributeFilter,
    ) -> FnvHashSet<String> {
        if let Some(id) = filter.cache_id {
            if let Some(scope) = self.cache.get(id, virtual_path, attributes) {
                return scope;
            }
        }
        let scope = self.collect_recursive_scope(virtual_path, attributes);
        if let Some(id) = filter.cache_id {
            self.cache.put(id, virtual_path, attributes, scope.clone());
        }
        scope
    }

    fn collect_recursive_scope(
        &self,
        virtual_path: &str,
        attributes: ItemAttributeFilter,
    ) -> FnvHashSet<String> {
        let roots = self.space.classifier();
        let mut scope = FnvHashSet::default();
        for root in self.space.internal_roots_under(virtual_path) {
            if !self.space.is_known_content_path(&root)
                || !passes_attribute_filter(&root, 0, attributes, roots)
            {
                continue;
            }
            // Descendants share the root's leading segments.
            let checked_depth = path_depth(&root) + 1;
            self.registry
                .enumerate_sub_paths(&root, true, &mut |sub_path| {
                    if passes_attribute_filter(sub_path, checked_depth, attributes, roots) {
                        scope.insert(sub_path.to_string());
                    }
                    true
                });
            scope.insert(root);
        }
        scope
    }

    // -----------------------------------------------------------------------
    // Phase B: asset filter
    // -----------------------------------------------------------------------

    fn create_asset_filter(
        &self,
        filter: &DataFilter,
        params: &AssetFilterInputParams<'_>,
        primitive: &dyn PrimitiveCompiler,
        scope: FnvHashSet<String>,
        compiled: &mut CompiledFilter,
    ) {
        let path = compiled.virtual_path.as_str();
        if scope.is_empty() {
            log::debug!("filter compile excludes all path={} reason=empty scope", path);
            return;
        }

        let Some((include, exclude)) = self.declarative_filters(filter) else {
            log::debug!("filter compile excludes all path={} reason=empty collections", path);
            return;
        };
        let mut inclusive = primitive.compile_primitive(&include);
        let mut exclusive = primitive.compile_primitive(&exclude);

        // Path scope
        if inclusive.package_paths.is_empty() {
            inclusive.package_paths = scope.clone();
        } else {
            inclusive.package_paths.retain(|p| scope.contains(p));
            if inclusive.package_paths.is_empty() {
                log::debug!("filter compile excludes all path={} reason=paths out of scope", path);
                return;
            }
        }

        // Path permissions
        if let Some(list) = params.path_permission_list {
            if list.has_allow_entries() {
                inclusive
                    .package_paths
                    .retain(|p| list.allows_starts_with(p, false));
                if inclusive.package_paths.is_empty() {
                    log::debug!("filter compile excludes all path={} reason=paths not allowed", path);
                    return;
                }
            }
            if list.has_deny_entries() {
                let denied: Vec<String> = inclusive
                    .package_paths
                    .iter()
                    .filter(|p| list.denies_starts_with(p))
                    .cloned()
                    .collect();
                exclusive.package_paths.extend(denied);
            }
        }

        // Caller-level conflicts
        let resolved = resolve_conflict(&mut inclusive.package_names, &mut exclusive.package_names)
            && resolve_conflict(&mut inclusive.package_paths, &mut exclusive.package_paths)
            && resolve_conflict(
                &mut inclusive.soft_object_paths,
                &mut exclusive.soft_object_paths,
            )
            && resolve_conflict(&mut inclusive.class_paths, &mut exclusive.class_paths);
        if !resolved {
            log::debug!("filter compile excludes all path={} reason=inclusive fully excluded", path);
            return;
        }

        let unsupported_base = params
            .unsupported
            .map(|_| (inclusive.clone(), exclusive.clone()));

        // Class permissions. The unsupported list only feeds the unsupported
        // filter below.
        let mut excludes_all_classes = false;
        if let Some(list) = params.class_permission_list {
            if list.is_deny_list_all() {
                excludes_all_classes = true;
            } else if list.has_allow_entries() {
                let allowed = compile_classes(primitive, list.allow_list());
                if inclusive.class_paths.is_empty() {
                    inclusive.class_paths = allowed;
                } else {
                    inclusive.class_paths.retain(|c| allowed.contains(c));
                    if inclusive.class_paths.is_empty() {
                        excludes_all_classes = true;
                    }
                }
            }
            if !list.is_deny_list_all() && list.has_deny_entries() {
                exclusive
                    .class_paths
                    .extend(compile_classes(primitive, list.deny_list()));
            }
        }
        if !resolve_conflict(&mut inclusive.class_paths, &mut exclusive.class_paths) {
            excludes_all_classes = true;
        }

        let unsupported = match (params.unsupported, unsupported_base) {
            (Some(request), Some((base_inclusive, base_exclusive))) => {
                build_unsupported_filter(request, primitive, &scope, base_inclusive, base_exclusive)
            }
            _ => None,
        };
        if excludes_all_classes && unsupported.is_none() {
            log::debug!("filter compile excludes all path={} reason=no class passes", path);
            return;
        }

        let out = &mut compiled.asset_filter;
        if let Some(callback) = filter
            .legacy_filter
            .as_ref()
            .and_then(|legacy| legacy.custom_source_assets.as_ref())
        {
            out.custom_source_assets = callback(&inclusive.to_asset_filter());
        }
        out.inclusive = inclusive;
        out.exclusive = exclusive;
        out.excludes_all_classes = excludes_all_classes;
        out.excludes_all_assets = false;
        compiled.unsupported_filter = unsupported;
    }

    /// Unions the include and exclude sides of every sub-filter.
    ///
    /// Returns `None` when selected collections resolve to no objects.
    fn declarative_filters(&self, filter: &DataFilter) -> Option<(AssetFilter, AssetFilter)> {
        let mut include = AssetFilter::default();
        let mut exclude = AssetFilter::default();

        if let Some(object) = filter.object_filter.as_ref() {
            include
                .soft_object_paths
                .extend(object.object_names_to_include.iter().cloned());
            include
                .tags_and_values
                .extend(object.tags_and_values_to_include.iter().cloned());
            exclude
                .soft_object_paths
                .extend(object.object_names_to_exclude.iter().cloned());
            exclude
                .tags_and_values
                .extend(object.tags_and_values_to_exclude.iter().cloned());
        }

        if let Some(package) = filter.package_filter.as_ref() {
            include
                .package_names
                .extend(package.package_names_to_include.iter().cloned());
            include
                .package_paths
                .extend(package.package_paths_to_include.iter().cloned());
            include.recursive_paths = package.recursive_package_paths_to_include;
            exclude
                .package_names
                .extend(package.package_names_to_exclude.iter().cloned());
            exclude
                .package_paths
                .extend(package.package_paths_to_exclude.iter().cloned());
            exclude.recursive_paths = package.recursive_package_paths_to_exclude;
        }

        if let Some(class) = filter.class_filter.as_ref() {
            include
                .class_paths
                .extend(class.class_names_to_include.iter().cloned());
            include.recursive_classes = class.recursive_class_names_to_include;
            exclude
                .class_paths
                .extend(class.class_names_to_exclude.iter().cloned());
            exclude.recursive_classes = class.recursive_class_names_to_exclude;
        }

        if let Some(collection) = filter.collection_filter.as_ref() {
            if !collection.selected_collections.is_empty() {
                let recursion = if collection.include_child_collections {
                    RecursionMode::SelfAndChildren
                } else {
                    RecursionMode::SelfOnly
                };
                let mut objects = Vec::new();
                for selected in &collection.selected_collections {
                    objects.extend(
                        self.collections
                            .get_objects_in_collection(selected, recursion),
                    );
                }
                if objects.is_empty() {
                    return None;
                }
                include.soft_object_paths.extend(objects);
            }
        }

        Some((include, exclude))
    }
}

/// Removes the overlap from `inclusive` and clears `exclusive` when they
/// intersect. Returns `false` if `inclusive` was constrained and is now
/// empty.
fn resolve_conflict(inclusive: &mut FnvHashSet<String>, exclusive: &mut FnvHashSet<String>) -> bool {
    if inclusive.is_empty() || exclusive.is_empty() {
        return true;
    }
    if inclusive.is_disjoint(exclusive) {
        return true;
    }
    inclusive.retain(|entry| !exclusive.contains(entry));
    exclusive.clear();
    !inclusive.is_empty()
}

fn compile_classes<'l>(
    primitive: &dyn PrimitiveCompiler,
    classes: impl Iterator<Item = &'l str>,
) -> FnvHashSet<String> {
    primitive
        .compile_primitive(&AssetFilter {
            class_paths: classes.map(str::to_string).collect(),
            recursive_classes: true,
            ..Default::default()
        })
        .class_paths
}

fn build_unsupported_filter(
    request: &UnsupportedClassFilter,
    primitive: &dyn PrimitiveCompiler,
    scope: &FnvHashSet<String>,
    inclusive: CompiledAssetFilter,
    exclusive: CompiledAssetFilter,
) -> Option<UnsupportedAssetFilter> {
    let mut unsupported = UnsupportedAssetFilter {
        inclusive,
        exclusive,
        ..Default::default()
    };

    if let Some(folders) = request.folder_permission_list.as_deref() {
        if folders.is_deny_list_all() {
            return None;
        }
        if folders.has_allow_entries() {
            unsupported.show_inclusive.package_paths = scope
                .iter()
                .filter(|p| folders.allows_starts_with(p, false))
                .cloned()
                .collect();
            if unsupported.show_inclusive.package_paths.is_empty() {
                return None;
            }
        }
        if folders.has_deny_entries() {
            unsupported.show_exclusive.package_paths = scope
                .iter()
                .filter(|p| folders.denies_starts_with(p))
                .cloned()
                .collect();
        }
    }

    let classes = request.class_permission_list.as_ref();
    if classes.is_deny_list_all() {
        unsupported.fails_all_classes = true;
    } else {
        if classes.has_allow_entries() {
            unsupported.convert_if_fail_inclusive.class_paths =
                compile_classes(primitive, classes.allow_list());
        }
        if classes.has_deny_entries() {
            unsupported.convert_if_fail_exclusive.class_paths =
                compile_classes(primitive, classes.deny_list());
        }
    }
    Some(unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ClassFilter;

    fn set(items: &[&str]) -> FnvHashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn conflict_resolution_subtracts_and_clears() {
        let mut inclusive = set(&["A", "B", "C"]);
        let mut exclusive = set(&["B"]);
        assert!(resolve_conflict(&mut inclusive, &mut exclusive));
        assert_eq!(inclusive, set(&["A", "C"]));
        assert!(exclusive.is_empty());
    }

    #[test]
    fn conflict_resolution_reports_empty_inclusive() {
        let mut inclusive = set(&["A"]);
        let mut exclusive = set(&["A", "B"]);
        assert!(!resolve_conflict(&mut inclusive, &mut exclusive));
    }

    #[test]
    fn disjoint_and_unconstrained_sets_are_untouched() {
        let mut inclusive = set(&["A"]);
        let mut exclusive = set(&["B"]);
        assert!(resolve_conflict(&mut inclusive, &mut exclusive));
        assert_eq!(exclusive, set(&["B"]));

        let mut everything = FnvHashSet::default();
        assert!(resolve_conflict(&mut everything, &mut exclusive));
        assert!(everything.is_empty());
    }

    #[test]
    fn input_params_short_circuit() {
        let no_types = DataFilter::default().item_types(ItemTypeFilter::empty());
        assert_eq!(
            AssetFilterInputParams::populate(&no_types).err(),
            Some(ShortCircuit::NoItemTypes)
        );

        let no_assets = DataFilter {
            item_categories: ItemCategoryFilter::COLLECTIONS,
            ..Default::default()
        };
        assert_eq!(
            AssetFilterInputParams::populate(&no_assets).err(),
            Some(ShortCircuit::NoAssetCategory)
        );

        let denied_classes = DataFilter {
            class_filter: Some(ClassFilter {
                class_permission_list: Some(Arc::new(PathPermissionList::deny_all())),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            AssetFilterInputParams::populate(&denied_classes).err(),
            Some(ShortCircuit::ClassesDenied)
        );
    }
}
