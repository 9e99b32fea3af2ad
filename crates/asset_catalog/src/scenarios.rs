//! End-to-end scenarios over a data source backed by the in-memory registry.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fnv::FnvHashSet;
use parking_lot::Mutex;

use crate::collection::{CollectionRef, CollectionShareType, MemoryCollectionManager};
use crate::config::CatalogConfig;
use crate::filter::{
    ClassFilter, CollectionFilter, CompileCallback, CompiledFilter, CustomSourceAssetsCallback,
    DataFilter, FilterCacheIdOwner, LegacyFilter, PackageFilter, UnsupportedClassFilter,
};
use crate::item::Item;
use crate::permission::PathPermissionList;
use crate::registry::{AssetData, AssetFilter, AssetRegistry, MemoryAssetRegistry};
use crate::source::AssetDataSource;
use crate::types::{ItemAttributeFilter, ItemTypeFilter};

struct Harness {
    source: AssetDataSource,
    registry: Arc<MemoryAssetRegistry>,
    collections: Arc<MemoryCollectionManager>,
}

impl Harness {
    fn new(config: CatalogConfig, roots: &[&str]) -> Self {
        let registry = Arc::new(MemoryAssetRegistry::new());
        let collections = Arc::new(MemoryCollectionManager::new());
        let source = AssetDataSource::new(config, registry.clone(), collections.clone()).unwrap();
        for root in roots {
            source.on_content_path_mounted(root).unwrap();
        }
        Self {
            source,
            registry,
            collections,
        }
    }

    fn add_asset(&self, object_path: &str, class_path: &str) -> AssetData {
        let asset = AssetData::new(object_path, class_path).unwrap();
        let created = self.registry.add_asset(asset.clone());
        let created: Vec<&str> = created.iter().map(String::as_str).collect();
        self.source.on_paths_added(&created);
        self.source.on_asset_added(&asset);
        asset
    }

    fn add_path(&self, path: &str) {
        let created = self.registry.add_path(path);
        let created: Vec<&str> = created.iter().map(String::as_str).collect();
        self.source.on_paths_added(&created);
    }

    fn items(&self, filter: &CompiledFilter) -> Vec<Item> {
        let mut items = Vec::new();
        self.source.enumerate_items_matching_filter(filter, |item| {
            items.push(item);
            true
        });
        items
    }

    fn item_at(&self, virtual_path: &str, item_types: ItemTypeFilter) -> Option<Item> {
        let mut found = None;
        self.source
            .enumerate_items_at_path(virtual_path, item_types, |item| {
                found = Some(item);
                false
            });
        found
    }
}

fn paths(items: &[Item]) -> Vec<&str> {
    items.iter().map(Item::virtual_path).collect()
}

fn set(items: &[&str]) -> FnvHashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// `/Game` with two assets in `/Game/Foo`.
fn game_harness() -> Harness {
    let harness = Harness::new(CatalogConfig::default(), &["/Game"]);
    harness.add_asset("/Game/Foo/Bar.Bar", "/Script/Mesh");
    harness.add_asset("/Game/Foo/Baz.Baz", "/Script/Sound");
    harness
}

/// Three roots under `/All`, plugins grouped under `/All/Plugins`.
fn catalog_harness() -> Harness {
    let config = CatalogConfig {
        virtual_root: Some("/All".to_string()),
        organize_plugins: true,
        ..Default::default()
    };
    let harness = Harness::new(config, &["/Game", "/Engine", "/Paper2D"]);
    harness.add_asset("/Game/Foo/Bar.Bar", "/Script/Mesh");
    harness.add_asset("/Game/Foo/Baz.Baz", "/Script/Sound");
    harness.add_asset("/Game/Developers/Me/Test.Test", "/Script/Mesh");
    harness.add_asset("/Game/Maps/Arena.Arena", "/Script/World");
    harness.add_asset("/Engine/Core/Cube.Cube", "/Script/Mesh");
    harness.add_asset("/Paper2D/Sprites/Tree.Tree", "/Script/Sprite");
    harness
}

const CATALOG_FOLDERS: &[&str] = &[
    "/All",
    "/All/Engine",
    "/All/Engine/Core",
    "/All/Game",
    "/All/Game/Developers",
    "/All/Game/Developers/Me",
    "/All/Game/Foo",
    "/All/Game/Maps",
    "/All/Plugins",
    "/All/Plugins/Paper2D",
    "/All/Plugins/Paper2D/Sprites",
];

const CATALOG_FILES: &[&str] = &[
    "/All/Engine/Core/Cube",
    "/All/Game/Developers/Me/Test",
    "/All/Game/Foo/Bar",
    "/All/Game/Foo/Baz",
    "/All/Game/Maps/Arena",
    "/All/Plugins/Paper2D/Sprites/Tree",
];

/// Checks that the single-item predicate accepts exactly what enumeration
/// produced, over every folder and file of the catalog.
fn assert_bulk_single_agreement(harness: &Harness, filter: &CompiledFilter) {
    let emitted: BTreeSet<(bool, String)> = harness
        .items(filter)
        .iter()
        .map(|item| (item.as_folder().is_some(), item.virtual_path().to_string()))
        .collect();

    let folders = CATALOG_FOLDERS
        .iter()
        .map(|path| harness.item_at(path, ItemTypeFilter::FOLDERS));
    let files = CATALOG_FILES
        .iter()
        .map(|path| harness.item_at(path, ItemTypeFilter::FILES));
    for candidate in folders.chain(files) {
        let candidate = candidate.unwrap();
        let key = (
            candidate.as_folder().is_some(),
            candidate.virtual_path().to_string(),
        );
        assert_eq!(
            harness.source.does_item_pass_filter(&candidate, filter),
            emitted.contains(&key),
            "disagreement for {} at {}",
            key.1,
            filter.virtual_path
        );
    }
}

#[test]
fn internal_virtual_round_trip() {
    let harness = catalog_harness();
    let space = harness.source.space();
    let mut internal_paths = Vec::new();
    harness.registry.enumerate_sub_paths("/", true, &mut |path: &str| {
        internal_paths.push(path.to_string());
        true
    });
    assert!(!internal_paths.is_empty());
    for internal in internal_paths {
        let virtual_path = space.try_convert_internal_to_virtual(&internal).unwrap();
        assert_eq!(
            space.try_convert_virtual_to_internal(&virtual_path).as_deref(),
            Some(internal.as_str())
        );
    }
    assert_eq!(
        space
            .try_convert_internal_to_virtual("/Paper2D/Sprites")
            .as_deref(),
        Some("/All/Plugins/Paper2D/Sprites")
    );
}

#[test]
fn non_recursive_query_lists_direct_children_only() {
    let harness = game_harness();
    let filter = harness
        .source
        .compile_filter("/Game", &DataFilter::default());
    let items = harness.items(&filter);
    assert_eq!(paths(&items), vec!["/Game/Foo"]);
    assert!(items[0].as_folder().is_some());
}

#[test]
fn recursive_class_query_matches_single_item_checks() {
    let harness = game_harness();
    let request = DataFilter {
        class_filter: Some(ClassFilter {
            class_names_to_include: vec!["/Script/Mesh".to_string()],
            ..Default::default()
        }),
        ..Default::default()
    }
    .recursive(true)
    .item_types(ItemTypeFilter::FILES);
    let filter = harness.source.compile_filter("/Game", &request);

    let items = harness.items(&filter);
    assert_eq!(paths(&items), vec!["/Game/Foo/Bar"]);

    let baz = harness
        .item_at("/Game/Foo/Baz", ItemTypeFilter::FILES)
        .unwrap();
    assert!(!harness.source.does_item_pass_filter(&baz, &filter));
    assert!(harness.source.does_item_pass_filter(&items[0], &filter));
}

#[test]
fn dismount_empties_cache_and_results() {
    let harness = game_harness();
    let owner = FilterCacheIdOwner::new();
    let request = DataFilter::default().recursive(true).cached(owner.id());
    let before = harness.source.compile_filter("/Game", &request);
    assert_eq!(harness.items(&before).len(), 3);

    harness.source.on_content_path_dismounted("/Game");
    let cached = harness
        .source
        .filter_cache()
        .get(owner.id(), "/Game", ItemAttributeFilter::default())
        .unwrap();
    assert!(cached.is_empty());

    let after = harness.source.compile_filter("/Game", &request);
    assert!(after.excludes_all_assets());
    assert!(harness.items(&after).is_empty());
}

#[test]
fn deny_all_paths_short_circuit_without_registry_queries() {
    let harness = game_harness();
    let sub_paths_before = harness.registry.sub_path_queries();
    let assets_before = harness.registry.asset_queries();

    let request = DataFilter {
        package_filter: Some(PackageFilter {
            path_permission_list: Some(Arc::new(PathPermissionList::deny_all())),
            ..Default::default()
        }),
        ..Default::default()
    }
    .recursive(true);
    let filter = harness.source.compile_filter("/Game", &request);
    assert!(filter.excludes_all_assets());
    assert!(harness.items(&filter).is_empty());

    assert_eq!(harness.registry.sub_path_queries(), sub_paths_before);
    assert_eq!(harness.registry.asset_queries(), assets_before);
}

#[test]
fn exclusive_paths_are_subtracted_from_inclusive() {
    let harness = game_harness();
    for path in ["/Game/A", "/Game/B", "/Game/C"] {
        harness.add_path(path);
    }
    let request = DataFilter {
        package_filter: Some(PackageFilter {
            package_paths_to_include: vec![
                "/Game/A".to_string(),
                "/Game/B".to_string(),
                "/Game/C".to_string(),
            ],
            package_paths_to_exclude: vec!["/Game/B".to_string()],
            ..Default::default()
        }),
        ..Default::default()
    }
    .recursive(true)
    .item_types(ItemTypeFilter::FILES);
    let filter = harness.source.compile_filter("/Game", &request);

    assert!(!filter.excludes_all_assets());
    assert_eq!(
        filter.asset_filter.inclusive.package_paths,
        set(&["/Game/A", "/Game/C"])
    );
    assert!(filter.asset_filter.exclusive.package_paths.is_empty());
}

#[test]
fn cached_scope_tracks_path_additions() {
    let harness = game_harness();
    let first = FilterCacheIdOwner::new();
    let request = DataFilter::default()
        .recursive(true)
        .item_types(ItemTypeFilter::FILES);

    harness
        .source
        .compile_filter("/Game", &request.clone().cached(first.id()));
    harness.add_path("/Game/Foo/New");
    harness.add_asset("/Game/Foo/New/Thing.Thing", "/Script/Mesh");

    let cached = harness
        .source
        .compile_filter("/Game", &request.clone().cached(first.id()));
    let second = FilterCacheIdOwner::new();
    let fresh = harness
        .source
        .compile_filter("/Game", &request.cached(second.id()));

    assert!(cached.asset_filter.inclusive.package_paths.contains("/Game/Foo/New"));
    assert_eq!(cached.asset_filter.inclusive, fresh.asset_filter.inclusive);
    assert_eq!(paths(&harness.items(&cached)), paths(&harness.items(&fresh)));
}

#[test]
fn mounting_invalidates_containing_scopes() {
    let config = CatalogConfig {
        virtual_root: Some("/All".to_string()),
        ..Default::default()
    };
    let harness = Harness::new(config, &["/Game"]);
    harness.add_asset("/Game/Foo/Bar.Bar", "/Script/Mesh");
    let owner = FilterCacheIdOwner::new();
    let request = DataFilter::default()
        .recursive(true)
        .item_types(ItemTypeFilter::FILES)
        .cached(owner.id());
    harness.source.compile_filter("/All", &request);

    harness.source.on_content_path_mounted("/Engine").unwrap();
    harness.add_asset("/Engine/Core/Cube.Cube", "/Script/Mesh");
    let filter = harness.source.compile_filter("/All", &request);
    assert_eq!(
        paths(&harness.items(&filter)),
        vec!["/All/Engine/Core/Cube", "/All/Game/Foo/Bar"]
    );
}

#[test]
fn bulk_and_single_item_evaluation_agree() {
    let harness = catalog_harness();
    let recursive = DataFilter::default().recursive(true);
    let requests = [
        ("/All", recursive.clone()),
        ("/All", DataFilter::default()),
        ("/All/Game", DataFilter::default()),
        ("/All/Game", recursive.clone()),
        (
            "/All/Plugins",
            recursive.clone().attributes(ItemAttributeFilter::INCLUDE_ALL),
        ),
        (
            "/All/Game",
            DataFilter {
                package_filter: Some(PackageFilter {
                    path_permission_list: Some(Arc::new(PathPermissionList::from_entries(
                        ["/Game/Foo"],
                        [] as [&str; 0],
                    ))),
                    ..Default::default()
                }),
                ..recursive.clone()
            },
        ),
        (
            "/All",
            DataFilter {
                package_filter: Some(PackageFilter {
                    package_paths_to_exclude: vec!["/Game/Maps".to_string()],
                    recursive_package_paths_to_exclude: true,
                    ..Default::default()
                }),
                ..recursive.clone()
            },
        ),
        (
            "/All",
            DataFilter {
                package_filter: Some(PackageFilter {
                    package_paths_to_include: vec!["/Game".to_string(), "/Game/Foo".to_string()],
                    ..Default::default()
                }),
                ..recursive.clone()
            },
        ),
        (
            "/All/Game",
            DataFilter {
                unsupported_class_filter: Some(UnsupportedClassFilter {
                    class_permission_list: Arc::new(PathPermissionList::from_entries(
                        ["/Script/Mesh"],
                        [] as [&str; 0],
                    )),
                    folder_permission_list: None,
                }),
                ..recursive.clone()
            },
        ),
        ("/All/Nowhere", recursive),
    ];

    for (virtual_path, request) in &requests {
        let filter = harness.source.compile_filter(virtual_path, request);
        assert_bulk_single_agreement(&harness, &filter);
    }
}

#[test]
fn attribute_filter_hides_developer_folders() {
    let harness = catalog_harness();
    let filter = harness
        .source
        .compile_filter("/All/Game", &DataFilter::default().recursive(true));
    let items = harness.items(&filter);
    assert!(!paths(&items)
        .iter()
        .any(|path| path.contains("/Developers")));

    let with_developers = harness.source.compile_filter(
        "/All/Game",
        &DataFilter::default()
            .recursive(true)
            .attributes(ItemAttributeFilter::default() | ItemAttributeFilter::INCLUDE_DEVELOPER),
    );
    assert!(paths(&harness.items(&with_developers)).contains(&"/All/Game/Developers/Me/Test"));
}

#[test]
fn virtual_scan_emits_parents_before_children() {
    let harness = catalog_harness();
    let filter = harness.source.compile_filter(
        "/All",
        &DataFilter::default()
            .recursive(true)
            .item_types(ItemTypeFilter::FOLDERS),
    );
    assert_eq!(
        paths(&harness.items(&filter)),
        vec![
            "/All/Engine",
            "/All/Engine/Core",
            "/All/Game",
            "/All/Game/Foo",
            "/All/Game/Maps",
            "/All/Plugins",
            "/All/Plugins/Paper2D",
            "/All/Plugins/Paper2D/Sprites",
        ]
    );
}

#[test]
fn unsupported_assets_are_reclassified() {
    let harness = catalog_harness();
    let mesh_only = Arc::new(PathPermissionList::from_entries(["/Script/Mesh"], [] as [&str; 0]));
    let request = DataFilter {
        class_filter: Some(ClassFilter {
            class_permission_list: Some(mesh_only),
            ..Default::default()
        }),
        unsupported_class_filter: Some(UnsupportedClassFilter {
            class_permission_list: Arc::new(PathPermissionList::from_entries(
                ["/Script/Mesh"],
                [] as [&str; 0],
            )),
            folder_permission_list: Some(Arc::new(PathPermissionList::from_entries(
                ["/Game/Foo"],
                [] as [&str; 0],
            ))),
        }),
        ..Default::default()
    }
    .recursive(true)
    .item_types(ItemTypeFilter::FILES);
    let filter = harness.source.compile_filter("/All/Game", &request);
    assert!(filter.unsupported_filter.is_some());

    let items = harness.items(&filter);
    let summary: Vec<(&str, bool)> = items
        .iter()
        .map(|item| (item.virtual_path(), item.is_unsupported()))
        .collect();
    assert_eq!(
        summary,
        vec![("/All/Game/Foo/Bar", false), ("/All/Game/Foo/Baz", true)]
    );

    let mut baz = harness
        .item_at("/All/Game/Foo/Baz", ItemTypeFilter::FILES)
        .unwrap();
    assert!(harness.source.convert_item_for_filter(&mut baz, &filter));
    assert!(baz.is_unsupported());
}

#[test]
fn unsupported_class_list_alone_does_not_narrow_the_query() {
    let harness = game_harness();
    let request = DataFilter {
        unsupported_class_filter: Some(UnsupportedClassFilter {
            class_permission_list: Arc::new(PathPermissionList::from_entries(
                ["/Script/Mesh"],
                [] as [&str; 0],
            )),
            folder_permission_list: None,
        }),
        ..Default::default()
    }
    .recursive(true)
    .item_types(ItemTypeFilter::FILES);
    let filter = harness.source.compile_filter("/Game", &request);
    assert!(filter.asset_filter.inclusive.class_paths.is_empty());

    let items = harness.items(&filter);
    assert_eq!(paths(&items), vec!["/Game/Foo/Bar", "/Game/Foo/Baz"]);
    assert!(items.iter().all(|item| !item.is_unsupported()));
}

#[test]
fn class_deny_all_without_fallback_excludes_everything() {
    let harness = game_harness();
    let request = DataFilter {
        class_filter: Some(ClassFilter {
            class_permission_list: Some(Arc::new(PathPermissionList::deny_all())),
            ..Default::default()
        }),
        ..Default::default()
    }
    .recursive(true);
    let filter = harness.source.compile_filter("/Game", &request);
    assert!(filter.excludes_all_assets());
    assert!(harness.items(&filter).is_empty());
}

#[test]
fn collections_resolve_to_object_paths() {
    let harness = catalog_harness();
    let favorites = CollectionRef::new("Favorites", CollectionShareType::Local);
    let nested = CollectionRef::new("Nested", CollectionShareType::Shared);
    harness
        .collections
        .add_object(&favorites, "/Game/Foo/Bar.Bar");
    harness.collections.add_object(&nested, "/Game/Maps/Arena.Arena");
    harness.collections.add_child(&favorites, &nested);

    let request = |include_child_collections: bool| {
        DataFilter {
            collection_filter: Some(CollectionFilter {
                selected_collections: vec![favorites.clone()],
                include_child_collections,
            }),
            ..Default::default()
        }
        .recursive(true)
        .item_types(ItemTypeFilter::FILES)
    };

    let direct = harness.source.compile_filter("/All", &request(false));
    assert_eq!(paths(&harness.items(&direct)), vec!["/All/Game/Foo/Bar"]);

    let nested_too = harness.source.compile_filter("/All", &request(true));
    assert_eq!(
        paths(&harness.items(&nested_too)),
        vec!["/All/Game/Foo/Bar", "/All/Game/Maps/Arena"]
    );

    let empty = CollectionRef::new("Empty", CollectionShareType::Private);
    let none = harness.source.compile_filter(
        "/All",
        &DataFilter {
            collection_filter: Some(CollectionFilter {
                selected_collections: vec![empty],
                include_child_collections: true,
            }),
            ..Default::default()
        }
        .recursive(true),
    );
    assert!(none.excludes_all_assets());
}

#[test]
fn legacy_callbacks_compile_and_supply_assets() {
    let harness = game_harness();
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = harness.registry.clone();
    let counter = calls.clone();
    let compile: CompileCallback = Arc::new(move |filter: &AssetFilter| {
        counter.fetch_add(1, Ordering::Relaxed);
        registry.compile_filter(filter)
    });
    let custom = AssetData::new("/Game/Generated/Extra.Extra", "/Script/Mesh").unwrap();
    let supplied = custom.clone();
    let custom_source_assets: CustomSourceAssetsCallback =
        Arc::new(move |_: &AssetFilter| vec![supplied.clone()]);

    let request = DataFilter {
        legacy_filter: Some(LegacyFilter {
            compile: Some(compile),
            custom_source_assets: Some(custom_source_assets),
        }),
        ..Default::default()
    }
    .recursive(true)
    .item_types(ItemTypeFilter::FILES);
    let filter = harness.source.compile_filter("/Game", &request);
    assert!(calls.load(Ordering::Relaxed) >= 2);

    let items = harness.items(&filter);
    assert_eq!(
        paths(&items),
        vec!["/Game/Generated/Extra", "/Game/Foo/Bar", "/Game/Foo/Baz"]
    );
    assert!(harness.source.does_item_pass_filter(&items[0], &filter));
}

#[test]
fn custom_source_callback_sees_the_narrowed_scope() {
    let harness = game_harness();
    harness.add_path("/Game/Other");
    let seen: Arc<Mutex<Option<AssetFilter>>> = Arc::new(Mutex::new(None));
    let recorder = seen.clone();
    let custom_source_assets: CustomSourceAssetsCallback =
        Arc::new(move |filter: &AssetFilter| {
            *recorder.lock() = Some(filter.clone());
            Vec::new()
        });
    let request = DataFilter {
        class_filter: Some(ClassFilter {
            class_names_to_include: vec!["/Script/Mesh".to_string()],
            ..Default::default()
        }),
        legacy_filter: Some(LegacyFilter {
            compile: None,
            custom_source_assets: Some(custom_source_assets),
        }),
        ..Default::default()
    }
    .recursive(true)
    .item_types(ItemTypeFilter::FILES);
    harness.source.compile_filter("/Game/Foo", &request);

    let seen = seen.lock().take().unwrap();
    assert_eq!(seen.package_paths, vec!["/Game/Foo"]);
    assert_eq!(seen.class_paths, vec!["/Script/Mesh"]);
    assert!(!seen.recursive_paths);
}

#[test]
fn temporary_caching_is_restored_after_compile() {
    let harness = game_harness();
    assert!(!harness.registry.temporary_caching_mode());
    harness
        .source
        .compile_filter("/Game", &DataFilter::default().recursive(true));
    assert!(!harness.registry.temporary_caching_mode());
}

#[test]
fn cache_ids_are_released_per_owner() {
    let harness = game_harness();
    let first = FilterCacheIdOwner::new();
    let second = FilterCacheIdOwner::new();
    let request = DataFilter::default().recursive(true);
    harness
        .source
        .compile_filter("/Game", &request.clone().cached(first.id()));
    harness
        .source
        .compile_filter("/Game", &request.cached(second.id()));
    assert_eq!(harness.source.filter_cache().len(), 2);

    harness
        .source
        .remove_unused_cached_data(first.id(), &["/Game".to_string()]);
    assert_eq!(harness.source.filter_cache().len(), 1);
    harness.source.clear_cached_data(second.id());
    assert!(harness.source.filter_cache().is_empty());
}
