//! Attribute filtering of content paths.
//!
//! Only the first two segments of a path decide whether it is visible: the
//! root family (project, engine, plugin) and the well-known system folders
//! directly beneath a root. Anything deeper inherits the verdict of its
//! ancestors, so recursive walks can skip the check once past that depth.

use super::util::{path_segments, root_of};
use crate::config::RootClassifier;
use crate::types::ItemAttributeFilter;

/// Segments at or beyond this index are never inspected.
pub const ATTRIBUTE_FILTER_MAX_DEPTH: usize = 2;

const DEVELOPERS_FOLDER: &str = "Developers";
const LOCALIZED_FOLDER: &str = "L10N";
const EXTERNAL_PACKAGES_PREFIX: &str = "__External";

/// Tests an internal path against an attribute filter.
///
/// `already_checked_depth` is the number of leading segments the caller has
/// already validated (for example the depth of a parent that passed); those
/// segments are skipped.
pub fn passes_attribute_filter(
    path: &str,
    already_checked_depth: usize,
    filter: ItemAttributeFilter,
    roots: &RootClassifier,
) -> bool {
    if already_checked_depth >= ATTRIBUTE_FILTER_MAX_DEPTH {
        return true;
    }

    for (depth, segment) in path_segments(path)
        .enumerate()
        .take(ATTRIBUTE_FILTER_MAX_DEPTH)
        .skip(already_checked_depth)
    {
        let passes = match depth {
            0 => match root_of(path) {
                Some(root) if &root[1..] == segment => {
                    filter.contains(roots.kind(root).required_attribute())
                }
                // Relative or doubled-slash paths have no root.
                _ => false,
            },
            _ => {
                if segment.starts_with(EXTERNAL_PACKAGES_PREFIX) {
                    false
                } else if segment == DEVELOPERS_FOLDER {
                    filter.contains(ItemAttributeFilter::INCLUDE_DEVELOPER)
                } else if segment.eq_ignore_ascii_case(LOCALIZED_FOLDER) {
                    filter.contains(ItemAttributeFilter::INCLUDE_LOCALIZED)
                } else {
                    true
                }
            }
        };
        if !passes {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;

    fn roots() -> RootClassifier {
        CatalogConfig::default().root_classifier()
    }

    #[test]
    fn root_family_gates_first_segment() {
        let roots = roots();
        let project_only = ItemAttributeFilter::INCLUDE_PROJECT;
        assert!(passes_attribute_filter("/Game/Maps", 0, project_only, &roots));
        assert!(!passes_attribute_filter("/Engine/Maps", 0, project_only, &roots));
        assert!(!passes_attribute_filter("/Paper2D", 0, project_only, &roots));
        assert!(passes_attribute_filter(
            "/Paper2D",
            0,
            ItemAttributeFilter::INCLUDE_PLUGINS,
            &roots
        ));
    }

    #[test]
    fn system_folders_need_their_flags() {
        let roots = roots();
        let filter = ItemAttributeFilter::default();
        assert!(!passes_attribute_filter("/Game/Developers/me", 0, filter, &roots));
        assert!(!passes_attribute_filter("/Game/l10n/fr", 0, filter, &roots));
        assert!(passes_attribute_filter(
            "/Game/L10N/fr",
            0,
            filter | ItemAttributeFilter::INCLUDE_LOCALIZED,
            &roots
        ));
    }

    #[test]
    fn external_packages_are_always_hidden() {
        let roots = roots();
        assert!(!passes_attribute_filter(
            "/Game/__ExternalActors__/Map",
            0,
            ItemAttributeFilter::INCLUDE_ALL,
            &roots
        ));
    }

    #[test]
    fn already_checked_segments_are_skipped() {
        let roots = roots();
        let filter = ItemAttributeFilter::INCLUDE_PROJECT;
        // Root segment is rejected, but the caller vouched for it.
        assert!(passes_attribute_filter("/Engine/Maps", 1, filter, &roots));
        assert!(passes_attribute_filter("/Game/Developers/x", 2, filter, &roots));
        assert!(!passes_attribute_filter("/Game/Developers", 1, filter, &roots));
    }

    #[test]
    fn malformed_roots_fail_without_panicking() {
        let roots = roots();
        let all = ItemAttributeFilter::INCLUDE_ALL;
        assert!(!passes_attribute_filter("Game/Maps", 0, all, &roots));
        assert!(!passes_attribute_filter("//Gämé/Maps", 0, all, &roots));
        assert!(passes_attribute_filter("/Gämé/Maps", 0, all, &roots));
        assert!(!passes_attribute_filter(
            "/Gämé/Maps",
            0,
            ItemAttributeFilter::INCLUDE_PROJECT,
            &roots
        ));
    }
}
