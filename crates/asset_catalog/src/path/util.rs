//! Path normalization and comparison helpers.
//!
//! All paths are absolute, slash-delimited and carry no trailing slash except
//! the root path `/` itself.

use memchr::memrchr;

/// Normalizes a path (forward slashes, leading slash, no trailing slash).
pub fn normalize_path(raw: &str) -> String {
    let mut normalized = raw.trim().replace('\\', "/");
    if !normalized.starts_with('/') {
        normalized.insert(0, '/');
    }
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// Flags paths that break the no-trailing-slash contract.
///
/// Callers are expected to pass normalized paths; this only fires in debug
/// builds and is a no-op in release.
#[inline]
pub fn debug_check_path(path: &str) {
    debug_assert!(
        path == "/" || (path.starts_with('/') && !path.ends_with('/')),
        "path must be absolute with no trailing slash: {path:?}"
    );
}

/// Returns the parent of a path; `/` has no parent.
pub fn parent_path(path: &str) -> Option<&str> {
    if path == "/" || path.is_empty() {
        return None;
    }
    match memrchr(b'/', path.as_bytes()) {
        Some(0) => Some("/"),
        Some(index) => Some(&path[..index]),
        None => None,
    }
}

/// Splits a path into its non-empty segments.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Depth of a path, counted from zero at the first segment (`/Game` is 0).
///
/// The root path `/` also reports 0.
pub fn path_depth(path: &str) -> usize {
    path_segments(path).count().saturating_sub(1)
}

/// Last segment of a path.
pub fn short_name(path: &str) -> &str {
    match memrchr(b'/', path.as_bytes()) {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

/// First-segment root of a path (`/Game/Maps` -> `/Game`).
pub fn root_of(path: &str) -> Option<&str> {
    let rest = path.strip_prefix('/')?;
    if rest.is_empty() {
        return None;
    }
    match rest.find('/') {
        Some(index) => Some(&path[..index + 1]),
        None => Some(path),
    }
}

/// Joins a child name onto a parent path.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// True if `candidate` equals `base` or lies below it on a segment boundary.
pub fn is_path_or_descendant(candidate: &str, base: &str) -> bool {
    if base == "/" {
        return candidate.starts_with('/');
    }
    match candidate.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// True if `candidate` lies strictly below `base`.
pub fn is_descendant_path(candidate: &str, base: &str) -> bool {
    candidate != base && is_path_or_descendant(candidate, base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators_and_trailing_slash() {
        assert_eq!(normalize_path("Game\\Maps\\"), "/Game/Maps");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("///"), "/");
    }

    #[test]
    fn parent_chain() {
        assert_eq!(parent_path("/Game/Maps/Arena"), Some("/Game/Maps"));
        assert_eq!(parent_path("/Game"), Some("/"));
        assert_eq!(parent_path("/"), None);
    }

    #[test]
    fn depth_and_names() {
        assert_eq!(path_depth("/Game"), 0);
        assert_eq!(path_depth("/Game/Maps/Arena"), 2);
        assert_eq!(short_name("/Game/Maps/Arena"), "Arena");
        assert_eq!(root_of("/Game/Maps/Arena"), Some("/Game"));
        assert_eq!(root_of("/Game"), Some("/Game"));
        assert_eq!(root_of("/"), None);
        assert_eq!(join_path("/", "Game"), "/Game");
        assert_eq!(join_path("/Game", "Maps"), "/Game/Maps");
    }

    #[test]
    fn descendant_checks_respect_segment_boundaries() {
        assert!(is_path_or_descendant("/Game/Maps", "/Game"));
        assert!(is_path_or_descendant("/Game", "/Game"));
        assert!(!is_path_or_descendant("/GameExtra", "/Game"));
        assert!(is_path_or_descendant("/Game", "/"));
        assert!(is_descendant_path("/Game/Maps", "/Game"));
        assert!(!is_descendant_path("/Game", "/Game"));
    }
}
