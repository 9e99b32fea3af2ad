//! Path space: virtual and internal paths, the virtual folder tree and the
//! attribute filter applied to content roots.
//!
//! Internal paths are registry-native (`/Game/Maps`). Virtual paths are what
//! callers see; they may add a prefix (`/All/Game/Maps`), group plugin roots
//! (`/All/Plugins/Paper2D`), or name purely synthetic folders (`/All`).

mod attribute;
mod space;
mod tree;
mod util;

pub use attribute::{passes_attribute_filter, ATTRIBUTE_FILTER_MAX_DEPTH};
pub use space::{PathSpace, PLUGINS_FOLDER};
pub use tree::{VirtualNode, VirtualPathTree};
pub use util::{
    debug_check_path, is_descendant_path, is_path_or_descendant, join_path, normalize_path,
    parent_path, path_depth, path_segments, root_of, short_name,
};
