//! Catalog configuration.
//!
//! Controls how internal content roots are laid out in the virtual tree and
//! which roots count as project or engine content. Every other root is
//! treated as a plugin.

use fnv::FnvHashSet;
use serde::Deserialize;

use crate::error::{CatalogError, Result};
use crate::path::normalize_path;
use crate::types::RootKind;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Optional virtual folder every root is presented under, e.g. `/All`.
    pub virtual_root: Option<String>,
    /// Present plugin roots under `<virtual_root>/Plugins`.
    pub organize_plugins: bool,
    pub project_roots: Vec<String>,
    pub engine_roots: Vec<String>,
    /// Default for `is_folder_visible` when the caller passes no flags.
    pub hide_empty_folders: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            virtual_root: None,
            organize_plugins: false,
            project_roots: vec!["/Game".to_string()],
            engine_roots: vec!["/Engine".to_string()],
            hide_empty_folders: false,
        }
    }
}

impl CatalogConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects layouts the path space cannot express.
    pub fn validate(&self) -> Result<()> {
        if let Some(prefix) = self.virtual_root.as_deref() {
            if !prefix.starts_with('/') || prefix == "/" || prefix.ends_with('/') {
                return Err(CatalogError::Config(format!(
                    "virtual_root must be an absolute path without a trailing slash: {prefix}"
                )));
            }
        }
        for root in self.project_roots.iter().chain(self.engine_roots.iter()) {
            if !root.starts_with('/') || root.len() < 2 || root[1..].contains('/') {
                return Err(CatalogError::Config(format!(
                    "content roots must be single-segment absolute paths: {root}"
                )));
            }
        }
        Ok(())
    }

    /// Virtual prefix with no trailing slash; empty when roots sit at `/`.
    pub fn virtual_prefix(&self) -> &str {
        self.virtual_root.as_deref().unwrap_or("")
    }

    pub fn root_classifier(&self) -> RootClassifier {
        RootClassifier {
            project: self.project_roots.iter().map(|r| normalize_path(r)).collect(),
            engine: self.engine_roots.iter().map(|r| normalize_path(r)).collect(),
        }
    }
}

/// Maps a content root such as `/Game` to its family.
#[derive(Debug, Clone, Default)]
pub struct RootClassifier {
    project: FnvHashSet<String>,
    engine: FnvHashSet<String>,
}

impl RootClassifier {
    pub fn kind(&self, root: &str) -> RootKind {
        if self.project.contains(root) {
            RootKind::Project
        } else if self.engine.contains(root) {
            RootKind::Engine
        } else {
            RootKind::Plugin
        }
    }
}
