//! Discovery progress reporting.

use super::AssetDataSource;
use crate::registry::FileLoadProgress;

/// Status line shown while the registry is still loading.
pub fn discovery_status_text(progress: &FileLoadProgress) -> String {
    if progress.discovering_files && progress.total_assets == 0 {
        return "Discovering assets".to_string();
    }
    format!(
        "Discovering assets ({} / {})",
        progress.processed_assets, progress.total_assets
    )
}

impl AssetDataSource {
    /// Records the registry's latest load progress.
    pub fn on_file_load_progress_updated(&self, progress: FileLoadProgress) {
        let previous = self.last_progress.lock().replace(progress);
        let was_complete = previous.is_some_and(|p| p.is_complete());
        if progress.is_complete() && !was_complete {
            log::info!(
                "asset discovery complete assets={}",
                progress.total_assets
            );
        }
    }

    /// A status message while items are still being discovered.
    pub fn is_discovering_items(&self) -> Option<String> {
        let recorded = *self.last_progress.lock();
        let progress = recorded.unwrap_or_else(|| self.registry.file_load_progress());
        if progress.is_complete() && !self.registry.is_loading_assets() {
            return None;
        }
        Some(discovery_status_text(&progress))
    }
}
