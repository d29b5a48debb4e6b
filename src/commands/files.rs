//! Commands acting on the file list.

use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::{AppState, FileEntry};
use crate::utils::{OptimizerError, OptimizerResult};

const DISCOVERY_BUFFER: usize = 64;

/// Adds every supported image found at or below each of `paths` and starts
/// compressing them. Returns how many new entries were registered.
pub async fn add_paths<I, P>(state: &AppState, paths: I) -> usize
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let pipeline = state.pipeline();
    let mut added = 0;

    for path in paths {
        let root = path.as_ref().to_path_buf();
        debug!("Discovering images in {}", root.display());

        let (tx, mut rx) = mpsc::channel(DISCOVERY_BUFFER);
        let service = pipeline.service().clone();
        let walk = tokio::spawn(async move { service.discover_images(&root, tx).await });

        while let Some(found) = rx.recv().await {
            if pipeline.add_file(found) {
                added += 1;
            }
        }
        if let Err(e) = walk.await {
            warn!("Image discovery for {} failed: {}", path.as_ref().display(), e);
        }
    }

    info!("Added {} file(s)", added);
    added
}

pub fn remove_file(state: &AppState, path: &str) -> Option<FileEntry> {
    state.registry().remove_file(path)
}

/// Empties the list. Running jobs finish but their results are discarded.
pub fn clear_files(state: &AppState) {
    state.registry().clear_files();
}

/// Shows the compressed file, or the original if there is none yet, in the
/// file manager.
pub async fn reveal_file(state: &AppState, path: &str) -> OptimizerResult<()> {
    let entry = state
        .registry()
        .get(path)
        .ok_or_else(|| OptimizerError::processing(format!("File not in list: {}", path)))?;
    let target = entry.out_path.as_deref().unwrap_or(&entry.path);
    state.service().open_finder_at_path(target).await
}
