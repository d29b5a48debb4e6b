//! Per-file workflow: inspect, wait for a compression slot, compress.
//!
//! Each added path runs as its own task. Progress is reported only through the
//! [`FileRegistry`]; once an entry has been removed, later results for it are
//! dropped without a trace.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::{EntryId, FileRegistry, FileStatus, FileUpdate, ProfileStore};
use crate::service::RemoteService;
use crate::utils::{TransformError, savings_percentage};
use crate::worker::ConcurrencyLimiter;

#[derive(Clone)]
pub struct ProcessingPipeline {
    service: Arc<dyn RemoteService>,
    registry: FileRegistry,
    profiles: Arc<ProfileStore>,
    limiter: ConcurrencyLimiter,
}

impl ProcessingPipeline {
    pub fn new(
        service: Arc<dyn RemoteService>,
        registry: FileRegistry,
        profiles: Arc<ProfileStore>,
        limiter: ConcurrencyLimiter,
    ) -> Self {
        Self {
            service,
            registry,
            profiles,
            limiter,
        }
    }

    pub fn registry(&self) -> &FileRegistry {
        &self.registry
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn service(&self) -> &Arc<dyn RemoteService> {
        &self.service
    }

    /// Registers `path` and starts its workflow in the background.
    ///
    /// Returns `false` without doing anything if the path is already listed.
    pub fn add_file(&self, path: impl Into<String>) -> bool {
        let path = path.into();
        let Some(id) = self.registry.add_file(&path) else {
            return false;
        };
        let pipeline = self.clone();
        tokio::spawn(async move {
            pipeline.process(id).await;
        });
        true
    }

    /// Drives the entry `id` to a terminal status.
    ///
    /// Returns that status, or `None` if the entry was removed on the way.
    pub async fn process(&self, id: EntryId) -> Option<FileStatus> {
        debug!("Inspecting {}", id.path);
        let info = match self.service.inspect(&id.path).await {
            Ok(info) => info,
            Err(e) => {
                warn!("Inspection failed for {}: {}", id.path, e);
                return self
                    .registry
                    .update_file(&id, FileUpdate::failed(FileStatus::Error, e.to_string()))
                    .map(|entry| entry.status);
            }
        };

        self.registry.update_file(&id, info.into())?;
        let entry = self
            .registry
            .update_file(&id, FileUpdate::status(FileStatus::Compressing))?;

        let permit = self.limiter.acquire().await;
        if !self.registry.is_live(&id) {
            debug!("{} was removed while queued, skipping", id.path);
            return None;
        }

        // The profile active at dispatch applies, not the one active when
        // the file was added.
        let profile = self.profiles.active_profile();
        debug!("Compressing {} with profile '{}'", id.path, profile.name);
        let outcome = self.service.transform(&profile, &entry).await;
        permit.release();

        let update = match outcome {
            Ok(output) => {
                info!(
                    "Compressed {}: {} -> {} bytes",
                    entry.file,
                    entry.original_size.unwrap_or_default(),
                    output.out_size
                );
                FileUpdate {
                    status: Some(FileStatus::Complete),
                    size: Some(output.out_size),
                    savings: savings_percentage(entry.original_size, output.out_size),
                    out_path: Some(output.out_path),
                    ..Default::default()
                }
            }
            Err(TransformError::NotSmaller(message)) => {
                info!("{} is already smaller than any result", entry.file);
                FileUpdate::failed(FileStatus::AlreadySmaller, message)
            }
            Err(TransformError::Generic(message)) => {
                warn!("Compression failed for {}: {}", id.path, message);
                FileUpdate::failed(FileStatus::Error, message)
            }
        };

        self.registry.update_file(&id, update).map(|entry| entry.status)
    }
}
