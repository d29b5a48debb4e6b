//! Boundary to the service that inspects and compresses files and stores
//! settings.
//!
//! - [`RemoteService`]: typed request/response contract, one method per command
//! - [`LocalService`]: in-process implementation backed by a JSON settings
//!   file and an external optimizer command
//! - [`SidecarTransformer`]: runs the optimizer command for one file

mod local;
mod settings_file;
mod sidecar;

use std::path::Path;
use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::core::{FileEntry, FileInfo, ProfileData, SettingsData, TransformOutput};
use crate::utils::{OptimizerResult, TransformError};

pub use local::LocalService;
pub use settings_file::SettingsFile;
pub use sidecar::{SidecarConfig, SidecarTransformer};

/// Notifications pushed by the service outside any request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// Stored settings changed, possibly from another client.
    SettingsChanged,
}

#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Reads name, extension and size of a file.
    async fn inspect(&self, path: &str) -> OptimizerResult<FileInfo>;

    /// Compresses `entry` with `profile`.
    async fn transform(
        &self,
        profile: &ProfileData,
        entry: &FileEntry,
    ) -> Result<TransformOutput, TransformError>;

    async fn get_settings(&self) -> OptimizerResult<SettingsData>;

    async fn save_settings(&self, settings: &SettingsData) -> OptimizerResult<()>;

    async fn reset_settings(&self) -> OptimizerResult<()>;

    /// Restores a profile's parameters, keeping its id and name.
    async fn reset_profile(&self, id: u32) -> OptimizerResult<()>;

    async fn add_profile(&self, name: &str) -> OptimizerResult<()>;

    async fn delete_profile(&self, id: u32) -> OptimizerResult<()>;

    async fn open_settings_window(&self) -> OptimizerResult<()>;

    /// Shows `path` in the platform file manager.
    async fn open_finder_at_path(&self, path: &str) -> OptimizerResult<()>;

    /// Sends every supported image at or below `path` to `found`, one at a time.
    async fn discover_images(&self, path: &Path, found: mpsc::Sender<String>);

    fn subscribe(&self) -> broadcast::Receiver<ServiceEvent>;
}
