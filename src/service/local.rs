//! In-process service: inspects files on disk, runs the optimizer sidecar and
//! keeps settings in a JSON file.

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::{
    DEFAULT_PROFILE_ID, FileEntry, FileInfo, ProfileData, SettingsData, TransformOutput,
};
use crate::utils::{
    ImageType, OptimizerError, OptimizerResult, TransformError, extract_filename,
    format_from_extension, get_extension, get_file_size, is_supported_image, move_file,
    staging_path, validate_input_path, validate_profile,
};

use super::{RemoteService, ServiceEvent, SettingsFile, SidecarConfig, SidecarTransformer};
use super::sidecar::SidecarSettings;

const EVENT_CAPACITY: usize = 16;

pub struct LocalService {
    settings: SettingsFile,
    sidecar: SidecarTransformer,
    events: broadcast::Sender<ServiceEvent>,
}

impl LocalService {
    pub fn new(settings_path: impl Into<PathBuf>, sidecar: SidecarConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settings: SettingsFile::new(settings_path),
            sidecar: SidecarTransformer::new(sidecar),
            events,
        }
    }

    fn notify_settings_changed(&self) {
        let _ = self.events.send(ServiceEvent::SettingsChanged);
    }
}

/// Where the compressed version of `input` goes for `profile`.
///
/// `<dir>/<stem><postfix>.<ext>`; the postfix is left out only when the
/// profile overwrites originals and does not ask for it.
pub fn output_path(profile: &ProfileData, input: &str) -> OptimizerResult<(PathBuf, ImageType)> {
    let source_format = format_from_extension(input)?;
    let target_format = if profile.should_convert {
        profile.convert_extension
    } else {
        source_format
    };

    let path = Path::new(input);
    let original_extension = get_extension(path);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| OptimizerError::format(format!("File has no name: {}", input)))?;
    let postfix = if profile.should_overwrite && !profile.add_postfix {
        ""
    } else {
        profile.postfix.as_str()
    };

    let file_name = format!(
        "{}{}.{}",
        stem,
        postfix,
        target_format.output_extension(&original_extension)
    );
    let out = match path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    };
    Ok((out, target_format))
}

#[async_trait]
impl RemoteService for LocalService {
    async fn inspect(&self, path: &str) -> OptimizerResult<FileInfo> {
        let size = validate_input_path(path).await?;
        format_from_extension(path)?;
        Ok(FileInfo {
            filename: extract_filename(path).to_string(),
            extension: get_extension(path),
            size,
        })
    }

    async fn transform(
        &self,
        profile: &ProfileData,
        entry: &FileEntry,
    ) -> Result<TransformOutput, TransformError> {
        validate_profile(profile)?;
        let (out_path, format) = output_path(profile, &entry.path)?;
        let original_size = match entry.original_size {
            Some(size) => size,
            None => get_file_size(&entry.path).await?,
        };

        let staged = staging_path(&out_path);
        let settings = SidecarSettings::from_profile(profile, format);
        let result = self.sidecar.run(Path::new(&entry.path), &staged, &settings).await;
        let out_size = match result {
            Ok(size) => size,
            Err(e) => {
                let _ = tokio::fs::remove_file(&staged).await;
                return Err(e);
            }
        };

        if out_size >= original_size {
            let _ = tokio::fs::remove_file(&staged).await;
            debug!("{} did not shrink ({} -> {} bytes)", entry.path, original_size, out_size);
            return Err(TransformError::not_smaller(format!(
                "Compressed file is not smaller than the original ({} bytes)",
                original_size
            )));
        }

        if let Err(e) = move_file(&staged, &out_path).await {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(e.into());
        }

        Ok(TransformOutput {
            out_path: out_path.to_string_lossy().to_string(),
            out_size,
        })
    }

    async fn get_settings(&self) -> OptimizerResult<SettingsData> {
        self.settings.load().await
    }

    async fn save_settings(&self, settings: &SettingsData) -> OptimizerResult<()> {
        self.settings.save(settings).await?;
        self.notify_settings_changed();
        Ok(())
    }

    async fn reset_settings(&self) -> OptimizerResult<()> {
        self.settings.save(&SettingsData::default()).await?;
        self.notify_settings_changed();
        Ok(())
    }

    async fn reset_profile(&self, id: u32) -> OptimizerResult<()> {
        self.settings
            .update(|settings| {
                let profile = settings
                    .profile_mut(id)
                    .ok_or_else(|| OptimizerError::settings("Profile not found"))?;
                let mut fresh = ProfileData::with_id(id, profile.name.clone());
                fresh.active = profile.active;
                *profile = fresh;
                Ok(())
            })
            .await?;
        self.notify_settings_changed();
        Ok(())
    }

    async fn add_profile(&self, name: &str) -> OptimizerResult<()> {
        self.settings
            .update(|settings| {
                let name = match settings.profiles.iter().position(|p| p.name == name) {
                    Some(idx) => format!("{} ({})", name, idx + 1),
                    None => name.to_string(),
                };
                let id = settings
                    .profiles
                    .iter()
                    .map(|p| p.id)
                    .max()
                    .map_or(DEFAULT_PROFILE_ID + 1, |highest| highest + 1);
                debug!("Adding profile {} ({})", id, name);
                settings.profiles.push(ProfileData::with_id(id, name));
                Ok(())
            })
            .await?;
        self.notify_settings_changed();
        Ok(())
    }

    async fn delete_profile(&self, id: u32) -> OptimizerResult<()> {
        if id == DEFAULT_PROFILE_ID {
            return Err(OptimizerError::settings("Cannot delete default profile"));
        }
        self.settings
            .update(|settings| {
                let idx = settings
                    .profiles
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(|| OptimizerError::settings("Profile not found"))?;
                settings.profiles.remove(idx);
                Ok(())
            })
            .await?;
        self.notify_settings_changed();
        Ok(())
    }

    async fn open_settings_window(&self) -> OptimizerResult<()> {
        // Make sure there is something to open.
        self.settings.load().await?;
        let path = self.settings.path().to_string_lossy().to_string();
        info!("Opening settings at {}", path);
        open_with_system(&path, false).await
    }

    async fn open_finder_at_path(&self, path: &str) -> OptimizerResult<()> {
        open_with_system(path, true).await
    }

    async fn discover_images(&self, path: &Path, found: mpsc::Sender<String>) {
        let root = path.to_path_buf();
        let walk = tokio::task::spawn_blocking(move || {
            for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !is_supported_image(entry.path()) {
                    continue;
                }
                let path = entry.path().to_string_lossy().to_string();
                if found.blocking_send(path).is_err() {
                    // Receiver gone, nobody wants the rest.
                    break;
                }
            }
        });
        if let Err(e) = walk.await {
            warn!("Image discovery for {} failed: {}", path.display(), e);
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.events.subscribe()
    }
}

/// Opens `path` with the platform opener. With `reveal`, selects the file in
/// the file manager instead of opening it.
async fn open_with_system(path: &str, reveal: bool) -> OptimizerResult<()> {
    let mut command = if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        if reveal {
            cmd.arg("-R");
        }
        cmd.arg(path);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("explorer");
        if reveal {
            cmd.arg(format!("/select,{}", path));
        } else {
            cmd.arg(path);
        }
        cmd
    } else {
        let target = if reveal {
            Path::new(path)
                .parent()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string())
        } else {
            path.to_string()
        };
        let mut cmd = Command::new("xdg-open");
        cmd.arg(target);
        cmd
    };

    let status = command
        .status()
        .await
        .map_err(|e| OptimizerError::io(format!("Failed to launch file manager: {}", e)))?;
    if !status.success() {
        // explorer.exe exits with 1 even on success
        debug!("File manager exited with {:?}", status.code());
    }
    Ok(())
}
