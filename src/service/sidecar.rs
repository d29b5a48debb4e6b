//! Runs the external optimizer for a single image.
//!
//! The optimizer is invoked as
//! `<program> [args..] optimize <input> <output> <settings-json>` and must
//! write the compressed image to `<output>`. It may print a JSON result on
//! stdout; when it doesn't, the output size is read from disk.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::core::ProfileData;
use crate::utils::{ImageType, TransformError, get_file_size};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarConfig {
    /// Optimizer executable
    pub program: PathBuf,
    /// Arguments placed before the `optimize` subcommand
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("image-optimizer-sidecar"),
            args: Vec::new(),
        }
    }
}

/// Settings passed to the optimizer as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarSettings {
    pub quality: u32,
    pub resize: Option<ResizeBounds>,
    pub output_format: String,
}

/// Box the image must fit in; the optimizer keeps the aspect ratio and never
/// upscales.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResizeBounds {
    pub width: u32,
    pub height: u32,
}

impl SidecarSettings {
    pub fn from_profile(profile: &ProfileData, format: ImageType) -> Self {
        Self {
            quality: profile.quality_for(format),
            resize: profile.should_resize.then(|| ResizeBounds {
                width: profile.resize_width,
                height: profile.resize_height,
            }),
            output_format: format.primary_extension().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SidecarResult {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(alias = "optimized_size")]
    optimized_size: Option<u64>,
    error: Option<String>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct SidecarTransformer {
    config: SidecarConfig,
}

impl SidecarTransformer {
    pub fn new(config: SidecarConfig) -> Self {
        Self { config }
    }

    /// Compresses `input` into `output` and returns the output size.
    pub async fn run(
        &self,
        input: &Path,
        output: &Path,
        settings: &SidecarSettings,
    ) -> Result<u64, TransformError> {
        let settings_json = serde_json::to_string(settings)
            .map_err(|e| TransformError::generic(format!("Failed to serialize settings: {}", e)))?;

        debug!("Invoking optimizer for: {}", input.display());
        let output_result = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg("optimize")
            .arg(input)
            .arg(output)
            .arg(&settings_json)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TransformError::generic(format!(
                    "Failed to run optimizer {}: {}",
                    self.config.program.display(),
                    e
                ))
            })?;

        if !output_result.status.success() {
            let stderr = String::from_utf8_lossy(&output_result.stderr);
            return Err(TransformError::generic(format!(
                "Optimizer failed for {}: {}",
                input.display(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output_result.stdout);
        let reported = match serde_json::from_str::<SidecarResult>(stdout.trim()) {
            Ok(result) if !result.success => {
                return Err(TransformError::generic(
                    result.error.unwrap_or_else(|| "Unknown optimizer error".to_string()),
                ));
            }
            Ok(result) => result.optimized_size,
            Err(_) => None,
        };

        match reported {
            Some(size) => Ok(size),
            None => get_file_size(output)
                .await
                .map_err(|e| TransformError::generic(format!("Optimizer produced no output: {}", e))),
        }
    }
}
