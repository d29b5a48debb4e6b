//! Startup configuration.

use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::save_debouncer::DebouncerConfig;
use crate::service::SidecarConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// JSON file holding the settings store
    pub settings_path: PathBuf,
    /// Quiet period before profile edits are written, in milliseconds
    pub save_debounce_ms: u64,
    pub sidecar: SidecarConfig,
    /// Fixed number of parallel compressions. When unset the `threads`
    /// setting applies and is followed as it changes.
    pub threads: Option<u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("settings.json"),
            save_debounce_ms: 500,
            sidecar: SidecarConfig::default(),
            threads: None,
        }
    }
}

impl AppConfig {
    pub fn debouncer(&self) -> DebouncerConfig {
        DebouncerConfig {
            window: Duration::from_millis(self.save_debounce_ms),
        }
    }
}
