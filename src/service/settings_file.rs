//! JSON key/value settings store.
//!
//! The file holds a single object; settings live under the `"settings"` key so
//! other keys written by older versions survive a save.

use std::path::{Path, PathBuf};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::SettingsData;
use crate::utils::{OptimizerError, OptimizerResult};

const SETTINGS_KEY: &str = "settings";

pub struct SettingsFile {
    path: PathBuf,
    // Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings. A missing entry is initialised with the defaults; an
    /// unreadable one yields the defaults without touching the file.
    pub async fn load(&self) -> OptimizerResult<SettingsData> {
        let _guard = self.lock.lock().await;
        self.load_unlocked().await
    }

    pub async fn save(&self, settings: &SettingsData) -> OptimizerResult<()> {
        let _guard = self.lock.lock().await;
        self.save_unlocked(settings).await
    }

    /// Loads, applies `f` and saves, all under one lock.
    pub async fn update<F, T>(&self, f: F) -> OptimizerResult<T>
    where
        F: FnOnce(&mut SettingsData) -> OptimizerResult<T>,
    {
        let _guard = self.lock.lock().await;
        let mut settings = self.load_unlocked().await?;
        let out = f(&mut settings)?;
        self.save_unlocked(&settings).await?;
        Ok(out)
    }

    async fn load_unlocked(&self) -> OptimizerResult<SettingsData> {
        let store = self.read_store().await?;
        let Some(value) = store.get(SETTINGS_KEY) else {
            debug!("No stored settings in {}, writing defaults", self.path.display());
            let defaults = SettingsData::default();
            self.save_unlocked(&defaults).await?;
            return Ok(defaults);
        };

        match serde_json::from_value(value.clone()) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("Stored settings are invalid ({}), using defaults", e);
                Ok(SettingsData::default())
            }
        }
    }

    async fn save_unlocked(&self, settings: &SettingsData) -> OptimizerResult<()> {
        let mut store = self.read_store().await.unwrap_or_default();
        store.insert(SETTINGS_KEY.to_string(), json!(settings));
        let body = serde_json::to_vec_pretty(&Value::Object(store))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| OptimizerError::settings(format!("Failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| OptimizerError::settings(format!("Failed to replace {}: {}", self.path.display(), e)))?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    async fn read_store(&self) -> OptimizerResult<Map<String, Value>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(OptimizerError::settings(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!("{} is not a settings store, starting fresh", self.path.display());
                Ok(Map::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_initialised_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("settings.json"));
        let settings = file.load().await.unwrap();
        assert_eq!(settings, SettingsData::default());
        assert!(file.path().exists());
    }

    #[tokio::test]
    async fn invalid_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"settings": {"version": "nope"}, "window": 3}"#).unwrap();
        let file = SettingsFile::new(&path);
        assert_eq!(file.load().await.unwrap(), SettingsData::default());

        // Saving keeps unrelated keys
        file.save(&SettingsData::default()).await.unwrap();
        let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["window"], 3);
    }

    #[tokio::test]
    async fn update_persists_changes() {
        let dir = tempfile::tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("nested/settings.json"));
        file.update(|s| {
            s.threads = 3;
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(file.load().await.unwrap().threads, 3);
    }
}
