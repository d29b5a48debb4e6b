#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Semaphore, broadcast, mpsc};

use image_dropper_lib::core::{
    AppConfig, AppState, FileEntry, FileInfo, FileRegistry, FileStatus, ProfileData,
    SettingsData, TransformOutput,
};
use image_dropper_lib::service::{RemoteService, ServiceEvent};
use image_dropper_lib::utils::{OptimizerError, OptimizerResult, TransformError};

/// In-memory service. Files must be registered with [`MockService::with_file`]
/// to pass inspection; transforms halve the file unless told otherwise.
pub struct MockService {
    settings: Mutex<SettingsData>,
    saves: Mutex<Vec<SettingsData>>,
    files: Mutex<HashMap<String, u64>>,
    outcomes: Mutex<HashMap<String, Result<u64, TransformError>>>,
    dispatched: Mutex<Vec<(String, u32)>>,
    gate: Option<Semaphore>,
    running: AtomicUsize,
    peak: AtomicUsize,
    read_delay: Option<Duration>,
    echo_saves: bool,
    events: broadcast::Sender<ServiceEvent>,
}

impl MockService {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Transforms block until released with [`MockService::release`].
    pub fn gated() -> Self {
        Self::build(Some(Semaphore::new(0)))
    }

    fn build(gate: Option<Semaphore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            settings: Mutex::new(SettingsData::default()),
            saves: Mutex::new(Vec::new()),
            files: Mutex::new(HashMap::new()),
            outcomes: Mutex::new(HashMap::new()),
            dispatched: Mutex::new(Vec::new()),
            gate,
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            read_delay: None,
            echo_saves: false,
            events,
        }
    }

    pub fn with_settings(self, settings: SettingsData) -> Self {
        *self.settings.lock().unwrap() = settings;
        self
    }

    /// `get_settings` answers with what was stored when it was called, but
    /// only after `delay`.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Every save is announced as a settings change, like the local service does.
    pub fn echoing_saves(mut self) -> Self {
        self.echo_saves = true;
        self
    }

    pub fn stored(&self) -> SettingsData {
        self.settings.lock().unwrap().clone()
    }

    pub fn with_file(self, path: &str, size: u64) -> Self {
        self.files.lock().unwrap().insert(path.to_string(), size);
        self
    }

    pub fn with_outcome(self, path: &str, outcome: Result<u64, TransformError>) -> Self {
        self.outcomes.lock().unwrap().insert(path.to_string(), outcome);
        self
    }

    pub fn add_file(&self, path: &str, size: u64) {
        self.files.lock().unwrap().insert(path.to_string(), size);
    }

    /// Lets `n` blocked transforms finish.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// `(path, profile id)` for every transform, in dispatch order.
    pub fn dispatched(&self) -> Vec<(String, u32)> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn dispatched_paths(&self) -> Vec<String> {
        self.dispatched().into_iter().map(|(path, _)| path).collect()
    }

    pub fn saves(&self) -> Vec<SettingsData> {
        self.saves.lock().unwrap().clone()
    }

    /// Changes the stored settings behind the client's back and says so.
    pub fn replace_settings(&self, settings: SettingsData) {
        *self.settings.lock().unwrap() = settings;
        let _ = self.events.send(ServiceEvent::SettingsChanged);
    }
}

#[async_trait]
impl RemoteService for MockService {
    async fn inspect(&self, path: &str) -> OptimizerResult<FileInfo> {
        let size = self
            .files
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .ok_or_else(|| OptimizerError::io(format!("File does not exist: {}", path)))?;
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = Path::new(path)
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(FileInfo {
            filename: name,
            extension,
            size,
        })
    }

    async fn transform(
        &self,
        profile: &ProfileData,
        entry: &FileEntry,
    ) -> Result<TransformOutput, TransformError> {
        self.dispatched.lock().unwrap().push((entry.path.clone(), profile.id));
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        let outcome = self.outcomes.lock().unwrap().get(&entry.path).cloned();
        let out_size = match outcome {
            Some(outcome) => outcome?,
            None => entry.original_size.unwrap_or_default() / 2,
        };
        Ok(TransformOutput {
            out_path: format!("{}.min", entry.path),
            out_size,
        })
    }

    async fn get_settings(&self) -> OptimizerResult<SettingsData> {
        let stored = self.stored();
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(stored)
    }

    async fn save_settings(&self, settings: &SettingsData) -> OptimizerResult<()> {
        *self.settings.lock().unwrap() = settings.clone();
        self.saves.lock().unwrap().push(settings.clone());
        if self.echo_saves {
            let _ = self.events.send(ServiceEvent::SettingsChanged);
        }
        Ok(())
    }

    async fn reset_settings(&self) -> OptimizerResult<()> {
        *self.settings.lock().unwrap() = SettingsData::default();
        if self.echo_saves {
            let _ = self.events.send(ServiceEvent::SettingsChanged);
        }
        Ok(())
    }

    async fn reset_profile(&self, id: u32) -> OptimizerResult<()> {
        let mut settings = self.settings.lock().unwrap();
        let profile = settings
            .profile_mut(id)
            .ok_or_else(|| OptimizerError::settings("Profile not found"))?;
        let mut fresh = ProfileData::with_id(id, profile.name.clone());
        fresh.active = profile.active;
        *profile = fresh;
        Ok(())
    }

    async fn add_profile(&self, name: &str) -> OptimizerResult<()> {
        let mut settings = self.settings.lock().unwrap();
        let id = settings.profiles.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        settings.profiles.push(ProfileData::with_id(id, name));
        Ok(())
    }

    async fn delete_profile(&self, id: u32) -> OptimizerResult<()> {
        let mut settings = self.settings.lock().unwrap();
        let before = settings.profiles.len();
        settings.profiles.retain(|p| p.id != id);
        if settings.profiles.len() == before {
            return Err(OptimizerError::settings("Profile not found"));
        }
        Ok(())
    }

    async fn open_settings_window(&self) -> OptimizerResult<()> {
        Ok(())
    }

    async fn open_finder_at_path(&self, _path: &str) -> OptimizerResult<()> {
        Ok(())
    }

    async fn discover_images(&self, path: &Path, found: mpsc::Sender<String>) {
        let prefix = path.to_string_lossy().to_string();
        let mut matches: Vec<String> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|p| p.starts_with(&prefix))
            .cloned()
            .collect();
        matches.sort();
        for path in matches {
            if found.send(path).await.is_err() {
                break;
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.events.subscribe()
    }
}

pub async fn app_state(service: Arc<MockService>, threads: Option<u32>) -> AppState {
    let config = AppConfig {
        threads,
        ..AppConfig::default()
    };
    AppState::new(service, &config).await.unwrap()
}

/// Polls `condition` until it holds, failing the test after a while.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached in time");
}

pub async fn wait_for_status(registry: &FileRegistry, path: &str, status: FileStatus) {
    eventually(|| registry.get(path).is_some_and(|e| e.status == status)).await;
}

pub fn two_profiles() -> SettingsData {
    let mut settings = SettingsData::default();
    settings.profiles.push(ProfileData::with_id(1, "Web"));
    settings
}
