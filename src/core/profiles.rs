//! Compression profiles and the active-profile selection.
//!
//! Local state is authoritative for reads and changes are visible to
//! subscribers immediately. Profile edits reach the service through the
//! [`SaveDebouncer`]; structural changes (create, delete, reset) go to the
//! service first and are then reloaded from it.
//!
//! A "settings changed" notification only reloads while no local edit is
//! waiting to be written. The store's own saves trigger the same
//! notification, and reloading then could replace newer local edits with
//! what was stored a moment earlier.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::{DEFAULT_PROFILE_ID, ProfileData, ProfileUpdate, SettingsData, ThemeKind};
use crate::save_debouncer::{DebouncerConfig, SaveDebouncer};
use crate::service::{RemoteService, ServiceEvent};
use crate::utils::{OptimizerError, OptimizerResult};

pub struct ProfileStore {
    service: Arc<dyn RemoteService>,
    settings: watch::Sender<SettingsData>,
    saver: SaveDebouncer,
    // Bumped by every local edit, inside the watch's write lock
    revision: AtomicU64,
}

impl ProfileStore {
    /// Loads settings from the service. Fails if they cannot be read; nothing
    /// works without them.
    pub async fn load(service: Arc<dyn RemoteService>, debounce: DebouncerConfig) -> OptimizerResult<Arc<Self>> {
        let settings = service
            .get_settings()
            .await
            .map_err(|e| OptimizerError::settings(format!("Failed to load settings: {}", e)))?;
        info!("Loaded {} profile(s)", settings.profiles.len());

        let (tx, rx) = watch::channel(settings);
        let saver = SaveDebouncer::start(debounce, {
            let service = service.clone();
            move || {
                let service = service.clone();
                let snapshot = rx.borrow().clone();
                async move { service.save_settings(&snapshot).await }
            }
        });

        Ok(Arc::new(Self {
            service,
            settings: tx,
            saver,
            revision: AtomicU64::new(0),
        }))
    }

    /// Current settings.
    pub fn settings(&self) -> SettingsData {
        self.settings.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SettingsData> {
        self.settings.subscribe()
    }

    pub fn profiles(&self) -> Vec<ProfileData> {
        self.settings.borrow().profiles.clone()
    }

    pub fn profile(&self, id: u32) -> Option<ProfileData> {
        self.settings.borrow().profile(id).cloned()
    }

    /// The profile flagged active, else profile 0, else the built-in defaults.
    pub fn active_profile(&self) -> ProfileData {
        self.settings
            .borrow()
            .active_profile()
            .cloned()
            .unwrap_or_default()
    }

    /// Applies a local edit and notes that it happened.
    fn edit(&self, f: impl FnOnce(&mut SettingsData) -> bool) -> bool {
        self.settings.send_if_modified(|settings| {
            let changed = f(settings);
            if changed {
                self.revision.fetch_add(1, Ordering::SeqCst);
            }
            changed
        })
    }

    /// Merges `update` into profile `id`. Unknown ids are ignored.
    pub fn update_profile(&self, id: u32, update: &ProfileUpdate) {
        let changed = self.edit(|settings| match settings.profile_mut(id) {
            Some(profile) => {
                profile.apply(update);
                true
            }
            None => false,
        });
        if changed {
            debug!("Updated profile {}", id);
            self.saver.touch();
        } else {
            debug!("Ignoring update for unknown profile {}", id);
        }
    }

    /// Makes `id` the only active profile, or profile 0 if `id` is unknown.
    pub fn set_active_profile(&self, id: u32) {
        let mut active = DEFAULT_PROFILE_ID;
        let changed = self.edit(|settings| {
            let before: Vec<bool> = settings.profiles.iter().map(|p| p.active).collect();
            active = settings.activate(id);
            settings.profiles.iter().map(|p| p.active).ne(before)
        });
        if active != id {
            debug!("Profile {} not found, activated default profile", id);
        }
        if changed {
            self.saver.touch();
        }
    }

    pub fn set_threads(&self, threads: u32) {
        let changed = self.edit(|settings| {
            let changed = settings.threads != threads;
            settings.threads = threads;
            changed
        });
        if changed {
            self.saver.touch();
        }
    }

    /// Changes the theme and saves right away.
    pub async fn set_theme(&self, theme: ThemeKind) -> OptimizerResult<()> {
        self.edit(|settings| {
            settings.theme = theme;
            true
        });
        let snapshot = self.settings();
        self.service.save_settings(&snapshot).await
    }

    pub async fn create_profile(&self, name: &str) -> OptimizerResult<()> {
        self.saver.flush().await;
        self.service.add_profile(name).await?;
        self.resync().await
    }

    /// Deletes profile `id`. If it was the active one, profile 0 takes over.
    pub async fn delete_profile(&self, id: u32) -> OptimizerResult<()> {
        self.saver.flush().await;
        self.service.delete_profile(id).await?;
        self.resync().await?;
        if !self.settings.borrow().profiles.iter().any(|p| p.active) {
            self.set_active_profile(DEFAULT_PROFILE_ID);
        }
        Ok(())
    }

    pub async fn reset_profile(&self, id: u32) -> OptimizerResult<()> {
        self.saver.flush().await;
        self.service.reset_profile(id).await?;
        self.resync().await
    }

    pub async fn reset_settings(&self) -> OptimizerResult<()> {
        self.saver.flush().await;
        self.service.reset_settings().await?;
        self.resync().await
    }

    /// Replaces local state with what the service has stored.
    pub async fn resync(&self) -> OptimizerResult<()> {
        let settings = self.service.get_settings().await?;
        debug!("Resynchronised {} profile(s)", settings.profiles.len());
        self.settings.send_replace(settings);
        Ok(())
    }

    /// Reloads after a change notification unless local edits are pending or
    /// were made while the reload was under way. Those edits are written
    /// later and win.
    async fn refresh(&self) -> OptimizerResult<()> {
        if self.saver.is_pending() {
            debug!("Local edits pending, not reloading settings");
            return Ok(());
        }
        let revision = self.revision.load(Ordering::SeqCst);
        let stored = self.service.get_settings().await?;

        let replaced = self.settings.send_if_modified(|settings| {
            if self.revision.load(Ordering::SeqCst) != revision || self.saver.is_pending() {
                return false;
            }
            if *settings == stored {
                return false;
            }
            *settings = stored;
            true
        });
        if replaced {
            debug!("Reloaded settings after external change");
        }
        Ok(())
    }

    /// Writes a pending debounced save immediately.
    pub async fn flush(&self) {
        self.saver.flush().await;
    }

    /// Resynchronises whenever the service reports changed settings. Runs
    /// until the service's event channel closes or the store is dropped.
    pub fn spawn_sync_listener(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let mut events = self.service.subscribe();
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ServiceEvent::SettingsChanged) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Missed {} settings notifications", skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
                let Some(store) = store.upgrade() else {
                    break;
                };
                if let Err(e) = store.refresh().await {
                    warn!("Failed to resynchronise settings: {}", e);
                }
            }
        })
    }
}
