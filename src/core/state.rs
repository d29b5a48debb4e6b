//! Wires the service, registry, profiles and limiter together.

use std::sync::Arc;
use tracing::{debug, info};

use crate::core::{AppConfig, FileRegistry, ProfileStore};
use crate::processing::ProcessingPipeline;
use crate::service::{LocalService, RemoteService};
use crate::utils::OptimizerResult;
use crate::worker::{Capacity, ConcurrencyLimiter};

/// Everything a front end needs to drive the application.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<dyn RemoteService>,
    profiles: Arc<ProfileStore>,
    pipeline: ProcessingPipeline,
}

impl AppState {
    /// Builds the state on top of a [`LocalService`] configured by `config`.
    pub async fn from_config(config: &AppConfig) -> OptimizerResult<Self> {
        let service = LocalService::new(&config.settings_path, config.sidecar.clone());
        Self::new(Arc::new(service), config).await
    }

    /// Loads settings from `service` and starts the background listeners.
    pub async fn new(service: Arc<dyn RemoteService>, config: &AppConfig) -> OptimizerResult<Self> {
        let profiles = ProfileStore::load(service.clone(), config.debouncer()).await?;
        profiles.spawn_sync_listener();

        let threads = config.threads.unwrap_or(profiles.settings().threads);
        let limiter = ConcurrencyLimiter::new(Capacity::from_threads(threads));
        match config.threads {
            Some(threads) => info!("Compression threads fixed at {}", threads),
            None => follow_thread_setting(&profiles, limiter.clone()),
        }

        let pipeline = ProcessingPipeline::new(
            service.clone(),
            FileRegistry::new(),
            profiles.clone(),
            limiter,
        );
        Ok(Self {
            service,
            profiles,
            pipeline,
        })
    }

    pub fn service(&self) -> &Arc<dyn RemoteService> {
        &self.service
    }

    pub fn profiles(&self) -> &Arc<ProfileStore> {
        &self.profiles
    }

    pub fn pipeline(&self) -> &ProcessingPipeline {
        &self.pipeline
    }

    pub fn registry(&self) -> &FileRegistry {
        self.pipeline.registry()
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        self.pipeline.limiter()
    }

    /// Writes pending settings edits. Call before exiting.
    pub async fn shutdown(&self) {
        self.profiles.flush().await;
        debug!("Application state flushed");
    }
}

/// Keeps the limiter's capacity in line with the `threads` setting.
fn follow_thread_setting(profiles: &ProfileStore, limiter: ConcurrencyLimiter) {
    let mut settings = profiles.subscribe();
    tokio::spawn(async move {
        while settings.changed().await.is_ok() {
            let capacity = Capacity::from_threads(settings.borrow_and_update().threads);
            if capacity != limiter.capacity() {
                debug!("Compression capacity changed to {:?}", capacity);
                limiter.set_capacity(capacity);
            }
        }
    });
}
