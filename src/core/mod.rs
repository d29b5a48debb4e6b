//! Core application types and state management.
//!
//! - [`FileRegistry`]: the observable list of files and their progress
//! - [`ProfileStore`]: compression profiles with debounced persistence
//! - [`AppState`]: everything wired together
//! - [`FileEntry`], [`SettingsData`], [`ProfileData`]: the data model

mod config;
mod profiles;
mod registry;
mod settings;
mod state;
mod types;

pub use config::AppConfig;
pub use profiles::ProfileStore;
pub use registry::{FileRegistry, RegistryEvent, RegistrySummary};
pub use settings::{DEFAULT_PROFILE_ID, ProfileData, ProfileUpdate, SettingsData, ThemeKind};
pub use state::AppState;
pub use types::{EntryId, FileEntry, FileInfo, FileStatus, FileUpdate, TransformOutput};
