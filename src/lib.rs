// Module declarations in dependency order
pub mod utils;
pub mod save_debouncer;
pub mod worker;
pub mod core;
pub mod service;
pub mod processing;
pub mod commands;

// Public exports for external consumers
pub use core::{AppConfig, AppState, FileEntry, FileRegistry, FileStatus, ProfileData, ProfileStore, SettingsData};
pub use processing::ProcessingPipeline;
pub use service::{LocalService, RemoteService, ServiceEvent};
pub use utils::{OptimizerError, OptimizerResult, TransformError};
pub use worker::{Capacity, ConcurrencyLimiter};

// This library file is used as a public API for consuming this crate as a library.
// The command-line entry point is in main.rs.
