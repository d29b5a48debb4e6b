//! Command handlers for a front end.
//!
//! Thin functions over [`AppState`](crate::core::AppState), one per user
//! action:
//! - [`files`]: adding, removing and revealing files
//! - [`settings`]: profiles, theme and thread count

pub mod files;
pub mod settings;

pub use files::{add_paths, clear_files, remove_file, reveal_file};
