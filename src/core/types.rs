//! Per-file entry types tracked by the registry and exchanged with the service.

use serde::{Deserialize, Serialize};

/// Where a file is in its processing workflow.
///
/// `Processing` and `Compressing` are transient; the other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    Processing,
    Compressing,
    Complete,
    AlreadySmaller,
    Error,
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::AlreadySmaller | Self::Error)
    }

    /// Whether a workflow may move an entry from `self` to `next`.
    pub fn can_transition_to(&self, next: FileStatus) -> bool {
        use FileStatus::*;
        match (self, next) {
            (a, b) if *a == b => true,
            (Processing, Compressing | Error) => true,
            (Compressing, Complete | AlreadySmaller | Error) => true,
            _ => false,
        }
    }
}

/// A path tracked through inspection and compression.
///
/// Stored by value in the registry: every change produces a new entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Absolute path, the identity of the entry
    pub path: String,
    /// Display name, empty until inspected
    pub file: String,
    /// Lowercase extension, empty until inspected
    pub ext: String,
    pub status: FileStatus,
    /// Size in bytes before compression
    pub original_size: Option<u64>,
    /// Size in bytes after compression
    pub size: Option<u64>,
    /// Percentage saved relative to `original_size`
    pub savings: Option<f64>,
    pub error: Option<String>,
    /// Where the compressed file was written
    pub out_path: Option<String>,
    /// Distinguishes an entry from earlier ones registered under the same path
    #[serde(skip)]
    pub(crate) generation: u64,
}

/// Identity of a registered entry: its path plus the registration it
/// belongs to. Updates through a stale id are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId {
    pub path: String,
    generation: u64,
}

impl FileEntry {
    /// Fresh entry for a newly ingested path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file: String::new(),
            ext: String::new(),
            status: FileStatus::Processing,
            original_size: None,
            size: None,
            savings: None,
            error: None,
            out_path: None,
            generation: 0,
        }
    }

    pub fn id(&self) -> EntryId {
        EntryId {
            path: self.path.clone(),
            generation: self.generation,
        }
    }

    pub(crate) fn is(&self, id: &EntryId) -> bool {
        self.path == id.path && self.generation == id.generation
    }

    /// Returns a copy of this entry with every field set in `update` replaced.
    pub fn merged(&self, update: &FileUpdate) -> Self {
        let mut next = self.clone();
        if let Some(file) = &update.file {
            next.file = file.clone();
        }
        if let Some(ext) = &update.ext {
            next.ext = ext.clone();
        }
        if let Some(status) = update.status {
            next.status = status;
        }
        if update.original_size.is_some() {
            next.original_size = update.original_size;
        }
        if update.size.is_some() {
            next.size = update.size;
        }
        if update.savings.is_some() {
            next.savings = update.savings;
        }
        if let Some(error) = &update.error {
            next.error = Some(error.clone());
        }
        if let Some(out_path) = &update.out_path {
            next.out_path = Some(out_path.clone());
        }
        next
    }
}

/// Partial update for a [`FileEntry`]. Unset fields keep their previous value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileUpdate {
    pub file: Option<String>,
    pub ext: Option<String>,
    pub status: Option<FileStatus>,
    pub original_size: Option<u64>,
    pub size: Option<u64>,
    pub savings: Option<f64>,
    pub error: Option<String>,
    pub out_path: Option<String>,
}

impl FileUpdate {
    pub fn status(status: FileStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    /// Terminal failure with a message.
    pub fn failed(status: FileStatus, error: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Result of inspecting a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub extension: String,
    pub size: u64,
}

impl From<FileInfo> for FileUpdate {
    fn from(info: FileInfo) -> Self {
        Self {
            file: Some(info.filename),
            ext: Some(info.extension.to_lowercase()),
            original_size: Some(info.size),
            ..Default::default()
        }
    }
}

/// Result of a successful compression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    pub out_path: String,
    pub out_size: u64,
}
