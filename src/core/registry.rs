//! Observable collection of file entries.
//!
//! The registry is the single source of truth for the file list. Observers
//! either follow the latest snapshot through [`FileRegistry::subscribe`] or
//! receive every individual change through [`FileRegistry::events`]. Both are
//! updated before the mutating call returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::core::{EntryId, FileEntry, FileStatus, FileUpdate};

const EVENT_CAPACITY: usize = 1024;

/// A single change to the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    Added(FileEntry),
    Updated(FileEntry),
    Removed(String),
    Cleared,
}

/// Counts per status and the total bytes saved by completed entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySummary {
    pub total: usize,
    pub processing: usize,
    pub compressing: usize,
    pub complete: usize,
    pub already_smaller: usize,
    pub error: usize,
    pub bytes_saved: u64,
}

impl RegistrySummary {
    /// True once no entry is still moving through the pipeline.
    pub fn is_settled(&self) -> bool {
        self.processing == 0 && self.compressing == 0
    }
}

#[derive(Clone)]
pub struct FileRegistry {
    files: Arc<watch::Sender<Vec<FileEntry>>>,
    events: broadcast::Sender<RegistryEvent>,
    generations: Arc<AtomicU64>,
}

impl Default for FileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FileRegistry {
    pub fn new() -> Self {
        let (files, _) = watch::channel(Vec::new());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            files: Arc::new(files),
            events,
            generations: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Inserts a `Processing` entry for `path` unless one already exists.
    ///
    /// Returns the id of the new entry, or `None` for a duplicate.
    pub fn add_file(&self, path: &str) -> Option<EntryId> {
        let mut added = None;
        self.files.send_if_modified(|files| {
            if files.iter().any(|f| f.path == path) {
                return false;
            }
            let mut entry = FileEntry::new(path);
            entry.generation = self.generations.fetch_add(1, Ordering::Relaxed);
            files.push(entry.clone());
            added = Some(entry);
            true
        });

        match added {
            Some(entry) => {
                debug!("Registered {}", path);
                let id = entry.id();
                let _ = self.events.send(RegistryEvent::Added(entry));
                Some(id)
            }
            None => {
                debug!("Ignoring duplicate {}", path);
                None
            }
        }
    }

    /// Replaces the entry `id` with `update` merged over it.
    ///
    /// Returns the new entry, or `None` if that entry is no longer registered
    /// (for example after [`clear_files`](Self::clear_files)), even when the
    /// same path has been added again since.
    pub fn update_file(&self, id: &EntryId, update: FileUpdate) -> Option<FileEntry> {
        let mut updated = None;
        self.files.send_if_modified(|files| {
            let Some(slot) = files.iter_mut().find(|f| f.is(id)) else {
                return false;
            };
            let next = slot.merged(&update);
            *slot = next.clone();
            updated = Some(next);
            true
        });

        if let Some(entry) = &updated {
            let _ = self.events.send(RegistryEvent::Updated(entry.clone()));
        }
        updated
    }

    pub fn remove_file(&self, path: &str) -> Option<FileEntry> {
        let mut removed = None;
        self.files.send_if_modified(|files| {
            let Some(index) = files.iter().position(|f| f.path == path) else {
                return false;
            };
            removed = Some(files.remove(index));
            true
        });

        if removed.is_some() {
            debug!("Removed {}", path);
            let _ = self.events.send(RegistryEvent::Removed(path.to_string()));
        }
        removed
    }

    pub fn clear_files(&self) {
        self.files.send_modify(|files| files.clear());
        debug!("Cleared file list");
        let _ = self.events.send(RegistryEvent::Cleared);
    }

    pub fn get(&self, path: &str) -> Option<FileEntry> {
        self.files.borrow().iter().find(|f| f.path == path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.borrow().iter().any(|f| f.path == path)
    }

    /// Whether the entry `id` is still registered.
    pub fn is_live(&self, id: &EntryId) -> bool {
        self.files.borrow().iter().any(|f| f.is(id))
    }

    /// Entries in insertion order.
    pub fn snapshot(&self) -> Vec<FileEntry> {
        self.files.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.files.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.borrow().is_empty()
    }

    pub fn summary(&self) -> RegistrySummary {
        let files = self.files.borrow();
        let mut summary = RegistrySummary {
            total: files.len(),
            ..Default::default()
        };
        for entry in files.iter() {
            match entry.status {
                FileStatus::Processing => summary.processing += 1,
                FileStatus::Compressing => summary.compressing += 1,
                FileStatus::Complete => {
                    summary.complete += 1;
                    if let (Some(original), Some(size)) = (entry.original_size, entry.size) {
                        summary.bytes_saved += original.saturating_sub(size);
                    }
                }
                FileStatus::AlreadySmaller => summary.already_smaller += 1,
                FileStatus::Error => summary.error += 1,
            }
        }
        summary
    }

    /// Latest snapshot of the file list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<FileEntry>> {
        self.files.subscribe()
    }

    /// Every change, in the order it was applied.
    pub fn events(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Waits until every registered entry has reached a terminal status.
    pub async fn settled(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx
            .wait_for(|files| files.iter().all(|f| f.status.is_terminal()))
            .await;
    }
}
