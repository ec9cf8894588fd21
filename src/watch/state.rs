// src/watch/state.rs

//! Pure watch-mode bookkeeping.
//!
//! [`WatchState`] decides what a file event means; it does no IO and knows
//! nothing about notify, channels or processes. The async shell in
//! [`runner`](super::runner) feeds it hashes and timestamps.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Events this soon after a folder's run finished are treated as caused by
/// that run.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFile {
    pub folder: PathBuf,
    pub hash: String,
}

/// What a single file event turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Not a file we track.
    Untracked,
    /// The file can no longer be read; it was dropped from tracking.
    Removed { folder: PathBuf },
    /// Echo of the folder's own recent run; hash refreshed silently.
    Echo { folder: PathBuf },
    /// Content-only mode and the content did not change.
    Unchanged { folder: PathBuf },
    /// The folder is queued for the next cycle.
    Changed { folder: PathBuf },
}

#[derive(Debug)]
pub struct WatchState {
    files: HashMap<PathBuf, WatchedFile>,
    changed: BTreeSet<PathBuf>,
    content_only: bool,
    debounce: Duration,
}

impl WatchState {
    pub fn new(content_only: bool) -> Self {
        Self {
            files: HashMap::new(),
            changed: BTreeSet::new(),
            content_only,
            debounce: DEBOUNCE_WINDOW,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn is_watched(&self, file: &Path) -> bool {
        self.files.contains_key(file)
    }

    pub fn watched_count(&self) -> usize {
        self.files.len()
    }

    pub fn folder_of(&self, file: &Path) -> Option<&Path> {
        self.files.get(file).map(|w| w.folder.as_path())
    }

    pub fn hash_of(&self, file: &Path) -> Option<&str> {
        self.files.get(file).map(|w| w.hash.as_str())
    }

    /// Start tracking `file`. Returns `true` when its hash differs from the
    /// persisted baseline (or there is none), which queues the folder.
    pub fn register(
        &mut self,
        folder: PathBuf,
        file: PathBuf,
        hash: String,
        cached: Option<&str>,
    ) -> bool {
        let stale = cached != Some(hash.as_str());
        if stale {
            self.changed.insert(folder.clone());
        }
        self.files.insert(file, WatchedFile { folder, hash });
        stale
    }

    /// Classify an event for `file`.
    ///
    /// `new_hash` is `None` when the file could not be read. `last_run` is
    /// when the file's folder last finished a run.
    pub fn on_change(
        &mut self,
        file: &Path,
        new_hash: Option<String>,
        last_run: Option<Instant>,
        now: Instant,
    ) -> ChangeOutcome {
        let Some(entry) = self.files.get_mut(file) else {
            return ChangeOutcome::Untracked;
        };
        let folder = entry.folder.clone();

        let Some(new_hash) = new_hash else {
            self.files.remove(file);
            return ChangeOutcome::Removed { folder };
        };

        if last_run.is_some_and(|t| now.saturating_duration_since(t) < self.debounce) {
            entry.hash = new_hash;
            return ChangeOutcome::Echo { folder };
        }

        if self.content_only && entry.hash == new_hash {
            return ChangeOutcome::Unchanged { folder };
        }

        entry.hash = new_hash;
        self.changed.insert(folder.clone());
        ChangeOutcome::Changed { folder }
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PathBuf> {
        self.changed.iter()
    }

    /// Drain the changed-folder set. Events arriving afterwards start a new
    /// set for the next cycle.
    pub fn take_changed(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.changed).into_iter().collect()
    }

    /// Watched files belonging to `folder`.
    pub fn files_of(&self, folder: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|(_, w)| w.folder == folder)
            .map(|(f, _)| f.clone())
            .collect();
        files.sort();
        files
    }
}
