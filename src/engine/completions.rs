// src/engine/completions.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// When each folder's most recent run finished, successful or not.
///
/// The watch loop reads this to recognise file events caused by the run
/// itself. Cloning shares the underlying log.
#[derive(Debug, Clone, Default)]
pub struct CompletionLog {
    inner: Arc<Mutex<HashMap<PathBuf, Instant>>>,
}

impl CompletionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, folder: &Path) {
        self.record_at(folder, Instant::now());
    }

    pub fn record_at(&self, folder: &Path, at: Instant) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(folder.to_path_buf(), at);
    }

    pub fn last(&self, folder: &Path) -> Option<Instant> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(folder)
            .copied()
    }
}
