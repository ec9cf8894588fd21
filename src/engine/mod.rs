// src/engine/mod.rs

//! Orchestration engine.
//!
//! - [`queue`] runs per-folder work with a bounded number in flight.
//! - [`coordinator`] prepares, spawns and classifies one folder's run, and
//!   drives the whole-run aggregation with its sequential retry pass.
//! - [`cache`] memoises cache-folder resolution and recognises cache
//!   corruption in error output.
//! - [`markers`], [`link`] and [`completions`] hold the smaller per-run chores.

use std::path::PathBuf;
use std::time::Duration;

pub mod cache;
pub mod completions;
pub mod coordinator;
pub mod link;
pub mod markers;
pub mod queue;

pub use cache::{CacheDirRegistry, CacheRecovery};
pub use completions::CompletionLog;
pub use coordinator::{RunCoordinator, RunPlan};
pub use queue::run_bounded;

/// Outcome of one attempt at one folder.
///
/// - success: no code, no error
/// - process failure: non-zero `code` plus the captured stderr in `error`
/// - orchestration failure: `error` only (unreadable manifest, spawn error)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub folder: PathBuf,
    pub code: Option<i32>,
    pub error: Option<String>,
}

impl RunResult {
    pub fn success(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            code: None,
            error: None,
        }
    }

    pub fn process_failure(folder: impl Into<PathBuf>, code: i32, stderr: String) -> Self {
        Self {
            folder: folder.into(),
            code: Some(code),
            error: Some(stderr),
        }
    }

    pub fn orchestration_failure(folder: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            code: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.code.is_none_or(|c| c == 0)
    }
}

/// Everything one `run_all` produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Every attempt, first pass then retries, each group in completion order.
    pub attempts: Vec<RunResult>,
    /// Folders still failing after the sequential retry.
    pub failures: Vec<RunResult>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_folders(&self) -> Vec<PathBuf> {
        self.failures.iter().map(|r| r.folder.clone()).collect()
    }

    /// How many attempts were made for `folder`.
    pub fn attempts_for(&self, folder: &std::path::Path) -> usize {
        self.attempts.iter().filter(|r| r.folder == folder).count()
    }
}
