// src/engine/markers.rs

//! Lock marker files written around a run.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

use crate::fs::FileSystem;

/// A marker file that exists while some work is in progress.
///
/// Removal is explicit ([`LockMarker::release`]) rather than on drop: a
/// fail-fast exit deliberately leaves the marker behind.
#[derive(Debug)]
pub struct LockMarker {
    path: PathBuf,
}

impl LockMarker {
    /// Write `<dir>/<name>` containing our process id.
    pub fn acquire(fs: &dyn FileSystem, dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(name);
        fs.write(&path, std::process::id().to_string().as_bytes())?;
        debug!(?path, "lock marker written");
        Ok(Self { path })
    }

    /// Remove the marker; failures are logged, not returned.
    pub fn release(self, fs: &dyn FileSystem) {
        match fs.remove_file(&self.path) {
            Ok(()) => debug!(path = ?self.path, "lock marker removed"),
            Err(e) => warn!(path = ?self.path, error = %e, "failed to remove lock marker"),
        }
    }
}
