// src/discover/resolver.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::RunConfiguration;
use crate::discover::workspaces::WorkspaceMatcher;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::manifest::{read_manifest, MANIFEST_FILE};
use crate::types::PackageManager;

/// Discovers the project folders a run should process.
///
/// Paths in the result are relative to the configured working root, with the
/// root itself represented as `.`.
#[derive(Debug)]
pub struct FolderResolver {
    fs: Arc<dyn FileSystem>,
    config: Arc<RunConfiguration>,
    invocations: usize,
}

impl FolderResolver {
    pub fn new(fs: Arc<dyn FileSystem>, config: Arc<RunConfiguration>) -> Self {
        Self {
            fs,
            config,
            invocations: 0,
        }
    }

    /// Produce the ordered, deduplicated folder list.
    ///
    /// In workspace-only mode the first call returns just `.`: installing the
    /// root resolves every workspace. Later calls (watch rescans) return the
    /// root plus every folder matching the root manifest's `workspaces`.
    pub fn resolve(&mut self) -> Result<Vec<PathBuf>> {
        let first = self.invocations == 0;
        self.invocations += 1;

        let mut folders = if self.config.only_workspaces {
            if first {
                vec![PathBuf::from(".")]
            } else {
                self.workspace_folders()
            }
        } else if self.config.here {
            self.config
                .folders
                .iter()
                .filter(|f| !is_excluded(f, &self.config.exclude_folders))
                .cloned()
                .collect()
        } else {
            let require_lock = self.config.manager != PackageManager::Npm;
            self.scan(require_lock)
        };

        sort_folders(&mut folders);
        dedup_in_order(&mut folders);

        for include in &self.config.include_folders {
            if !folders.contains(include) {
                folders.push(include.clone());
            }
        }

        info!(count = folders.len(), "resolved project folders");
        debug!(?folders, "folder list");
        Ok(folders)
    }

    fn workspace_folders(&self) -> Vec<PathBuf> {
        let root = PathBuf::from(".");
        let manifest = match read_manifest(self.fs.as_ref(), &self.config.cwd) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "cannot read root manifest; using root folder only");
                return vec![root];
            }
        };

        let patterns = manifest
            .workspaces
            .as_ref()
            .map(|w| w.patterns().to_vec())
            .unwrap_or_default();

        let matcher = match WorkspaceMatcher::new(&patterns) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "invalid workspaces declaration; using root folder only");
                return vec![root];
            }
        };

        let mut folders: Vec<PathBuf> = self
            .scan(false)
            .into_iter()
            .filter(|f| matcher.matches(f))
            .collect();
        folders.insert(0, root);
        folders
    }

    /// Walk every configured root with an explicit worklist.
    fn scan(&self, require_lock: bool) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut visited: HashSet<PathBuf> = HashSet::new();

        for root in &self.config.folders {
            if is_excluded(root, &self.config.exclude_folders) {
                debug!(?root, "root folder excluded");
                continue;
            }

            let mut stack = vec![root.clone()];
            while let Some(rel) = stack.pop() {
                let abs = self.config.folder_path(&rel);
                let key = self.fs.canonicalize(&abs).unwrap_or_else(|_| abs.clone());
                if !visited.insert(key) {
                    continue;
                }

                if self.is_project(&abs, require_lock) {
                    found.push(rel.clone());
                }

                let entries = match self.fs.read_dir(&abs) {
                    Ok(entries) => entries,
                    Err(e) => {
                        debug!(folder = ?rel, error = %e, "skipping unreadable folder");
                        continue;
                    }
                };

                for entry in entries {
                    if let Some(child) = self.descend_into(&rel, &entry) {
                        stack.push(child);
                    }
                }
            }
        }

        found
    }

    /// Decide whether a directory entry should be walked; returns its
    /// root-relative path if so.
    fn descend_into(&self, parent: &Path, entry: &Path) -> Option<PathBuf> {
        let name = entry.file_name()?.to_string_lossy().to_string();

        if name == self.config.modules_folder {
            return None;
        }
        if name.starts_with('.') && !self.config.dot_folders {
            return None;
        }

        let rel = if parent.as_os_str() == "." {
            PathBuf::from(&name)
        } else {
            parent.join(&name)
        };
        if is_excluded(&rel, &self.config.exclude_folders) {
            return None;
        }

        // An entry we cannot stat is walked anyway; read_dir decides later.
        let is_dir = self.fs.stat_is_dir(entry).unwrap_or(true);
        is_dir.then_some(rel)
    }

    fn is_project(&self, dir: &Path, require_lock: bool) -> bool {
        self.fs.is_file(&dir.join(MANIFEST_FILE))
            && (!require_lock || self.fs.is_file(&dir.join(&self.config.lock_file)))
    }
}

/// Whether `folder` lies inside any exclude prefix.
///
/// Prefixes are compared on whole path segments: `a` excludes `a/b`, but
/// `a/b` does not exclude `a/bc`.
pub fn is_excluded(folder: &Path, excludes: &[PathBuf]) -> bool {
    let folder = with_trailing_slash(folder);
    excludes
        .iter()
        .any(|ex| folder.starts_with(&with_trailing_slash(ex)))
}

fn with_trailing_slash(path: &Path) -> String {
    let mut s = path.to_string_lossy().replace('\\', "/");
    if !s.ends_with('/') {
        s.push('/');
    }
    s
}

pub fn folder_depth(folder: &Path) -> usize {
    if folder.as_os_str() == "." {
        0
    } else {
        folder.components().count()
    }
}

/// Parents before children: fewer path segments first, then shorter paths.
pub fn sort_folders(folders: &mut [PathBuf]) {
    folders.sort_by(|a, b| {
        (folder_depth(a), a.as_os_str().len())
            .cmp(&(folder_depth(b), b.as_os_str().len()))
            .then_with(|| a.cmp(b))
    });
}

fn dedup_in_order(folders: &mut Vec<PathBuf>) {
    let mut seen = HashSet::new();
    folders.retain(|f| seen.insert(f.clone()));
}
