// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{HashStorageMode, PackageManager};

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_MODULES_FOLDER: &str = "node_modules";
pub const DEFAULT_LOCK_MARKER: &str = ".monorun.lock";
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_millis(2500);

/// Optional defaults file as read from TOML.
///
/// ```toml
/// [defaults]
/// concurrency = 4
/// exclude_folders = ["legacy"]
/// separate_cache_folders = "ci"
/// watch_interval = "5s"
/// ```
///
/// Every key is optional; flags given on the command line win.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub defaults: DefaultsSection,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsSection {
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub exclude_folders: Vec<String>,
    #[serde(default)]
    pub include_folders: Vec<String>,
    pub dot_folders: Option<bool>,
    pub npm: Option<bool>,
    pub cache_folder: Option<String>,
    pub separate_cache_folders: Option<String>,
    pub watch_interval: Option<String>,
    /// Lock-file name used for discovery and as the default watched file.
    pub lock_file: Option<String>,
    pub modules_folder: Option<String>,
}

/// Which force behaviours are requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForceFlags {
    /// Append the manager's force flag.
    pub install: bool,
    /// Synthesise an add command for `file:` / `link:` dependencies.
    pub local: bool,
    /// Synthesise an add command for git / URL dependencies.
    pub remote: bool,
}

/// Settings that only matter in watch mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    /// File names watched inside every folder.
    pub files: Vec<String>,
    /// Ignore events that leave the content hash unchanged.
    pub content_only: bool,
    /// Honour force flags on change-triggered runs.
    pub force_on_change: bool,
    pub interval: Duration,
    pub hash_store: HashStorageMode,
}

/// Fully resolved, immutable configuration for one invocation.
///
/// Built by [`RunConfiguration::from_sources`], which applies defaults and
/// validation. Folder paths are relative to `cwd`.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    pub cwd: PathBuf,
    /// Explicit command words; empty means "manager default".
    pub command: Vec<String>,
    pub concurrency: usize,
    pub fail_fast: bool,
    pub exit_on_error: bool,
    pub manager: PackageManager,
    pub folders: Vec<PathBuf>,
    pub exclude_folders: Vec<PathBuf>,
    pub include_folders: Vec<PathBuf>,
    pub here: bool,
    pub dot_folders: bool,
    pub only_workspaces: bool,
    pub modules_folder: String,
    pub lock_file: String,
    pub cache_folder: Option<PathBuf>,
    pub separate_cache_seed: Option<String>,
    pub force: ForceFlags,
    pub link_files: bool,
    pub clean_up: bool,
    /// Marker written in `cwd` for the duration of a whole run.
    pub lock_marker: Option<String>,
    /// Marker written in each folder around its own run.
    pub lock_each: Option<String>,
    pub watch: Option<WatchSettings>,
    pub dry_run: bool,
}

impl RunConfiguration {
    /// Configuration with every option at its default, rooted at `cwd`.
    pub fn with_defaults(cwd: impl Into<PathBuf>) -> Self {
        let manager = PackageManager::default();
        Self {
            cwd: cwd.into(),
            command: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            fail_fast: false,
            exit_on_error: true,
            manager,
            folders: vec![PathBuf::from(".")],
            exclude_folders: Vec::new(),
            include_folders: Vec::new(),
            here: false,
            dot_folders: false,
            only_workspaces: false,
            modules_folder: DEFAULT_MODULES_FOLDER.to_string(),
            lock_file: manager.lock_file().to_string(),
            cache_folder: None,
            separate_cache_seed: None,
            force: ForceFlags::default(),
            link_files: false,
            clean_up: false,
            lock_marker: None,
            lock_each: None,
            watch: None,
            dry_run: false,
        }
    }

    /// Absolute (cwd-joined) location of a folder.
    pub fn folder_path(&self, folder: &std::path::Path) -> PathBuf {
        if folder.as_os_str() == "." {
            self.cwd.clone()
        } else {
            self.cwd.join(folder)
        }
    }

    /// Files watched in every folder: explicit list, or the manager's
    /// natural signal file.
    pub fn watched_files(&self) -> Vec<String> {
        match &self.watch {
            Some(w) if !w.files.is_empty() => w.files.clone(),
            _ => match self.manager {
                PackageManager::Yarn => vec![self.lock_file.clone()],
                PackageManager::Npm => vec!["package.json".to_string()],
            },
        }
    }
}
