// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::FileConfig;
use crate::errors::Result;

/// Name of the defaults file looked up in the working root.
pub const DEFAULT_CONFIG_FILE: &str = ".monorun.toml";

/// Load a defaults file from a given path.
///
/// This only performs TOML deserialization; merging with CLI flags and
/// validation happen in [`RunConfiguration::from_sources`].
///
/// [`RunConfiguration::from_sources`]: crate::config::RunConfiguration::from_sources
pub fn load_from_path(path: impl AsRef<Path>) -> Result<FileConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: FileConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Resolve the defaults file for an invocation.
///
/// - An explicit `--config` path must exist.
/// - Otherwise `.monorun.toml` in `cwd` is used if present, and an empty
///   config if not.
pub fn load_file_config(explicit: Option<&Path>, cwd: &Path) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }

    let path = default_config_path(cwd);
    if path.is_file() {
        debug!(?path, "loading defaults file");
        load_from_path(&path)
    } else {
        Ok(FileConfig::default())
    }
}

pub fn default_config_path(cwd: &Path) -> PathBuf {
    cwd.join(DEFAULT_CONFIG_FILE)
}
