// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonorunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid manifest {path:?}: {message}")]
    ManifestError { path: PathBuf, message: String },

    /// A folder failed while `--fail-fast` was set.
    #[error("fail-fast: folder {folder:?} failed (code {code:?})")]
    FailFast { folder: PathBuf, code: Option<i32> },

    /// Folders were still failing after the sequential retry pass.
    #[error("{0} folder(s) failed")]
    FoldersFailed(usize),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MonorunError>;
