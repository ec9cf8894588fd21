// src/config/mod.rs

//! Configuration: optional TOML defaults file merged with CLI flags into an
//! immutable [`RunConfiguration`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_file_config, load_from_path};
pub use model::{
    DefaultsSection, FileConfig, ForceFlags, RunConfiguration, WatchSettings,
    DEFAULT_CONCURRENCY, DEFAULT_LOCK_MARKER, DEFAULT_MODULES_FOLDER, DEFAULT_WATCH_INTERVAL,
};
pub use validate::{normalize_folder, parse_duration};
