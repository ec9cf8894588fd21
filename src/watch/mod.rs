// src/watch/mod.rs

//! Watch mode.
//!
//! This module is responsible for:
//! - Hashing watched files and persisting the last successful baseline.
//! - Wiring up a cross-platform per-file watcher (`notify`) that feeds an
//!   explicit event channel.
//! - Deciding which folders changed ([`state`]) and re-running them
//!   ([`runner`]).

pub mod hash;
pub mod runner;
pub mod state;
pub mod watcher;

pub use hash::{
    compute_file_hash, path_key, store_for_mode, FileHashStore, HashStore, MemoryHashStore,
    HASH_DIR_NAME,
};
pub use runner::WatchLoop;
pub use state::{ChangeOutcome, WatchState, DEBOUNCE_WINDOW};
pub use watcher::{NotifyWatcher, PathWatcher, WatchEvent};
