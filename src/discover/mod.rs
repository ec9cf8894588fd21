// src/discover/mod.rs

//! Project-folder discovery.
//!
//! - [`resolver`] walks the root folders and applies the hidden-folder,
//!   modules-folder, exclude and include rules.
//! - [`workspaces`] compiles the root manifest's `workspaces` globs.

pub mod resolver;
pub mod workspaces;

pub use resolver::{folder_depth, is_excluded, sort_folders, FolderResolver};
pub use workspaces::WorkspaceMatcher;
