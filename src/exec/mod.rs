// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the [`ProcessSpawner`] seam the run coordinator
//!   talks to, so tests can swap in a scripted fake.
//! - [`process`] is the production implementation on `tokio::process`.
//! - [`ansi`] strips terminal escape sequences from captured output.

pub mod ansi;
pub mod backend;
pub mod process;

pub use ansi::strip_ansi;
pub use backend::{OutputMode, ProcessSpawner, SpawnOutput, SpawnRequest};
pub use process::RealSpawner;
