// src/exec/backend.rs

//! Pluggable process spawner abstraction.
//!
//! The run coordinator never touches `tokio::process` directly; it hands a
//! [`SpawnRequest`] to a [`ProcessSpawner`]. Production code uses
//! [`RealSpawner`](super::RealSpawner); tests provide a fake that records
//! requests and returns scripted outcomes.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use anyhow::Result;

/// What happens to the child's stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Forward stdout to ours as it arrives.
    Stream,
    /// Collect stdout into [`SpawnOutput::stdout`].
    Capture,
}

/// One external command to run through the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Extra environment on top of the inherited one.
    pub env: Vec<(String, String)>,
    pub output: OutputMode,
}

impl SpawnRequest {
    /// The command line as the shell sees it.
    pub fn shell_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| shell_escape::escape(part.into()).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a process that started and exited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOutput {
    /// Exit code; `-1` when the process was killed by a signal.
    pub code: i32,
    /// Captured stdout (only in [`OutputMode::Capture`]).
    pub stdout: String,
    /// Buffered stderr; it is also forwarded in [`OutputMode::Stream`].
    pub stderr: String,
}

impl SpawnOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Trait abstracting how external commands are executed.
///
/// `Err` means the command could not be started at all (spawn-level error);
/// a non-zero exit is reported through [`SpawnOutput::code`].
pub trait ProcessSpawner: Send + Sync {
    fn spawn(
        &self,
        request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SpawnOutput>> + Send + '_>>;
}
