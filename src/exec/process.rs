// src/exec/process.rs

//! Production process spawner on `tokio::process`.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use super::backend::{OutputMode, ProcessSpawner, SpawnOutput, SpawnRequest};

/// Shell exit status for "command not found".
const COMMAND_NOT_FOUND: i32 = 127;

/// Runs commands through `sh -c` (or `cmd /C` on Windows).
#[derive(Debug, Clone, Default)]
pub struct RealSpawner;

impl ProcessSpawner for RealSpawner {
    fn spawn(
        &self,
        request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SpawnOutput>> + Send + '_>> {
        Box::pin(run_process(request))
    }
}

async fn run_process(request: SpawnRequest) -> Result<SpawnOutput> {
    let line = request.shell_line();
    debug!(cwd = ?request.cwd, cmd = %line, "spawning process");

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&line);
        c
    };

    cmd.current_dir(&request.cwd)
        .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match request.output {
        OutputMode::Stream => cmd.stdout(Stdio::inherit()),
        OutputMode::Capture => cmd.stdout(Stdio::piped()),
    };

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning '{}' in {:?}", line, request.cwd))?;

    // Always drain stderr so the pipe never fills; forward it when streaming.
    let forward = request.output == OutputMode::Stream;
    let stderr_task = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut buffer = String::new();
            let mut parent = tokio::io::stderr();
            while let Ok(Some(line)) = lines.next_line().await {
                if forward {
                    let _ = parent.write_all(line.as_bytes()).await;
                    let _ = parent.write_all(b"\n").await;
                }
                buffer.push_str(&line);
                buffer.push('\n');
            }
            buffer
        })
    });

    let stdout_task = child.stdout.take().map(|mut stdout| {
        tokio::spawn(async move {
            let mut out = String::new();
            let _ = stdout.read_to_string(&mut out).await;
            out
        })
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for '{}'", line))?;

    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };
    let stdout = match stdout_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    let code = status.code().unwrap_or(-1);
    if cfg!(unix) && code == COMMAND_NOT_FOUND {
        return Err(anyhow!(
            "{}: command not found{}",
            request.program,
            if stderr.trim().is_empty() {
                String::new()
            } else {
                format!(" ({})", stderr.trim())
            }
        ));
    }

    Ok(SpawnOutput {
        code,
        stdout,
        stderr,
    })
}
