use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use monorun::exec::{OutputMode, ProcessSpawner, SpawnOutput, SpawnRequest};

/// Scripted outcome for one streamed run.
#[derive(Debug, Clone)]
pub enum Scripted {
    Exit { code: i32, stderr: String },
    SpawnError(String),
}

impl Scripted {
    pub fn fail(code: i32, stderr: impl Into<String>) -> Self {
        Scripted::Exit {
            code,
            stderr: stderr.into(),
        }
    }
}

#[derive(Default)]
struct Inner {
    script: Mutex<HashMap<PathBuf, VecDeque<Scripted>>>,
    delays: Mutex<HashMap<PathBuf, Duration>>,
    calls: Mutex<Vec<SpawnRequest>>,
    cache_dir: Mutex<Option<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// A fake process spawner that:
/// - records every request
/// - succeeds unless an outcome was scripted for the request's cwd
/// - answers `cache dir` queries with a configured path
/// - tracks how many streamed runs overlapped
#[derive(Clone, Default)]
pub struct FakeSpawner {
    inner: Arc<Inner>,
    default_delay: Duration,
    query_delay: Duration,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every streamed run takes at least this long.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Every `cache dir` query takes this long to answer.
    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    /// Queue an outcome for the next streamed run in `cwd`.
    pub fn script(&self, cwd: impl AsRef<Path>, outcome: Scripted) {
        self.inner
            .script
            .lock()
            .unwrap()
            .entry(cwd.as_ref().to_path_buf())
            .or_default()
            .push_back(outcome);
    }

    pub fn delay_for(&self, cwd: impl AsRef<Path>, delay: Duration) {
        self.inner
            .delays
            .lock()
            .unwrap()
            .insert(cwd.as_ref().to_path_buf(), delay);
    }

    pub fn set_cache_dir(&self, dir: impl Into<String>) {
        *self.inner.cache_dir.lock().unwrap() = Some(dir.into());
    }

    pub fn calls(&self) -> Vec<SpawnRequest> {
        self.inner.calls.lock().unwrap().clone()
    }

    /// Streamed (package-manager) runs only.
    pub fn runs(&self) -> Vec<SpawnRequest> {
        self.calls()
            .into_iter()
            .filter(|r| r.output == OutputMode::Stream)
            .collect()
    }

    pub fn runs_in(&self, cwd: impl AsRef<Path>) -> usize {
        self.runs().iter().filter(|r| r.cwd == cwd.as_ref()).count()
    }

    /// Captured helper commands (cache queries, cache cleans).
    pub fn captures(&self) -> Vec<SpawnRequest> {
        self.calls()
            .into_iter()
            .filter(|r| r.output == OutputMode::Capture)
            .collect()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }

    async fn respond(&self, request: SpawnRequest) -> Result<SpawnOutput> {
        self.inner.calls.lock().unwrap().push(request.clone());

        if request.output == OutputMode::Capture {
            let is_cache_query = request.args.iter().any(|a| a == "cache")
                && request.args.iter().any(|a| a == "dir" || a == "get");
            if is_cache_query {
                if !self.query_delay.is_zero() {
                    tokio::time::sleep(self.query_delay).await;
                }
                return match self.inner.cache_dir.lock().unwrap().clone() {
                    Some(dir) => Ok(SpawnOutput {
                        code: 0,
                        stdout: format!("{dir}\n"),
                        stderr: String::new(),
                    }),
                    None => Ok(SpawnOutput {
                        code: 1,
                        ..SpawnOutput::default()
                    }),
                };
            }
            return Ok(SpawnOutput::default());
        }

        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .inner
            .delays
            .lock()
            .unwrap()
            .get(&request.cwd)
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self
            .inner
            .script
            .lock()
            .unwrap()
            .get_mut(&request.cwd)
            .and_then(|q| q.pop_front());

        match scripted {
            None => Ok(SpawnOutput::default()),
            Some(Scripted::Exit { code, stderr }) => Ok(SpawnOutput {
                code,
                stdout: String::new(),
                stderr,
            }),
            Some(Scripted::SpawnError(msg)) => Err(anyhow!(msg)),
        }
    }
}

impl ProcessSpawner for FakeSpawner {
    fn spawn(
        &self,
        request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SpawnOutput>> + Send + '_>> {
        Box::pin(self.respond(request))
    }
}
