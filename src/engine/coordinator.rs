// src/engine/coordinator.rs

//! Per-folder runs and the whole-run aggregation around them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tracing::{debug, error, info, warn};

use crate::config::RunConfiguration;
use crate::engine::cache::{partition_dir, CacheDirRegistry, CacheRecovery};
use crate::engine::completions::CompletionLog;
use crate::engine::link::link_file_dependencies;
use crate::engine::markers::LockMarker;
use crate::engine::queue::run_bounded;
use crate::engine::{RunReport, RunResult};
use crate::errors::{MonorunError, Result};
use crate::exec::{strip_ansi, OutputMode, ProcessSpawner, SpawnRequest};
use crate::fs::FileSystem;
use crate::manifest::{read_manifest, PackageManifest};
use crate::types::PackageManager;

/// Environment every package-manager run gets on top of ours.
pub const FORCE_COLOR_ENV: (&str, &str) = ("FORCE_COLOR", "1");

/// Directory under the temp dir used for cache partitions when no explicit
/// cache folder is configured.
pub const PARTITION_BASE_DIR: &str = "monorun-cache";

/// Which folders one `run_all` covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub folders: Vec<PathBuf>,
    /// Whether `--force`, `--force-local` and `--force-remote` apply.
    pub honor_force: bool,
}

impl RunPlan {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self {
            folders,
            honor_force: true,
        }
    }
}

/// Arguments and side work prepared for one folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposedRun {
    pub args: Vec<String>,
    /// Packages whose cache entries are cleaned before the run.
    pub clean_entries: Vec<String>,
    /// Cache folder passed to the manager, if overridden.
    pub cache_dir: Option<PathBuf>,
}

/// Runs the package manager in folders and aggregates the outcomes.
///
/// Owns the per-invocation state: the cache-folder registry and the
/// completion log the watch loop consults.
pub struct RunCoordinator {
    config: Arc<RunConfiguration>,
    fs: Arc<dyn FileSystem>,
    spawner: Arc<dyn ProcessSpawner>,
    cache_dirs: CacheDirRegistry,
    completions: CompletionLog,
}

impl fmt::Debug for RunCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunCoordinator")
            .field("config", &self.config)
            .field("cache_dirs", &self.cache_dirs)
            .finish_non_exhaustive()
    }
}

impl RunCoordinator {
    pub fn new(
        config: Arc<RunConfiguration>,
        fs: Arc<dyn FileSystem>,
        spawner: Arc<dyn ProcessSpawner>,
    ) -> Self {
        Self {
            config,
            fs,
            spawner,
            cache_dirs: CacheDirRegistry::new(),
            completions: CompletionLog::new(),
        }
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    pub fn completions(&self) -> &CompletionLog {
        &self.completions
    }

    pub fn cache_dirs(&self) -> &CacheDirRegistry {
        &self.cache_dirs
    }

    /// Run every planned folder, then retry the failures once, one at a time.
    ///
    /// Returns `Err` only for a fail-fast trip or an internal queue failure;
    /// folder failures are reported in [`RunReport::failures`].
    pub async fn run_all(self: &Arc<Self>, plan: RunPlan) -> Result<RunReport> {
        let started = Instant::now();
        let marker = self.config.lock_marker.as_deref().and_then(|name| {
            LockMarker::acquire(self.fs.as_ref(), &self.config.cwd, name)
                .map_err(|e| warn!(error = %e, "failed to write lock marker"))
                .ok()
        });

        info!(
            folders = plan.folders.len(),
            concurrency = self.config.concurrency.min(plan.folders.len().max(1)),
            "starting run"
        );

        let first = self
            .run_pass(plan.folders.clone(), self.config.concurrency, plan.honor_force)
            .await?;

        let failed: Vec<RunResult> = first.iter().filter(|r| !r.is_success()).cloned().collect();
        let mut attempts = first;
        let mut failures = Vec::new();

        if !failed.is_empty() {
            warn!(count = failed.len(), "retrying failed folders sequentially");
            self.recover_caches(&failed).await;

            let folders = failed.iter().map(|r| r.folder.clone()).collect();
            let retried = self.run_pass(folders, 1, plan.honor_force).await?;
            failures = retried.iter().filter(|r| !r.is_success()).cloned().collect();
            attempts.extend(retried);
        }

        if let Some(marker) = marker {
            marker.release(self.fs.as_ref());
        }

        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;
        if failures.is_empty() {
            info!(folders = plan.folders.len(), elapsed_ms, "all folders succeeded");
        } else {
            for f in &failures {
                error!(folder = %f.folder.display(), code = ?f.code, "folder still failing after retry");
            }
            error!(failed = failures.len(), elapsed_ms, "run finished with failures");
        }

        Ok(RunReport {
            attempts,
            failures,
            elapsed,
        })
    }

    async fn run_pass(
        self: &Arc<Self>,
        folders: Vec<PathBuf>,
        limit: usize,
        honor_force: bool,
    ) -> Result<Vec<RunResult>> {
        let this = Arc::clone(self);
        run_bounded(folders, limit, move |folder: PathBuf| {
            let this = Arc::clone(&this);
            async move { this.run_one(&folder, honor_force).await }
        })
        .await
    }

    /// Run the package manager once in `folder`.
    ///
    /// Folder failures come back as a failing [`RunResult`]; `Err` is
    /// reserved for the fail-fast trip.
    pub async fn run_one(&self, folder: &Path, honor_force: bool) -> Result<RunResult> {
        let dir = self.config.folder_path(folder);
        let started = Instant::now();
        info!(folder = %folder.display(), "start");

        let manifest = match read_manifest(self.fs.as_ref(), &dir) {
            Ok(m) => m,
            Err(e) => {
                let result = RunResult::orchestration_failure(folder, e.to_string());
                return self.finish(result, started);
            }
        };

        let composed = self.compose(folder, &manifest, honor_force);

        for name in &composed.clean_entries {
            self.clean_cache_entry(name).await;
        }

        let modules = dir.join(&self.config.modules_folder);
        if self.config.clean_up && self.fs.exists(&modules) {
            debug!(?modules, "removing modules folder");
            if let Err(e) = self.fs.remove_dir_all(&modules) {
                warn!(folder = %folder.display(), error = %e, "failed to remove modules folder");
            }
        }

        if let Some(cache_dir) = &composed.cache_dir {
            if let Err(e) = self.fs.create_dir_all(cache_dir) {
                warn!(dir = ?cache_dir, error = %e, "failed to create cache folder");
            }
            if let Err(e) = self
                .cache_dirs
                .get_or_resolve(Some(cache_dir.as_path()), || self.resolve_cache_dir(Some(cache_dir.clone())))
                .await
            {
                warn!(dir = ?cache_dir, error = %e, "failed to resolve cache folder");
            }
        }

        let marker = self.config.lock_each.as_deref().and_then(|name| {
            LockMarker::acquire(self.fs.as_ref(), &dir, name)
                .map_err(|e| warn!(folder = %folder.display(), error = %e, "failed to write lock marker"))
                .ok()
        });

        let request = SpawnRequest {
            program: self.config.manager.program().to_string(),
            args: composed.args,
            cwd: dir.clone(),
            env: vec![(FORCE_COLOR_ENV.0.to_string(), FORCE_COLOR_ENV.1.to_string())],
            output: OutputMode::Stream,
        };
        debug!(folder = %folder.display(), cmd = %request.shell_line(), "running");

        let result = match self.spawner.spawn(request).await {
            Ok(out) if out.success() => RunResult::success(folder),
            Ok(out) => RunResult::process_failure(folder, out.code, strip_ansi(&out.stderr)),
            Err(e) => RunResult::orchestration_failure(folder, format!("{e:#}")),
        };

        if let Some(marker) = marker {
            marker.release(self.fs.as_ref());
        }

        if self.config.link_files {
            let linked =
                link_file_dependencies(self.fs.as_ref(), &dir, &self.config.modules_folder, &manifest);
            debug!(folder = %folder.display(), linked, "linked file dependencies");
        }

        self.finish(result, started)
    }

    /// Log, timestamp and apply fail-fast to a finished attempt.
    fn finish(&self, result: RunResult, started: Instant) -> Result<RunResult> {
        self.completions.record(&result.folder);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if result.is_success() {
            info!(folder = %result.folder.display(), elapsed_ms, "finish");
            return Ok(result);
        }

        error!(
            folder = %result.folder.display(),
            code = ?result.code,
            elapsed_ms,
            error = result.error.as_deref().unwrap_or("").trim(),
            "failed"
        );

        if self.config.fail_fast {
            return Err(MonorunError::FailFast {
                folder: result.folder,
                code: result.code,
            });
        }
        Ok(result)
    }

    /// Build the argument list for `folder` without touching anything.
    pub fn compose(&self, folder: &Path, manifest: &PackageManifest, honor_force: bool) -> ComposedRun {
        let manager = self.config.manager;
        let force = self.config.force;
        let mut composed = ComposedRun::default();

        composed.args = if !self.config.command.is_empty() {
            self.config.command.clone()
        } else if honor_force && (force.local || force.remote) {
            let deps = manifest.dependencies_where(|d| {
                (force.local && d.is_local()) || (force.remote && d.is_remote())
            });
            if deps.is_empty() {
                manager.default_command()
            } else {
                composed.clean_entries = deps
                    .iter()
                    .filter(|(_, d)| d.is_local())
                    .map(|(name, _)| name.clone())
                    .collect();
                std::iter::once(manager.add_verb().to_string())
                    .chain(deps.iter().map(|(name, d)| format!("{name}@{}", d.to_spec())))
                    .collect()
            }
        } else {
            manager.default_command()
        };

        if manager == PackageManager::Yarn {
            if let Some(extras) = &manifest.yarn {
                composed.args.extend(extras.to_args());
            }
        }

        composed.cache_dir = self.cache_override(folder);
        if let Some(dir) = &composed.cache_dir {
            composed.args.push(manager.cache_folder_flag().to_string());
            composed.args.push(dir.to_string_lossy().into_owned());
        }

        if honor_force && force.install {
            composed.args.push(manager.force_flag().to_string());
        }

        composed
    }

    /// The cache folder override for `folder`, if any.
    fn cache_override(&self, folder: &Path) -> Option<PathBuf> {
        let explicit = self.config.cache_folder.as_ref().map(|c| self.config.cwd.join(c));
        match &self.config.separate_cache_seed {
            Some(seed) => {
                let base = explicit.unwrap_or_else(|| std::env::temp_dir().join(PARTITION_BASE_DIR));
                Some(partition_dir(&base, seed, &self.config.folder_path(folder)))
            }
            None => explicit,
        }
    }

    /// Ask the package manager where its cache lives.
    async fn resolve_cache_dir(&self, cache_override: Option<PathBuf>) -> Result<PathBuf> {
        let manager = self.config.manager;
        if manager == PackageManager::Npm {
            if let Some(dir) = cache_override {
                return Ok(dir);
            }
        }

        let override_str = cache_override.as_ref().map(|d| d.to_string_lossy().into_owned());
        let request = SpawnRequest {
            program: manager.program().to_string(),
            args: manager.cache_dir_query(override_str.as_deref()),
            cwd: self.config.cwd.clone(),
            env: Vec::new(),
            output: OutputMode::Capture,
        };

        let queried = match self.spawner.spawn(request).await {
            Ok(out) if out.success() => out
                .stdout
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .last()
                .map(PathBuf::from),
            Ok(out) => {
                debug!(code = out.code, "cache dir query failed");
                None
            }
            Err(e) => {
                debug!(error = %e, "cache dir query could not start");
                None
            }
        };

        queried
            .or(cache_override)
            .ok_or_else(|| anyhow!("could not determine the {} cache folder", manager.program()).into())
    }

    /// Clean one package's cache entry; failures are logged.
    async fn clean_cache_entry(&self, name: &str) {
        let manager = self.config.manager;
        let request = SpawnRequest {
            program: manager.program().to_string(),
            args: manager.cache_clean_command(name),
            cwd: self.config.cwd.clone(),
            env: Vec::new(),
            output: OutputMode::Capture,
        };

        match self.spawner.spawn(request).await {
            Ok(out) if out.success() => debug!(package = %name, "cleaned cache entry"),
            Ok(out) => warn!(package = %name, code = out.code, "cache clean failed"),
            Err(e) => warn!(package = %name, error = %e, "cache clean could not start"),
        }
    }

    /// Remove corrupted cache entries named in failure output.
    async fn recover_caches(&self, failed: &[RunResult]) {
        if failed.iter().all(|r| r.error.is_none()) {
            return;
        }

        let uses_default_cache =
            self.config.cache_folder.is_none() && self.config.separate_cache_seed.is_none();
        if uses_default_cache {
            if let Err(e) = self
                .cache_dirs
                .get_or_resolve(None, || self.resolve_cache_dir(None))
                .await
            {
                warn!(error = %e, "cannot inspect failures for cache corruption");
            }
        }
        let dirs = self.cache_dirs.known_dirs().await;

        for result in failed {
            let Some(error) = result.error.as_deref() else {
                continue;
            };
            match CacheRecovery::diagnose(error, &dirs) {
                CacheRecovery::RemoveEntry(entry) => {
                    warn!(folder = %result.folder.display(), entry = ?entry, "removing corrupted cache entry");
                    if let Err(e) = self.fs.remove_dir_all(&entry) {
                        warn!(entry = ?entry, error = %e, "failed to remove cache entry");
                    }
                }
                CacheRecovery::CleanPackages(names) => {
                    warn!(folder = %result.folder.display(), packages = ?names, "cleaning packages with bad hashes");
                    for name in &names {
                        self.clean_cache_entry(name).await;
                    }
                }
                CacheRecovery::Nothing => {}
            }
        }
    }
}
