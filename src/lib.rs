// src/lib.rs

pub mod cli;
pub mod config;
pub mod discover;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod manifest;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_file_config, RunConfiguration};
use crate::discover::FolderResolver;
use crate::engine::{RunCoordinator, RunPlan, RunReport};
use crate::errors::{MonorunError, Result};
use crate::exec::{ProcessSpawner, RealSpawner, SpawnRequest};
use crate::fs::{FileSystem, RealFileSystem};
use crate::manifest::read_manifest;
use crate::watch::{store_for_mode, NotifyWatcher, WatchLoop};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - defaults file + CLI flags -> `RunConfiguration`
/// - folder discovery
/// - the run coordinator (one-shot) or the watch loop
/// - Ctrl-C handling in watch mode
pub async fn run(args: CliArgs) -> Result<()> {
    let cwd = working_root(args.cwd.as_deref())?;
    let file_cfg = load_file_config(args.config.as_deref().map(Path::new), &cwd)?;
    let config = Arc::new(RunConfiguration::from_sources(&args, &file_cfg, cwd)?);
    debug!(?config, "resolved configuration");

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let spawner: Arc<dyn ProcessSpawner> = Arc::new(RealSpawner);

    if config.dry_run {
        return print_dry_run(config, fs, spawner);
    }

    if let Some(settings) = config.watch.clone() {
        let resolver = FolderResolver::new(Arc::clone(&fs), Arc::clone(&config));
        let coordinator = Arc::new(RunCoordinator::new(config, Arc::clone(&fs), spawner));
        let (watcher, events) = NotifyWatcher::new()?;
        let store = store_for_mode(settings.hash_store, Arc::clone(&fs));
        let watch = WatchLoop::new(coordinator, resolver, fs, settings, store, watcher, events);

        return tokio::select! {
            res = watch.run() => res,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted; leaving watch mode");
                Ok(())
            }
        };
    }

    let exit_on_error = config.exit_on_error;
    let report = run_once(config, fs, spawner).await?;
    if exit_on_error && !report.is_success() {
        return Err(MonorunError::FoldersFailed(report.failures.len()));
    }
    Ok(())
}

/// Discover folders and run them once with the given collaborators.
pub async fn run_once(
    config: Arc<RunConfiguration>,
    fs: Arc<dyn FileSystem>,
    spawner: Arc<dyn ProcessSpawner>,
) -> Result<RunReport> {
    let mut resolver = FolderResolver::new(Arc::clone(&fs), Arc::clone(&config));
    let folders = resolver.resolve()?;
    let coordinator = Arc::new(RunCoordinator::new(config, fs, spawner));
    coordinator.run_all(RunPlan::new(folders)).await
}

fn working_root(explicit: Option<&str>) -> Result<PathBuf> {
    let root = match explicit {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().context("reading current directory")?,
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("working root {:?} is not accessible", root))?;
    Ok(root)
}

/// Print folders and the command each would run.
fn print_dry_run(
    config: Arc<RunConfiguration>,
    fs: Arc<dyn FileSystem>,
    spawner: Arc<dyn ProcessSpawner>,
) -> Result<()> {
    let mut resolver = FolderResolver::new(Arc::clone(&fs), Arc::clone(&config));
    let folders = resolver.resolve()?;
    let coordinator = RunCoordinator::new(Arc::clone(&config), Arc::clone(&fs), spawner);

    println!("monorun dry-run");
    println!("  root = {}", config.cwd.display());
    println!("  manager = {}", config.manager.program());
    println!("  concurrency = {}", config.concurrency.min(folders.len().max(1)));
    println!();

    println!("folders ({}):", folders.len());
    for folder in &folders {
        let dir = config.folder_path(folder);
        match read_manifest(fs.as_ref(), &dir) {
            Ok(manifest) => {
                let composed = coordinator.compose(folder, &manifest, true);
                let request = SpawnRequest {
                    program: config.manager.program().to_string(),
                    args: composed.args,
                    cwd: dir,
                    env: Vec::new(),
                    output: crate::exec::OutputMode::Stream,
                };
                println!("  - {}", folder.display());
                println!("      cmd: {}", request.shell_line());
                if !composed.clean_entries.is_empty() {
                    println!("      clean cache: {:?}", composed.clean_entries);
                }
            }
            Err(e) => {
                println!("  - {}", folder.display());
                println!("      error: {e}");
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
