// src/watch/runner.rs

//! The async watch loop: idle-polling, running, rescanning.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::WatchSettings;
use crate::discover::FolderResolver;
use crate::engine::{CompletionLog, RunCoordinator, RunPlan, RunReport};
use crate::errors::{MonorunError, Result};
use crate::fs::FileSystem;
use crate::watch::hash::{compute_file_hash, HashStore};
use crate::watch::state::{ChangeOutcome, WatchState};
use crate::watch::watcher::{PathWatcher, WatchEvent};

/// Everything file events touch, kept apart from the event receiver so the
/// loop can hold both at once.
struct Tracker<W: PathWatcher> {
    state: WatchState,
    watcher: W,
    store: Box<dyn HashStore>,
    fs: Arc<dyn FileSystem>,
    completions: CompletionLog,
}

impl<W: PathWatcher> Tracker<W> {
    fn handle_event(&mut self, event: WatchEvent) -> ChangeOutcome {
        let path = event.path;
        let last_run = self
            .state
            .folder_of(&path)
            .and_then(|folder| self.completions.last(folder));
        let new_hash = compute_file_hash(self.fs.as_ref(), &path).ok();

        let outcome = self
            .state
            .on_change(&path, new_hash, last_run, Instant::now());

        match &outcome {
            ChangeOutcome::Untracked => {}
            ChangeOutcome::Removed { folder } => {
                info!(folder = %folder.display(), file = ?path, "watched file removed");
                if let Err(e) = self.watcher.unwatch(&path) {
                    debug!(file = ?path, error = %e, "unwatch failed");
                }
                if let Err(e) = self.store.forget(&path) {
                    debug!(file = ?path, error = %e, "cannot drop stored hash");
                }
            }
            ChangeOutcome::Echo { folder } => {
                debug!(folder = %folder.display(), file = ?path, "ignoring change from own run");
            }
            ChangeOutcome::Unchanged { folder } => {
                debug!(folder = %folder.display(), file = ?path, "content unchanged");
            }
            ChangeOutcome::Changed { folder } => {
                info!(folder = %folder.display(), file = ?path, "change detected");
            }
        }
        outcome
    }
}

/// Re-runs folders whose watched files change.
pub struct WatchLoop<W: PathWatcher> {
    coordinator: Arc<RunCoordinator>,
    resolver: FolderResolver,
    settings: WatchSettings,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    tracker: Tracker<W>,
}

impl<W: PathWatcher> fmt::Debug for WatchLoop<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchLoop")
            .field("settings", &self.settings)
            .field("state", &self.tracker.state)
            .finish_non_exhaustive()
    }
}

impl<W: PathWatcher> WatchLoop<W> {
    pub fn new(
        coordinator: Arc<RunCoordinator>,
        resolver: FolderResolver,
        fs: Arc<dyn FileSystem>,
        settings: WatchSettings,
        store: Box<dyn HashStore>,
        watcher: W,
        events: mpsc::UnboundedReceiver<WatchEvent>,
    ) -> Self {
        let tracker = Tracker {
            state: WatchState::new(settings.content_only),
            watcher,
            store,
            fs,
            completions: coordinator.completions().clone(),
        };
        Self {
            coordinator,
            resolver,
            settings,
            events,
            tracker,
        }
    }

    pub fn state(&self) -> &WatchState {
        &self.tracker.state
    }

    /// Apply one file event to the watch state.
    pub fn handle_event(&mut self, event: WatchEvent) -> ChangeOutcome {
        self.tracker.handle_event(event)
    }

    /// Discover folders and start watching files not yet tracked.
    ///
    /// Returns how many files were newly registered.
    pub fn rescan(&mut self) -> Result<usize> {
        let folders = self.resolver.resolve()?;
        let names = self.coordinator.config().watched_files();
        let mut added = 0;

        for folder in folders {
            let dir = self.coordinator.config().folder_path(&folder);
            for name in &names {
                let file = dir.join(name);
                if self.tracker.state.is_watched(&file) {
                    continue;
                }
                let Ok(hash) = compute_file_hash(self.tracker.fs.as_ref(), &file) else {
                    continue;
                };
                if let Err(e) = self.tracker.watcher.watch(&file) {
                    warn!(?file, error = %e, "cannot watch file");
                    continue;
                }

                let cached = self.tracker.store.load(&file).unwrap_or_else(|e| {
                    warn!(?file, error = %e, "cannot read stored hash");
                    None
                });
                if self
                    .tracker
                    .state
                    .register(folder.clone(), file.clone(), hash, cached.as_deref())
                {
                    debug!(folder = %folder.display(), ?file, "changed since last successful run");
                }
                added += 1;
            }
        }

        if added > 0 {
            info!(added, total = self.tracker.state.watched_count(), "watching files");
        }
        Ok(added)
    }

    /// Run the changed folders, if any, then rescan.
    ///
    /// File events keep being processed while the run is in flight; they
    /// queue folders for the following cycle.
    pub async fn cycle(&mut self) -> Result<Option<RunReport>> {
        if !self.tracker.state.has_changes() {
            return Ok(None);
        }

        let folders = self.tracker.state.take_changed();
        info!(folders = folders.len(), "running changed folders");

        let plan = RunPlan {
            folders: folders.clone(),
            honor_force: self.settings.force_on_change,
        };
        let coordinator = Arc::clone(&self.coordinator);
        let run = async move { coordinator.run_all(plan).await };
        tokio::pin!(run);

        let report = loop {
            tokio::select! {
                res = &mut run => break res?,
                Some(event) = self.events.recv() => {
                    self.tracker.handle_event(event);
                }
            }
        };

        let failed = report.failed_folders();
        for folder in folders.iter().filter(|f| !failed.contains(f)) {
            self.persist_baseline(folder);
        }

        self.rescan()?;
        Ok(Some(report))
    }

    fn persist_baseline(&mut self, folder: &std::path::Path) {
        for file in self.tracker.state.files_of(folder) {
            match compute_file_hash(self.tracker.fs.as_ref(), &file) {
                Ok(hash) => {
                    if let Err(e) = self.tracker.store.save(&file, &hash) {
                        warn!(?file, error = %e, "cannot store hash");
                    }
                }
                Err(e) => debug!(?file, error = %e, "cannot hash file after run"),
            }
        }
    }

    /// Watch until the process is terminated.
    ///
    /// Returns `Ok` only if the event channel closes; a fail-fast trip ends
    /// the loop with its error.
    pub async fn run(mut self) -> Result<()> {
        self.rescan()?;
        info!(
            files = self.tracker.state.watched_count(),
            interval_ms = self.settings.interval.as_millis() as u64,
            "watch mode started"
        );

        loop {
            let sleep = tokio::time::sleep(self.settings.interval);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    event = self.events.recv() => match event {
                        Some(event) => {
                            self.tracker.handle_event(event);
                        }
                        None => {
                            info!("watch event channel closed; stopping");
                            return Ok(());
                        }
                    },
                }
            }

            match self.cycle().await {
                Ok(_) => {}
                Err(e @ MonorunError::FailFast { .. }) => return Err(e),
                Err(e) => warn!(error = %e, "watch cycle failed"),
            }
        }
    }
}
