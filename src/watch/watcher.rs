// src/watch/watcher.rs

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

/// One file-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
}

/// Registers and drops per-file watches.
///
/// Notifications are delivered on the channel handed out alongside the
/// watcher, never through callbacks into shared state.
pub trait PathWatcher: Send {
    fn watch(&mut self, path: &Path) -> Result<()>;
    fn unwatch(&mut self, path: &Path) -> Result<()>;
}

type TrackedFiles = Arc<Mutex<HashSet<PathBuf>>>;

/// `notify`-backed watcher.
///
/// Watches the directory holding each tracked file rather than the file
/// itself, so a file replaced by rename (the way package managers write
/// lockfiles) keeps reporting changes. Events for untracked siblings are
/// dropped before they reach the channel.
///
/// Dropping it stops all watches.
pub struct NotifyWatcher {
    inner: RecommendedWatcher,
    tracked: TrackedFiles,
    /// Watched directory -> number of tracked files inside it.
    dirs: HashMap<PathBuf, usize>,
}

impl std::fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatcher")
            .field("dirs", &self.dirs)
            .finish_non_exhaustive()
    }
}

fn lock_tracked(tracked: &TrackedFiles) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
    tracked.lock().unwrap_or_else(PoisonError::into_inner)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl NotifyWatcher {
    /// Create the watcher and the receiving end of its event channel.
    pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<WatchEvent>();
        let tracked: TrackedFiles = Arc::default();

        // Called synchronously by notify on its own thread.
        let inner = RecommendedWatcher::new(
            {
                let tracked = Arc::clone(&tracked);
                move |res: notify::Result<Event>| match res {
                    Ok(event) => {
                        if matches!(event.kind, EventKind::Access(_)) {
                            return;
                        }
                        let tracked = lock_tracked(&tracked);
                        for path in event.paths {
                            if !tracked.contains(&path) {
                                continue;
                            }
                            if let Err(err) = event_tx.send(WatchEvent { path }) {
                                // We can't log via tracing here easily, so fallback to stderr.
                                eprintln!("monorun: failed to forward file event: {err}");
                            }
                        }
                    }
                    Err(err) => {
                        eprintln!("monorun: file watch error: {err}");
                    }
                }
            },
            Config::default(),
        )?;

        Ok((
            Self {
                inner,
                tracked,
                dirs: HashMap::new(),
            },
            event_rx,
        ))
    }
}

impl PathWatcher for NotifyWatcher {
    fn watch(&mut self, path: &Path) -> Result<()> {
        if lock_tracked(&self.tracked).contains(path) {
            return Ok(());
        }

        let dir = parent_dir(path);
        let count = self.dirs.get(&dir).copied().unwrap_or(0);
        if count == 0 {
            self.inner.watch(&dir, RecursiveMode::NonRecursive)?;
            debug!(?dir, "watching directory");
        }
        self.dirs.insert(dir, count + 1);
        lock_tracked(&self.tracked).insert(path.to_path_buf());

        debug!(?path, "watching file");
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        if !lock_tracked(&self.tracked).remove(path) {
            return Ok(());
        }
        debug!(?path, "stopped watching file");

        let dir = parent_dir(path);
        match self.dirs.get_mut(&dir) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                self.dirs.remove(&dir);
                self.inner.unwatch(&dir)?;
                debug!(?dir, "stopped watching directory");
            }
            None => {}
        }
        Ok(())
    }
}
