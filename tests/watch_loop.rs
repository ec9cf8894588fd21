// tests/watch_loop.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use monorun::config::{RunConfiguration, WatchSettings};
use monorun::discover::FolderResolver;
use monorun::engine::RunCoordinator;
use monorun::fs::{FileSystem, RealFileSystem};
use monorun::types::HashStorageMode;
use monorun::watch::{
    ChangeOutcome, FileHashStore, HashStore, MemoryHashStore, PathWatcher, WatchEvent, WatchLoop,
};
use monorun_test_utils::builders::ProjectTree;
use monorun_test_utils::fake_spawner::FakeSpawner;
use monorun_test_utils::{init_tracing, with_timeout};
use tokio::sync::mpsc;

/// Records watch registrations instead of touching the OS.
#[derive(Clone, Default)]
struct FakeWatcher {
    watched: Arc<Mutex<Vec<PathBuf>>>,
    unwatched: Arc<Mutex<Vec<PathBuf>>>,
}

impl PathWatcher for FakeWatcher {
    fn watch(&mut self, path: &Path) -> anyhow::Result<()> {
        self.watched.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> anyhow::Result<()> {
        self.unwatched.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

fn settings(content_only: bool) -> WatchSettings {
    WatchSettings {
        files: Vec::new(),
        content_only,
        force_on_change: false,
        interval: Duration::from_millis(20),
        hash_store: HashStorageMode::Memory,
    }
}

struct Harness {
    watch: WatchLoop<FakeWatcher>,
    coordinator: Arc<RunCoordinator>,
    watcher: FakeWatcher,
    spawner: FakeSpawner,
    events: mpsc::UnboundedSender<WatchEvent>,
}

fn harness(tree: &ProjectTree, settings: WatchSettings, store: Box<dyn HashStore>) -> Harness {
    let config: Arc<RunConfiguration> = tree.shared_config(|c| c.watch = Some(settings.clone()));
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let spawner = FakeSpawner::new();
    let coordinator = Arc::new(RunCoordinator::new(
        Arc::clone(&config),
        Arc::clone(&fs),
        Arc::new(spawner.clone()),
    ));
    let resolver = FolderResolver::new(Arc::clone(&fs), config);
    let watcher = FakeWatcher::default();
    let (tx, rx) = mpsc::unbounded_channel();

    let watch = WatchLoop::new(
        Arc::clone(&coordinator),
        resolver,
        fs,
        settings,
        store,
        watcher.clone(),
        rx,
    );
    Harness {
        watch,
        coordinator,
        watcher,
        spawner,
        events: tx,
    }
}

fn two_projects() -> ProjectTree {
    ProjectTree::new().project("a", "a").project("b", "b")
}

/// Pretend `folder` last finished long enough ago to be outside the echo window.
fn age_completion(coordinator: &RunCoordinator, folder: &str) {
    let earlier = Instant::now()
        .checked_sub(Duration::from_secs(30))
        .unwrap_or_else(Instant::now);
    coordinator.completions().record_at(Path::new(folder), earlier);
}

#[tokio::test]
async fn first_scan_runs_every_folder_without_baseline() {
    init_tracing();
    let tree = two_projects();
    let mut h = harness(&tree, settings(false), Box::new(MemoryHashStore::new()));

    assert_eq!(h.watch.rescan().unwrap(), 2);
    assert_eq!(h.watcher.watched.lock().unwrap().len(), 2);
    assert!(h.watch.state().has_changes());

    let report = with_timeout(h.watch.cycle()).await.unwrap().unwrap();
    assert!(report.is_success());
    assert_eq!(h.spawner.runs().len(), 2);

    // Nothing changed since.
    assert!(with_timeout(h.watch.cycle()).await.unwrap().is_none());
    assert_eq!(h.spawner.runs().len(), 2);
}

#[tokio::test]
async fn change_reruns_only_its_folder() {
    let tree = two_projects();
    let mut h = harness(&tree, settings(false), Box::new(MemoryHashStore::new()));
    h.watch.rescan().unwrap();
    with_timeout(h.watch.cycle()).await.unwrap();

    let lock = tree.path("b/yarn.lock");
    std::fs::write(&lock, "# changed\n").unwrap();

    // Straight after the run the event is attributed to the run itself.
    let out = h.watch.handle_event(WatchEvent { path: lock.clone() });
    assert_eq!(out, ChangeOutcome::Echo { folder: "b".into() });

    age_completion(&h.coordinator, "b");
    std::fs::write(&lock, "# changed again\n").unwrap();
    let out = h.watch.handle_event(WatchEvent { path: lock.clone() });
    assert_eq!(out, ChangeOutcome::Changed { folder: "b".into() });

    with_timeout(h.watch.cycle()).await.unwrap().unwrap();
    assert_eq!(h.spawner.runs_in(tree.path("a")), 1);
    assert_eq!(h.spawner.runs_in(tree.path("b")), 2);
}

#[tokio::test]
async fn content_mode_ignores_touches() {
    let tree = two_projects();
    let mut h = harness(&tree, settings(true), Box::new(MemoryHashStore::new()));
    h.watch.rescan().unwrap();
    with_timeout(h.watch.cycle()).await.unwrap();
    age_completion(&h.coordinator, "a");

    let lock = tree.path("a/yarn.lock");
    let out = h.watch.handle_event(WatchEvent { path: lock });
    assert_eq!(out, ChangeOutcome::Unchanged { folder: "a".into() });
    assert!(!h.watch.state().has_changes());
}

#[tokio::test]
async fn removed_file_is_unwatched() {
    let tree = two_projects();
    let mut h = harness(&tree, settings(false), Box::new(MemoryHashStore::new()));
    h.watch.rescan().unwrap();

    let lock = tree.path("a/yarn.lock");
    std::fs::remove_file(&lock).unwrap();
    let out = h.watch.handle_event(WatchEvent { path: lock.clone() });

    assert_eq!(out, ChangeOutcome::Removed { folder: "a".into() });
    assert_eq!(*h.watcher.unwatched.lock().unwrap(), vec![lock]);
    assert_eq!(h.watch.state().watched_count(), 1);
}

#[tokio::test]
async fn rescan_picks_up_new_folders() {
    let tree = two_projects();
    let mut h = harness(&tree, settings(false), Box::new(MemoryHashStore::new()));
    h.watch.rescan().unwrap();
    with_timeout(h.watch.cycle()).await.unwrap();

    let tree = tree.project("c", "c");
    assert_eq!(h.watch.rescan().unwrap(), 1);
    assert_eq!(
        h.watch.state().pending().cloned().collect::<Vec<_>>(),
        vec![PathBuf::from("c")]
    );
    assert!(h.watch.state().is_watched(&tree.path("c/yarn.lock")));
}

#[tokio::test]
async fn failed_folders_keep_no_baseline() {
    let tree = two_projects();
    let hashes = tempfile::tempdir().unwrap();
    let store = || -> Box<dyn HashStore> {
        Box::new(FileHashStore::new(hashes.path().to_path_buf(), Arc::new(RealFileSystem)))
    };

    {
        let mut h = harness(&tree, settings(false), store());
        for _ in 0..2 {
            h.spawner.script(
                tree.path("b"),
                monorun_test_utils::fake_spawner::Scripted::fail(1, "broken"),
            );
        }
        h.watch.rescan().unwrap();
        let report = with_timeout(h.watch.cycle()).await.unwrap().unwrap();
        assert_eq!(report.failed_folders(), vec![PathBuf::from("b")]);
    }

    // A new session starts from the stored hashes.
    let mut h = harness(&tree, settings(false), store());
    h.watch.rescan().unwrap();
    assert_eq!(
        h.watch.state().pending().cloned().collect::<Vec<_>>(),
        vec![PathBuf::from("b")]
    );
}

#[tokio::test]
async fn loop_ends_when_events_stop() {
    let tree = two_projects();
    let h = harness(&tree, settings(false), Box::new(MemoryHashStore::new()));
    drop(h.events);

    with_timeout(h.watch.run()).await.unwrap();
    assert!(h.spawner.runs().is_empty());
}

#[tokio::test]
async fn events_are_consumed_while_idle() {
    let tree = two_projects();
    let h = harness(&tree, settings(false), Box::new(MemoryHashStore::new()));
    let Harness {
        watch,
        coordinator,
        spawner,
        events,
        ..
    } = h;

    let handle = tokio::spawn(async move {
        let _ = watch.run().await;
    });

    // Wait for the startup cycle to finish both folders.
    with_timeout(async {
        while coordinator.completions().last(Path::new("a")).is_none()
            || coordinator.completions().last(Path::new("b")).is_none()
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    age_completion(&coordinator, "a");
    std::fs::write(tree.path("a/yarn.lock"), "# bump\n").unwrap();
    events.send(WatchEvent { path: tree.path("a/yarn.lock") }).unwrap();

    with_timeout(async {
        while spawner.runs_in(tree.path("a")) < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    drop(events);
    with_timeout(handle).await.unwrap();
}
