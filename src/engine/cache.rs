// src/engine/cache.rs

//! Cache-folder bookkeeping and corruption detection.
//!
//! Concurrent installs sharing one cache can leave a half-written entry
//! behind. The failing process then reports either a path inside the cache
//! folder or a "Bad hash" message; [`CacheRecovery::diagnose`] turns that
//! text into the cleanup to do before the sequential retry.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::errors::{MonorunError, Result};

/// Marker text for a corrupted archive in the cache.
pub const BAD_HASH_MESSAGE: &str = "Bad hash";

/// Memoised `cache override -> resolved cache directory` mapping.
///
/// Lives as long as the coordinator that owns it; many folders sharing one
/// partition only pay for one resolution. The map lock only guards the
/// per-key slots, so different keys resolve concurrently while callers of
/// the same key wait on a single resolution.
#[derive(Debug, Default)]
pub struct CacheDirRegistry {
    resolved: Mutex<HashMap<Option<PathBuf>, Arc<OnceCell<PathBuf>>>>,
}

impl CacheDirRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the resolved directory for `key`, calling `resolve` only the
    /// first time a key is seen.
    ///
    /// A failed resolution is not remembered; the next caller retries it.
    pub async fn get_or_resolve<F, Fut>(&self, key: Option<&Path>, resolve: F) -> Result<PathBuf>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PathBuf>>,
    {
        let key = key.map(Path::to_path_buf);
        let slot = {
            let mut resolved = self.resolved.lock().await;
            Arc::clone(resolved.entry(key.clone()).or_default())
        };

        let dir = slot
            .get_or_try_init(|| async {
                let dir = resolve().await?;
                debug!(key = ?key, dir = ?dir, "resolved cache folder");
                Ok::<_, MonorunError>(dir)
            })
            .await?;
        Ok(dir.clone())
    }

    async fn resolved_pairs(&self) -> Vec<(Option<PathBuf>, PathBuf)> {
        let resolved = self.resolved.lock().await;
        resolved
            .iter()
            .filter_map(|(key, slot)| slot.get().map(|dir| (key.clone(), dir.clone())))
            .collect()
    }

    /// Number of distinct keys resolved so far.
    pub async fn len(&self) -> usize {
        self.resolved_pairs().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every directory known to hold cache entries: overrides and their
    /// resolutions, longest first so nested paths win.
    pub async fn known_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = BTreeSet::new();
        for (key, dir) in self.resolved_pairs().await {
            dirs.extend(key);
            dirs.insert(dir);
        }
        let mut dirs: Vec<PathBuf> = dirs.into_iter().collect();
        dirs.sort_by_key(|d| std::cmp::Reverse(d.as_os_str().len()));
        dirs
    }
}

/// Per-folder cache partition under `base`, stable for a given seed.
pub fn partition_dir(base: &Path, seed: &str, folder: &Path) -> PathBuf {
    let mut hasher = blake3::Hasher::new();
    hasher.update(seed.as_bytes());
    hasher.update(&[0]);
    hasher.update(folder.to_string_lossy().as_bytes());
    let hex = hasher.finalize().to_hex();
    base.join(&hex.as_str()[..16])
}

/// Cleanup to perform before retrying a failed folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheRecovery {
    /// Delete this cache sub-directory.
    RemoveEntry(PathBuf),
    /// Clean the cache entries of these packages.
    CleanPackages(Vec<String>),
    Nothing,
}

static TARBALL_PACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s/]+/((?:@[^/\s]+/)?[^/\s@]+)/-/")
        .expect("tarball URL pattern is valid")
});

impl CacheRecovery {
    /// Inspect failure output for signs of cache corruption.
    ///
    /// An embedded path below any of `cache_dirs` wins over a "Bad hash"
    /// message.
    pub fn diagnose(error: &str, cache_dirs: &[PathBuf]) -> Self {
        for dir in cache_dirs {
            if let Some(entry) = find_cache_entry(error, dir) {
                return CacheRecovery::RemoveEntry(entry);
            }
        }

        if error.contains(BAD_HASH_MESSAGE) {
            let mut names: Vec<String> = Vec::new();
            for caps in TARBALL_PACKAGE.captures_iter(error) {
                let name = caps[1].to_string();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            if !names.is_empty() {
                return CacheRecovery::CleanPackages(names);
            }
        }

        CacheRecovery::Nothing
    }
}

/// Find `<cache_dir>/<entry>` inside `error` and return that entry's path.
pub fn find_cache_entry(error: &str, cache_dir: &Path) -> Option<PathBuf> {
    let prefix = cache_dir.to_string_lossy();
    let prefix = prefix.trim_end_matches(['/', '\\']);
    if prefix.is_empty() {
        return None;
    }

    let pattern = format!(r#"{}[/\\]([^/\\\s'"`:,;()]+)"#, regex::escape(prefix));
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(error)?;
    Some(cache_dir.join(&caps[1]))
}
