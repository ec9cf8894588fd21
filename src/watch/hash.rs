// src/watch/hash.rs

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;
use crate::types::HashStorageMode;

/// Directory (under the system temp dir) holding persisted file hashes.
pub const HASH_DIR_NAME: &str = "monorun-hashes";

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Side-file name for a watched path: the hash of the path itself.
pub fn path_key(path: &Path) -> String {
    blake3::hash(path.to_string_lossy().as_bytes())
        .to_hex()
        .to_string()
}

/// Abstract storage for the last hash a successful run saw per watched file.
pub trait HashStore: Send + Sync {
    fn load(&self, file: &Path) -> Result<Option<String>>;
    fn save(&mut self, file: &Path, hash: &str) -> Result<()>;
    fn forget(&mut self, file: &Path) -> Result<()>;
}

/// One side file per watched file, named by [`path_key`].
pub struct FileHashStore {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileHashStore {
    pub fn new(dir: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { dir, fs }
    }

    /// Store under `<tmp>/monorun-hashes`.
    pub fn in_temp_dir(fs: Arc<dyn FileSystem>) -> Self {
        Self::new(std::env::temp_dir().join(HASH_DIR_NAME), fs)
    }

    fn side_file(&self, file: &Path) -> PathBuf {
        self.dir.join(path_key(file))
    }
}

impl HashStore for FileHashStore {
    fn load(&self, file: &Path) -> Result<Option<String>> {
        let side = self.side_file(file);
        if !self.fs.is_file(&side) {
            return Ok(None);
        }
        let hash = self.fs.read_to_string(&side)?;
        let hash = hash.trim();
        Ok((!hash.is_empty()).then(|| hash.to_string()))
    }

    fn save(&mut self, file: &Path, hash: &str) -> Result<()> {
        let side = self.side_file(file);
        self.fs.write(&side, hash.as_bytes())?;
        debug!(?file, hash = %hash, "stored file hash (file)");
        Ok(())
    }

    fn forget(&mut self, file: &Path) -> Result<()> {
        self.fs.remove_file(&self.side_file(file))
    }
}

/// Stores hashes in memory only.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<PathBuf, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, file: &Path) -> Result<Option<String>> {
        Ok(self.map.get(file).cloned())
    }

    fn save(&mut self, file: &Path, hash: &str) -> Result<()> {
        self.map.insert(file.to_path_buf(), hash.to_string());
        debug!(?file, hash = %hash, "stored file hash (memory)");
        Ok(())
    }

    fn forget(&mut self, file: &Path) -> Result<()> {
        self.map.remove(file);
        Ok(())
    }
}

pub fn store_for_mode(mode: HashStorageMode, fs: Arc<dyn FileSystem>) -> Box<dyn HashStore> {
    match mode {
        HashStorageMode::File => Box::new(FileHashStore::in_temp_dir(fs)),
        HashStorageMode::Memory => Box::new(MemoryHashStore::new()),
    }
}
