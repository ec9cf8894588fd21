// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(Vec<String>), // List of child names
    Link(PathBuf),
    /// Listed by its parent, but every stat fails.
    Unstatable,
}

#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

fn parent_or_dot(path: &Path) -> Option<&Path> {
    match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Some(Path::new(".")),
        other => other,
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.insert(path.as_ref(), MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut files = self.entries();
        Self::ensure_dir_entry(&mut files, path.as_ref());
    }

    /// Add an entry that shows up in listings but cannot be stat'ed.
    pub fn add_unstatable(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::Unstatable);
    }

    pub fn entry(&self, path: impl AsRef<Path>) -> Option<MockEntry> {
        self.entries().get(path.as_ref()).cloned()
    }

    fn insert(&self, path: &Path, entry: MockEntry) {
        let mut files = self.entries();
        files.insert(path.to_path_buf(), entry);
        if let Some(parent) = parent_or_dot(path) {
            Self::ensure_dir_entry(&mut files, parent);
            Self::link_child(&mut files, parent, path);
        }
    }

    fn link_child(files: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
        if let (Some(MockEntry::Dir(children)), Some(name)) =
            (files.get_mut(parent), child.file_name().and_then(|n| n.to_str()))
        {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }

    fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if files.contains_key(path) {
            return;
        }
        files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        if let Some(parent) = parent_or_dot(path) {
            if parent != path {
                Self::ensure_dir_entry(files, parent);
                Self::link_child(files, parent, path);
            }
        }
    }

    fn unlink(&self, path: &Path, recursive: bool) {
        let mut files = self.entries();
        if recursive {
            files.retain(|p, _| !p.starts_with(path));
        } else {
            files.remove(path);
        }
        if let (Some(parent), Some(name)) = (parent_or_dot(path), path.file_name()) {
            if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                children.retain(|c| std::ffi::OsStr::new(c) != name);
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.entries().get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(_) => Err(anyhow!("Not a file: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        match self.entries().get(path) {
            Some(MockEntry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(_) => Err(anyhow!("Not a file: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.entries().get(path), Some(MockEntry::File(_)))
    }

    fn stat_is_dir(&self, path: &Path) -> Result<bool> {
        match self.entries().get(path) {
            Some(MockEntry::Dir(_)) | Some(MockEntry::Link(_)) => Ok(true),
            Some(MockEntry::File(_)) => Ok(false),
            Some(MockEntry::Unstatable) => Err(anyhow!("Permission denied: {:?}", path)),
            None => Err(anyhow!("Not found: {:?}", path)),
        }
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // In mock, we just return the path as is, assuming absolute paths are used in tests
        Ok(path.to_path_buf())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.entries().get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.unlink(path, false);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.unlink(path, true);
        Ok(())
    }

    fn symlink_dir(&self, target: &Path, link: &Path) -> Result<()> {
        self.unlink(link, true);
        self.insert(link, MockEntry::Link(target.to_path_buf()));
        Ok(())
    }
}
