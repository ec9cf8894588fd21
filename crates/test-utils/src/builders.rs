use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use monorun::config::RunConfiguration;
use tempfile::TempDir;

/// A `package.json` body with just a name.
pub fn manifest(name: &str) -> String {
    format!(r#"{{ "name": "{name}", "version": "1.0.0" }}"#)
}

/// Builder for an on-disk monorepo in a temporary directory.
///
/// Example:
/// ```ignore
/// let tree = ProjectTree::new()
///     .project(".", "root")
///     .project("packages/a", "a")
///     .plain("packages/scratch");
/// ```
pub struct ProjectTree {
    dir: TempDir,
}

impl Default for ProjectTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectTree {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        if rel == "." {
            self.root().to_path_buf()
        } else {
            self.root().join(rel)
        }
    }

    /// A folder with `package.json` and `yarn.lock`.
    pub fn project(self, rel: &str, name: &str) -> Self {
        self.file(rel, "package.json", &manifest(name))
            .file(rel, "yarn.lock", "# yarn lockfile v1\n")
    }

    /// A folder with only a `package.json`.
    pub fn manifest_only(self, rel: &str, body: &str) -> Self {
        self.file(rel, "package.json", body)
    }

    /// A folder with no project files at all.
    pub fn plain(self, rel: &str) -> Self {
        fs::create_dir_all(self.path(rel)).expect("create folder");
        self
    }

    pub fn file(self, rel: &str, name: &str, contents: &str) -> Self {
        let dir = self.path(rel);
        fs::create_dir_all(&dir).expect("create folder");
        fs::write(dir.join(name), contents).expect("write file");
        self
    }

    /// Default configuration rooted at this tree.
    pub fn config(&self) -> RunConfiguration {
        RunConfiguration::with_defaults(self.root())
    }

    pub fn shared_config(&self, edit: impl FnOnce(&mut RunConfiguration)) -> Arc<RunConfiguration> {
        let mut config = self.config();
        edit(&mut config);
        Arc::new(config)
    }
}
