// src/manifest/mod.rs

//! `package.json` reading.
//!
//! Manifests are read fresh for every run; the package manager rewrites them
//! (and their lock files) behind our back.

pub mod deps;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{MonorunError, Result};
use crate::fs::FileSystem;

pub use deps::DependencyRef;

pub const MANIFEST_FILE: &str = "package.json";

/// The parts of `package.json` the orchestrator cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, String>,
    pub workspaces: Option<Workspaces>,
    /// Extra arguments for yarn runs in this folder.
    pub yarn: Option<ManagerExtras>,
}

/// `workspaces` is either a bare list of globs or `{ "packages": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Workspaces {
    Globs(Vec<String>),
    Detailed {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl Workspaces {
    pub fn patterns(&self) -> &[String] {
        match self {
            Workspaces::Globs(globs) => globs,
            Workspaces::Detailed { packages } => packages,
        }
    }
}

/// Manager-specific extras declared under the `"yarn"` key:
///
/// ```json
/// "yarn": { "args": ["--ignore-engines"], "flags": { "frozen-lockfile": true, "network-timeout": 60000 } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManagerExtras {
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub flags: BTreeMap<String, Value>,
}

impl ManagerExtras {
    /// Render extras as command-line arguments.
    ///
    /// `true` flags become `--name`, `false`/`null` are dropped, anything
    /// else becomes `--name value`.
    pub fn to_args(&self) -> Vec<String> {
        let mut out = self.args.clone();
        for (name, value) in &self.flags {
            let flag = format!("--{}", name.trim_start_matches('-'));
            match value {
                Value::Bool(true) => out.push(flag),
                Value::Bool(false) | Value::Null => {}
                Value::String(s) => {
                    out.push(flag);
                    out.push(s.clone());
                }
                other => {
                    out.push(flag);
                    out.push(other.to_string());
                }
            }
        }
        out
    }
}

impl PackageManifest {
    /// All declared dependencies across the regular, dev and optional maps.
    pub fn all_dependencies(&self) -> impl Iterator<Item = (&String, &String)> {
        self.dependencies
            .iter()
            .chain(self.dev_dependencies.iter())
            .chain(self.optional_dependencies.iter())
    }

    /// Dependencies whose reference matches `pred`, classified.
    pub fn dependencies_where<F>(&self, pred: F) -> Vec<(String, DependencyRef)>
    where
        F: Fn(&DependencyRef) -> bool,
    {
        self.all_dependencies()
            .map(|(name, spec)| (name.clone(), DependencyRef::classify(spec)))
            .filter(|(_, dep)| pred(dep))
            .collect()
    }
}

/// Read and parse `<folder>/package.json`.
pub fn read_manifest(fs: &dyn FileSystem, folder: &Path) -> Result<PackageManifest> {
    let path = folder.join(MANIFEST_FILE);
    let contents = fs.read_to_string(&path).map_err(|e| MonorunError::ManifestError {
        path: path.clone(),
        message: format!("{e:#}"),
    })?;
    parse_manifest(&path, &contents)
}

pub fn parse_manifest(path: &Path, contents: &str) -> Result<PackageManifest> {
    serde_json::from_str(contents).map_err(|e| MonorunError::ManifestError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
