// src/discover/workspaces.rs

use std::path::Path;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Compiled `workspaces` globs of the root manifest.
///
/// Patterns are matched against folder paths relative to the working root,
/// with forward slashes (e.g. `"packages/app"`).
#[derive(Debug, Clone)]
pub struct WorkspaceMatcher {
    set: GlobSet,
    patterns: Vec<String>,
}

impl WorkspaceMatcher {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut cleaned = Vec::with_capacity(patterns.len());

        for raw in patterns {
            let pattern = raw.trim().trim_start_matches("./").trim_end_matches('/');
            if pattern.is_empty() {
                continue;
            }
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid workspace pattern '{raw}'"))?;
            builder.add(glob);
            cleaned.push(pattern.to_string());
        }

        let set = builder.build().context("building workspace glob set")?;
        Ok(Self {
            set,
            patterns: cleaned,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, folder: &Path) -> bool {
        let rel = folder.to_string_lossy().replace('\\', "/");
        self.set.is_match(rel.as_str())
    }
}
