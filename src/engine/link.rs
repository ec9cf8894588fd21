// src/engine/link.rs

use std::path::Path;

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::manifest::{DependencyRef, PackageManifest};

/// Symlink every `file:` dependency of `manifest` into
/// `<folder>/<modules_folder>/<name>`.
///
/// Returns how many links were created. Individual failures are logged and
/// skipped.
pub fn link_file_dependencies(
    fs: &dyn FileSystem,
    folder: &Path,
    modules_folder: &str,
    manifest: &PackageManifest,
) -> usize {
    let mut linked = 0;

    for (name, dep) in manifest.dependencies_where(|d| matches!(d, DependencyRef::LocalFile(_))) {
        let DependencyRef::LocalFile(rel) = dep else {
            continue;
        };
        let target = folder.join(&rel);
        let target = fs.canonicalize(&target).unwrap_or(target);
        let link = folder.join(modules_folder).join(&name);

        match fs.symlink_dir(&target, &link) {
            Ok(()) => {
                debug!(dependency = %name, ?link, ?target, "linked file dependency");
                linked += 1;
            }
            Err(e) => warn!(dependency = %name, error = %e, "failed to link file dependency"),
        }
    }

    linked
}
