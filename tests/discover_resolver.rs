// tests/discover_resolver.rs

use std::path::PathBuf;
use std::sync::Arc;

use monorun::config::RunConfiguration;
use monorun::discover::{is_excluded, sort_folders, FolderResolver};
use monorun::fs::mock::MockFileSystem;
use monorun::types::PackageManager;
use monorun_test_utils::builders::manifest;
use monorun_test_utils::init_tracing;

const ROOT: &str = "/repo";

fn project(fs: &MockFileSystem, rel: &str) {
    let dir = if rel == "." {
        PathBuf::from(ROOT)
    } else {
        PathBuf::from(ROOT).join(rel)
    };
    fs.add_file(dir.join("package.json"), manifest(rel));
    fs.add_file(dir.join("yarn.lock"), "");
}

fn resolver(fs: &MockFileSystem, edit: impl FnOnce(&mut RunConfiguration)) -> FolderResolver {
    let mut config = RunConfiguration::with_defaults(ROOT);
    edit(&mut config);
    FolderResolver::new(Arc::new(fs.clone()), Arc::new(config))
}

fn paths(list: &[&str]) -> Vec<PathBuf> {
    list.iter().map(PathBuf::from).collect()
}

#[test]
fn yarn_mode_requires_lock_file() {
    init_tracing();
    let fs = MockFileSystem::new();
    project(&fs, ".");
    project(&fs, "a");
    fs.add_file("/repo/b/package.json", manifest("b"));

    let folders = resolver(&fs, |_| {}).resolve().unwrap();
    assert_eq!(folders, paths(&[".", "a"]));
}

#[test]
fn npm_mode_only_needs_manifest() {
    let fs = MockFileSystem::new();
    project(&fs, "a");
    fs.add_file("/repo/b/package.json", manifest("b"));

    let folders = resolver(&fs, |c| {
        c.manager = PackageManager::Npm;
        c.lock_file = "package-lock.json".into();
    })
    .resolve()
    .unwrap();
    assert_eq!(folders, paths(&["a", "b"]));
}

#[test]
fn skips_modules_and_hidden_folders() {
    let fs = MockFileSystem::new();
    project(&fs, "a");
    project(&fs, "a/node_modules/dep");
    project(&fs, ".cache/pkg");

    let folders = resolver(&fs, |_| {}).resolve().unwrap();
    assert_eq!(folders, paths(&["a"]));

    let with_dots = resolver(&fs, |c| c.dot_folders = true).resolve().unwrap();
    assert_eq!(with_dots, paths(&["a", ".cache/pkg"]));
}

#[test]
fn exclusion_is_by_whole_segment_prefix() {
    let fs = MockFileSystem::new();
    project(&fs, "pkg");
    project(&fs, "pkg/inner");
    project(&fs, "pkg2");

    let folders = resolver(&fs, |c| c.exclude_folders = paths(&["pkg"]))
        .resolve()
        .unwrap();
    assert_eq!(folders, paths(&["pkg2"]));

    assert!(is_excluded(&PathBuf::from("a/b"), &paths(&["a"])));
    assert!(is_excluded(&PathBuf::from("a"), &paths(&["a"])));
    assert!(!is_excluded(&PathBuf::from("a/bc"), &paths(&["a/b"])));
}

#[test]
fn unstatable_entries_do_not_abort_discovery() {
    let fs = MockFileSystem::new();
    project(&fs, "a");
    fs.add_unstatable("/repo/broken");
    project(&fs, "z");

    let folders = resolver(&fs, |_| {}).resolve().unwrap();
    assert_eq!(folders, paths(&["a", "z"]));
}

#[test]
fn parents_come_before_children() {
    let fs = MockFileSystem::new();
    project(&fs, "a/b/c");
    project(&fs, "zz");
    project(&fs, "a");
    project(&fs, "a/b");

    let folders = resolver(&fs, |_| {}).resolve().unwrap();
    assert_eq!(folders, paths(&["a", "zz", "a/b", "a/b/c"]));

    let mut manual = paths(&["long/path", "b", ".", "a/b", "ab"]);
    sort_folders(&mut manual);
    assert_eq!(manual, paths(&[".", "b", "ab", "a/b", "long/path"]));
}

#[test]
fn include_folders_are_appended_once() {
    let fs = MockFileSystem::new();
    project(&fs, "a");
    fs.add_dir("/repo/extra");

    let folders = resolver(&fs, |c| c.include_folders = paths(&["extra", "a"]))
        .resolve()
        .unwrap();
    assert_eq!(folders, paths(&["a", "extra"]));
}

#[test]
fn here_mode_uses_roots_without_scanning() {
    let fs = MockFileSystem::new();
    project(&fs, "a");
    project(&fs, "b");

    let folders = resolver(&fs, |c| {
        c.here = true;
        c.folders = paths(&["b", "a", "skip/me"]);
        c.exclude_folders = paths(&["skip"]);
    })
    .resolve()
    .unwrap();
    assert_eq!(folders, paths(&["a", "b"]));
}

#[test]
fn workspace_mode_returns_root_first_then_members() {
    let fs = MockFileSystem::new();
    fs.add_file(
        "/repo/package.json",
        r#"{ "name": "root", "workspaces": ["packages/*"] }"#,
    );
    fs.add_file("/repo/packages/a/package.json", manifest("a"));
    fs.add_file("/repo/packages/b/package.json", manifest("b"));
    fs.add_file("/repo/packages/b/nested/package.json", manifest("nested"));
    fs.add_file("/repo/tools/x/package.json", manifest("x"));

    let mut resolver = resolver(&fs, |c| c.only_workspaces = true);

    assert_eq!(resolver.resolve().unwrap(), paths(&["."]));
    assert_eq!(
        resolver.resolve().unwrap(),
        paths(&[".", "packages/a", "packages/b"])
    );
}

#[test]
fn workspace_mode_without_declaration_keeps_root() {
    let fs = MockFileSystem::new();
    fs.add_file("/repo/package.json", manifest("root"));
    fs.add_file("/repo/packages/a/package.json", manifest("a"));

    let mut resolver = resolver(&fs, |c| c.only_workspaces = true);
    resolver.resolve().unwrap();
    assert_eq!(resolver.resolve().unwrap(), paths(&["."]));
}
