// tests/manifest_deps.rs

use std::path::{Path, PathBuf};

use monorun::errors::MonorunError;
use monorun::fs::mock::MockFileSystem;
use monorun::manifest::{parse_manifest, read_manifest, DependencyRef, Workspaces};

#[test]
fn classifies_local_references() {
    assert_eq!(
        DependencyRef::classify("file:../shared"),
        DependencyRef::LocalFile(PathBuf::from("../shared"))
    );
    assert_eq!(
        DependencyRef::classify("link:./ui"),
        DependencyRef::LocalLink(PathBuf::from("./ui"))
    );
}

#[test]
fn classifies_remote_references() {
    for spec in [
        "git+ssh://git@github.com/me/repo.git",
        "git://github.com/me/repo",
        "git@github.com:me/repo.git",
        "github:me/repo",
        "gitlab:me/repo#v1",
        "me/repo",
        "me/repo#semver:^2",
        "https://github.com/me/repo.git#main",
    ] {
        assert!(
            matches!(DependencyRef::classify(spec), DependencyRef::RemoteGit(_)),
            "{spec} should be git"
        );
    }

    assert_eq!(
        DependencyRef::classify("https://example.com/pkg-1.0.0.tgz"),
        DependencyRef::RemoteUrl("https://example.com/pkg-1.0.0.tgz".into())
    );
}

#[test]
fn registry_specs_stay_registry() {
    for spec in ["^1.2.3", "latest", "~0.1", "npm:other@1", "npm:@scope/pkg@2", "1.0.0 - 2.0.0"] {
        let dep = DependencyRef::classify(spec);
        assert!(matches!(dep, DependencyRef::Registry(_)), "{spec}");
        assert!(!dep.is_local() && !dep.is_remote());
        assert_eq!(dep.to_spec(), spec);
    }
}

#[test]
fn spec_round_trips_for_add_commands() {
    assert_eq!(DependencyRef::classify("file:../a").to_spec(), "file:../a");
    assert_eq!(DependencyRef::classify("link:b").to_spec(), "link:b");
}

#[test]
fn parses_workspaces_in_both_shapes() {
    let flat = parse_manifest(Path::new("p"), r#"{ "workspaces": ["packages/*"] }"#).unwrap();
    assert_eq!(flat.workspaces.unwrap().patterns(), ["packages/*"]);

    let detailed = parse_manifest(
        Path::new("p"),
        r#"{ "workspaces": { "packages": ["apps/*", "libs/*"], "nohoist": ["**/x"] } }"#,
    )
    .unwrap();
    let ws = detailed.workspaces.unwrap();
    assert!(matches!(ws, Workspaces::Detailed { .. }));
    assert_eq!(ws.patterns(), ["apps/*", "libs/*"]);
}

#[test]
fn collects_dependencies_from_every_section() {
    let m = parse_manifest(
        Path::new("p"),
        r#"{
            "dependencies": { "a": "file:../a" },
            "devDependencies": { "b": "^1" },
            "optionalDependencies": { "c": "github:x/c" }
        }"#,
    )
    .unwrap();

    let names: Vec<&String> = m.all_dependencies().map(|(n, _)| n).collect();
    assert_eq!(names, ["a", "b", "c"]);

    let remote = m.dependencies_where(DependencyRef::is_remote);
    assert_eq!(remote, vec![("c".to_string(), DependencyRef::RemoteGit("github:x/c".into()))]);
}

#[test]
fn missing_or_invalid_manifest_is_reported_with_path() {
    let fs = MockFileSystem::new();
    fs.add_file("/r/bad/package.json", "{");

    match read_manifest(&fs, Path::new("/r/missing")) {
        Err(MonorunError::ManifestError { path, .. }) => {
            assert_eq!(path, PathBuf::from("/r/missing/package.json"))
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        read_manifest(&fs, Path::new("/r/bad")),
        Err(MonorunError::ManifestError { .. })
    ));
}
