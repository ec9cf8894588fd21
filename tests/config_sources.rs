// tests/config_sources.rs

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use monorun::cli::CliArgs;
use monorun::config::{
    load_file_config, normalize_folder, parse_duration, FileConfig, RunConfiguration,
    DEFAULT_CONCURRENCY,
};
use monorun::errors::MonorunError;
use monorun::types::{HashStorageMode, PackageManager};

fn cli(args: &[&str]) -> CliArgs {
    CliArgs::try_parse_from(std::iter::once("monorun").chain(args.iter().copied())).unwrap()
}

fn build(args: &[&str], file: &FileConfig) -> Result<RunConfiguration, MonorunError> {
    RunConfiguration::from_sources(&cli(args), file, PathBuf::from("/repo"))
}

fn file(toml_src: &str) -> FileConfig {
    toml::from_str(toml_src).unwrap()
}

#[test]
fn defaults_without_any_flags() {
    let cfg = build(&[], &FileConfig::default()).unwrap();
    assert_eq!(cfg.concurrency, DEFAULT_CONCURRENCY);
    assert_eq!(cfg.manager, PackageManager::Yarn);
    assert_eq!(cfg.lock_file, "yarn.lock");
    assert_eq!(cfg.folders, vec![PathBuf::from(".")]);
    assert!(cfg.command.is_empty());
    assert!(cfg.exit_on_error);
    assert!(cfg.watch.is_none());
    assert!(cfg.lock_marker.is_none());
}

#[test]
fn trailing_words_become_the_command() {
    let cfg = build(&["--con", "3", "--npm", "install", "--save-dev", "jest"], &FileConfig::default())
        .unwrap();
    assert_eq!(cfg.concurrency, 3);
    assert_eq!(cfg.manager, PackageManager::Npm);
    assert_eq!(cfg.lock_file, "package-lock.json");
    assert_eq!(cfg.command, ["install", "--save-dev", "jest"]);
}

#[test]
fn folders_are_normalized() {
    let cfg = build(
        &["--folders", "./apps/", "--folders", "libs\\core", "--exclude-folders", "apps/legacy/"],
        &FileConfig::default(),
    )
    .unwrap();
    assert_eq!(cfg.folders, vec![PathBuf::from("apps"), PathBuf::from("libs/core")]);
    assert_eq!(cfg.exclude_folders, vec![PathBuf::from("apps/legacy")]);

    assert_eq!(normalize_folder("./"), PathBuf::from("."));
    assert_eq!(normalize_folder(""), PathBuf::from("."));
    assert_eq!(normalize_folder("././a//"), PathBuf::from("a"));
}

#[test]
fn in_means_include_and_here() {
    let cfg = build(&["--in", "a,b"], &FileConfig::default()).unwrap();
    assert!(cfg.here);
    assert!(cfg.folders.is_empty());
    assert_eq!(cfg.include_folders, vec![PathBuf::from("a"), PathBuf::from("b")]);
}

#[test]
fn lock_flags_take_optional_names() {
    let cfg = build(&["--lock", "--lock-each=busy"], &FileConfig::default()).unwrap();
    assert_eq!(cfg.lock_marker.as_deref(), Some(".monorun.lock"));
    assert_eq!(cfg.lock_each.as_deref(), Some("busy"));

    let err = build(&["--lock=../escape"], &FileConfig::default()).unwrap_err();
    assert!(matches!(err, MonorunError::ConfigError(_)));
}

#[test]
fn list_flags_leave_command_words_alone() {
    let cfg = build(&["--folders", "packages", "install"], &FileConfig::default()).unwrap();
    assert_eq!(cfg.folders, vec![PathBuf::from("packages")]);
    assert_eq!(cfg.command, ["install"]);

    let cfg = build(
        &["--exclude-folders", "legacy", "--in", "tools", "run", "build"],
        &FileConfig::default(),
    )
    .unwrap();
    assert_eq!(cfg.exclude_folders, vec![PathBuf::from("legacy")]);
    assert_eq!(cfg.include_folders, vec![PathBuf::from("tools")]);
    assert_eq!(cfg.command, ["run", "build"]);

    let cfg = build(&["--folders", "apps,libs", "--folders", "tools"], &FileConfig::default())
        .unwrap();
    assert_eq!(
        cfg.folders,
        vec![PathBuf::from("apps"), PathBuf::from("libs"), PathBuf::from("tools")]
    );
}

#[test]
fn optional_value_flags_leave_command_words_alone() {
    let cfg = build(&["--watch", "add", "lodash"], &FileConfig::default()).unwrap();
    assert!(cfg.watch.as_ref().unwrap().files.is_empty());
    assert_eq!(cfg.command, ["add", "lodash"]);

    let cfg = build(&["--watch-content", "install"], &FileConfig::default()).unwrap();
    assert!(cfg.watch.as_ref().unwrap().content_only);
    assert_eq!(cfg.command, ["install"]);

    let cfg = build(&["--lock", "--sep-cache", "install"], &FileConfig::default()).unwrap();
    assert_eq!(cfg.lock_marker.as_deref(), Some(".monorun.lock"));
    assert_eq!(cfg.separate_cache_seed.as_deref(), Some("monorun"));
    assert_eq!(cfg.command, ["install"]);

    let cfg = build(&["--watch=yarn.lock,package.json", "install"], &FileConfig::default())
        .unwrap();
    assert_eq!(cfg.watched_files(), ["yarn.lock", "package.json"]);
    assert_eq!(cfg.command, ["install"]);
}

#[test]
fn cli_wins_over_defaults_file() {
    let defaults = file(
        r#"
        [defaults]
        concurrency = 4
        exclude_folders = ["legacy"]
        separate_cache_folders = "ci"
        cache_folder = "/tmp/cache"
        "#,
    );

    let cfg = build(&[], &defaults).unwrap();
    assert_eq!(cfg.concurrency, 4);
    assert_eq!(cfg.exclude_folders, vec![PathBuf::from("legacy")]);
    assert_eq!(cfg.separate_cache_seed.as_deref(), Some("ci"));
    assert_eq!(cfg.cache_folder, Some(PathBuf::from("/tmp/cache")));

    let cfg = build(&["--concurrency", "2", "--exclude-folders", "old", "--sep-cache"], &defaults)
        .unwrap();
    assert_eq!(cfg.concurrency, 2);
    assert_eq!(cfg.exclude_folders, vec![PathBuf::from("old")]);
    assert_eq!(cfg.separate_cache_seed.as_deref(), Some("monorun"));
}

#[test]
fn unknown_defaults_keys_are_rejected() {
    let res: Result<FileConfig, _> = toml::from_str("[defaults]\nconcurency = 3\n");
    assert!(res.is_err());
}

#[test]
fn zero_concurrency_is_rejected() {
    let err = build(&["--concurrency", "0"], &FileConfig::default()).unwrap_err();
    assert!(err.to_string().contains("concurrency"));
}

#[test]
fn watch_settings_from_flags() {
    let cfg = build(&["--watch"], &FileConfig::default()).unwrap();
    let watch = cfg.watch.clone().unwrap();
    assert!(watch.files.is_empty());
    assert!(!watch.content_only);
    assert_eq!(watch.interval, Duration::from_millis(2500));
    assert_eq!(watch.hash_store, HashStorageMode::File);
    assert_eq!(cfg.watched_files(), ["yarn.lock"]);

    let cfg = build(
        &[
            "--watch-content=package.json",
            "--watch-interval",
            "5s",
            "--watch-hash-store",
            "memory",
            "--watch-force",
        ],
        &FileConfig::default(),
    )
    .unwrap();
    let watch = cfg.watch.clone().unwrap();
    assert!(watch.content_only);
    assert!(watch.force_on_change);
    assert_eq!(watch.interval, Duration::from_secs(5));
    assert_eq!(watch.hash_store, HashStorageMode::Memory);
    assert_eq!(cfg.watched_files(), ["package.json"]);
}

#[test]
fn npm_watches_the_manifest_by_default() {
    let cfg = build(&["--npm", "--watch"], &FileConfig::default()).unwrap();
    assert_eq!(cfg.watched_files(), ["package.json"]);
}

#[test]
fn bad_watch_interval_is_a_config_error() {
    assert!(build(&["--watch", "--watch-interval", "soon"], &FileConfig::default()).is_err());
    assert!(build(&["--watch", "--watch-interval", "0"], &FileConfig::default()).is_err());
}

#[test]
fn parse_duration_units() {
    assert_eq!(parse_duration("250").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_duration(" 3s ").unwrap(), Duration::from_secs(3));
    assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
    assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("5d").is_err());
    assert!(parse_duration("s").is_err());
}

#[test]
fn defaults_file_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_file_config(None, dir.path()).unwrap();
    assert!(cfg.defaults.concurrency.is_none());

    std::fs::write(dir.path().join(".monorun.toml"), "[defaults]\nnpm = true\n").unwrap();
    let cfg = load_file_config(None, dir.path()).unwrap();
    assert_eq!(cfg.defaults.npm, Some(true));

    let missing = dir.path().join("nope.toml");
    assert!(matches!(
        load_file_config(Some(missing.as_path()), dir.path()),
        Err(MonorunError::IoError(_))
    ));
}
