// src/config/validate.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::CliArgs;
use crate::config::model::{
    FileConfig, ForceFlags, RunConfiguration, WatchSettings, DEFAULT_CONCURRENCY,
    DEFAULT_LOCK_MARKER, DEFAULT_MODULES_FOLDER, DEFAULT_WATCH_INTERVAL,
};
use crate::errors::{MonorunError, Result};
use crate::types::PackageManager;

impl RunConfiguration {
    /// Merge CLI flags over file defaults and validate the result.
    pub fn from_sources(cli: &CliArgs, file: &FileConfig, cwd: PathBuf) -> Result<Self> {
        let d = &file.defaults;

        let manager = if cli.npm || d.npm.unwrap_or(false) {
            PackageManager::Npm
        } else {
            PackageManager::Yarn
        };

        let mut include_folders = pick_list(&cli.include_folders, &d.include_folders);
        include_folders.extend(cli.in_folders.iter().cloned());
        let here = cli.here || !cli.in_folders.is_empty();

        // `--in` alone means "just these folders": no root scan.
        let folders = if cli.folders.is_empty() {
            if !cli.in_folders.is_empty() {
                Vec::new()
            } else {
                vec![".".to_string()]
            }
        } else {
            cli.folders.clone()
        };

        let watch = watch_settings(cli, d.watch_interval.as_deref())?;

        let cfg = RunConfiguration {
            cwd,
            command: cli.command.clone(),
            concurrency: cli.concurrency.or(d.concurrency).unwrap_or(DEFAULT_CONCURRENCY),
            fail_fast: cli.fail_fast,
            exit_on_error: !cli.no_exit_on_error,
            manager,
            folders: normalize_all(&folders),
            exclude_folders: normalize_all(&pick_list(&cli.exclude_folders, &d.exclude_folders)),
            include_folders: normalize_all(&include_folders),
            here,
            dot_folders: cli.dot_folders || d.dot_folders.unwrap_or(false),
            only_workspaces: cli.only_workspaces,
            modules_folder: d
                .modules_folder
                .clone()
                .unwrap_or_else(|| DEFAULT_MODULES_FOLDER.to_string()),
            lock_file: d
                .lock_file
                .clone()
                .unwrap_or_else(|| manager.lock_file().to_string()),
            cache_folder: cli
                .cache_folder
                .clone()
                .or_else(|| d.cache_folder.clone())
                .map(PathBuf::from),
            separate_cache_seed: cli
                .separate_cache_folders
                .clone()
                .or_else(|| d.separate_cache_folders.clone()),
            force: ForceFlags {
                install: cli.force,
                local: cli.force_local,
                remote: cli.force_remote,
            },
            link_files: cli.link_files,
            clean_up: cli.clean_up,
            lock_marker: cli.lock.as_deref().map(marker_name),
            lock_each: cli.lock_each.as_deref().map(marker_name),
            watch,
            dry_run: cli.dry_run,
        };

        validate(&cfg)?;
        Ok(cfg)
    }
}

fn watch_settings(cli: &CliArgs, file_interval: Option<&str>) -> Result<Option<WatchSettings>> {
    let (files, content_only) = match (&cli.watch, &cli.watch_content) {
        (_, Some(files)) => (files, true),
        (Some(files), None) => (files, false),
        (None, None) => return Ok(None),
    };
    let files: Vec<String> = files
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();

    let interval = match cli.watch_interval.as_deref().or(file_interval) {
        Some(s) => parse_duration(s).map_err(MonorunError::ConfigError)?,
        None => DEFAULT_WATCH_INTERVAL,
    };

    Ok(Some(WatchSettings {
        files,
        content_only,
        force_on_change: cli.watch_force,
        interval,
        hash_store: cli.watch_hash_store.unwrap_or_default(),
    }))
}

fn pick_list(cli: &[String], file: &[String]) -> Vec<String> {
    if cli.is_empty() {
        file.to_vec()
    } else {
        cli.to_vec()
    }
}

fn marker_name(raw: &str) -> String {
    if raw.trim().is_empty() {
        DEFAULT_LOCK_MARKER.to_string()
    } else {
        raw.trim().to_string()
    }
}

/// Normalise a user-given folder: forward slashes, no leading `./`, no
/// trailing separator; the root is `.`.
pub fn normalize_folder(raw: &str) -> PathBuf {
    let mut s = raw.trim().replace('\\', "/");
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    let s = s.trim_end_matches('/');
    if s.is_empty() || s == "." {
        PathBuf::from(".")
    } else {
        PathBuf::from(s)
    }
}

fn normalize_all(raw: &[String]) -> Vec<PathBuf> {
    raw.iter().map(|s| normalize_folder(s)).collect()
}

fn validate(cfg: &RunConfiguration) -> Result<()> {
    if cfg.concurrency == 0 {
        return Err(MonorunError::ConfigError(
            "concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    ensure_plain_name("lock file", &cfg.lock_file)?;
    ensure_plain_name("modules folder", &cfg.modules_folder)?;
    for marker in cfg.lock_marker.iter().chain(cfg.lock_each.iter()) {
        ensure_plain_name("lock marker", marker)?;
    }

    if let Some(watch) = &cfg.watch {
        if watch.interval.is_zero() {
            return Err(MonorunError::ConfigError(
                "watch interval must be greater than zero".to_string(),
            ));
        }
        for file in &watch.files {
            ensure_plain_name("watched file", file)?;
        }
    }

    if cfg.folders.is_empty() && cfg.include_folders.is_empty() {
        return Err(MonorunError::ConfigError(
            "no folders to process".to_string(),
        ));
    }

    Ok(())
}

fn ensure_plain_name(what: &str, name: &str) -> Result<()> {
    let path = Path::new(name);
    if name.is_empty() || path.components().count() != 1 || name == "." || name == ".." {
        return Err(MonorunError::ConfigError(format!(
            "{what} must be a plain file name (got '{name}')"
        )));
    }
    Ok(())
}

/// Parse a simple duration string like `"2500ms"`, `"3s"`, `"1m"`, `"2h"`.
///
/// A bare number is read as milliseconds.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s.chars().position(|c| !c.is_ascii_digit()).unwrap_or(s.len());

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "" | "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
