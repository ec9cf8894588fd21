// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{ArgAction, Parser, ValueEnum};

use crate::types::HashStorageMode;

/// Command-line arguments for `monorun`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "monorun",
    version,
    about = "Run a package-manager command in every project folder of a monorepo.",
    long_about = None
)]
pub struct CliArgs {
    /// Package-manager command words, e.g. `add lodash`.
    ///
    /// Empty means the manager's default install command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,

    /// Maximum number of folders processed at the same time.
    #[arg(long, alias = "con", value_name = "N")]
    pub concurrency: Option<usize>,

    /// Abort the whole run on the first failing folder.
    #[arg(long)]
    pub fail_fast: bool,

    /// Keep exit status 0 even when folders fail.
    #[arg(long)]
    pub no_exit_on_error: bool,

    /// Root folders to scan (default: `.`).
    ///
    /// Takes one value per occurrence; repeat the flag or separate with
    /// commas (`--folders apps,libs`).
    #[arg(long, action = ArgAction::Append, num_args = 1, value_delimiter = ',', value_name = "DIR")]
    pub folders: Vec<String>,

    /// Folders (path prefixes) left out of discovery.
    #[arg(long, action = ArgAction::Append, num_args = 1, value_delimiter = ',', value_name = "DIR")]
    pub exclude_folders: Vec<String>,

    /// Folders always processed, regardless of exclusion rules.
    #[arg(long, action = ArgAction::Append, num_args = 1, value_delimiter = ',', value_name = "DIR")]
    pub include_folders: Vec<String>,

    /// Do not scan recursively; use the given folders as they are.
    #[arg(long)]
    pub here: bool,

    /// Shorthand for `--include-folders <DIR> --here`.
    #[arg(
        long = "in",
        action = ArgAction::Append,
        num_args = 1,
        value_delimiter = ',',
        value_name = "DIR"
    )]
    pub in_folders: Vec<String>,

    /// Symlink `file:` dependencies into the modules folder after each run.
    #[arg(long, alias = "link-file")]
    pub link_files: bool,

    /// Use npm instead of yarn.
    #[arg(long)]
    pub npm: bool,

    /// Remove the modules folder before running.
    #[arg(long)]
    pub clean_up: bool,

    /// Write a lock marker in the working root for the whole run.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "", value_name = "NAME")]
    pub lock: Option<String>,

    /// Write a lock marker in each folder around its own run.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "", value_name = "NAME")]
    pub lock_each: Option<String>,

    /// Watch mode: re-run folders whose listed files change.
    ///
    /// Files are given as `--watch=yarn.lock,package.json`; a bare `--watch`
    /// watches the default set and leaves following words to the command.
    #[arg(
        long,
        action = ArgAction::Append,
        num_args = 0..=1,
        require_equals = true,
        value_delimiter = ',',
        value_name = "FILE"
    )]
    pub watch: Option<Vec<String>>,

    /// Like `--watch`, but ignores events that leave file content unchanged.
    #[arg(
        long,
        action = ArgAction::Append,
        num_args = 0..=1,
        require_equals = true,
        value_delimiter = ',',
        value_name = "FILE"
    )]
    pub watch_content: Option<Vec<String>>,

    /// Honour force flags on watch-triggered runs.
    #[arg(long)]
    pub watch_force: bool,

    /// Poll interval for watch mode (e.g. `2500ms`, `3s`).
    #[arg(long, value_name = "DURATION")]
    pub watch_interval: Option<String>,

    /// Where watched-file hashes are kept between sessions.
    #[arg(long, value_enum, value_name = "MODE")]
    pub watch_hash_store: Option<HashStorageMode>,

    /// Pass the manager's force flag.
    #[arg(long)]
    pub force: bool,

    /// Re-add every `file:` / `link:` dependency.
    #[arg(long)]
    pub force_local: bool,

    /// Re-add every git / URL dependency.
    #[arg(long)]
    pub force_remote: bool,

    /// Include hidden folders in discovery.
    #[arg(long)]
    pub dot_folders: bool,

    /// Explicit shared cache folder.
    #[arg(long, value_name = "DIR")]
    pub cache_folder: Option<String>,

    /// Give every folder its own cache partition, derived from this seed.
    #[arg(
        long,
        alias = "sep-cache",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "monorun",
        value_name = "SEED"
    )]
    pub separate_cache_folders: Option<String>,

    /// Only process folders declared as workspaces in the root manifest.
    #[arg(long)]
    pub only_workspaces: bool,

    /// Working root (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,

    /// Path to an optional TOML defaults file.
    ///
    /// Default: `.monorun.toml` in the working root, when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MONORUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve folders and print the commands, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
