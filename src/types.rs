/// Which package manager executable drives each folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageManager {
    #[default]
    Yarn,
    Npm,
}

impl PackageManager {
    pub fn program(self) -> &'static str {
        match self {
            PackageManager::Yarn => "yarn",
            PackageManager::Npm => "npm",
        }
    }

    /// Arguments used when no explicit command was given.
    ///
    /// A bare `yarn` installs; npm needs the verb spelled out.
    pub fn default_command(self) -> Vec<String> {
        match self {
            PackageManager::Yarn => Vec::new(),
            PackageManager::Npm => vec!["install".to_string()],
        }
    }

    pub fn add_verb(self) -> &'static str {
        match self {
            PackageManager::Yarn => "add",
            PackageManager::Npm => "install",
        }
    }

    pub fn lock_file(self) -> &'static str {
        match self {
            PackageManager::Yarn => "yarn.lock",
            PackageManager::Npm => "package-lock.json",
        }
    }

    pub fn cache_folder_flag(self) -> &'static str {
        match self {
            PackageManager::Yarn => "--cache-folder",
            PackageManager::Npm => "--cache",
        }
    }

    pub fn force_flag(self) -> &'static str {
        "--force"
    }

    /// Command printing the active cache directory on stdout.
    pub fn cache_dir_query(self, cache_override: Option<&str>) -> Vec<String> {
        match self {
            PackageManager::Yarn => {
                let mut args = vec!["cache".to_string(), "dir".to_string()];
                if let Some(dir) = cache_override {
                    args.push(self.cache_folder_flag().to_string());
                    args.push(dir.to_string());
                }
                args
            }
            PackageManager::Npm => vec!["config".into(), "get".into(), "cache".into()],
        }
    }

    /// Command removing a single dependency's cache entry.
    ///
    /// npm has no per-package cache removal, so the whole cache is verified
    /// instead.
    pub fn cache_clean_command(self, name: &str) -> Vec<String> {
        match self {
            PackageManager::Yarn => vec!["cache".into(), "clean".into(), name.to_string()],
            PackageManager::Npm => vec!["cache".into(), "verify".into()],
        }
    }
}

/// Mode for storing watched-file hashes between watch sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HashStorageMode {
    /// One side file per watched file under the temp directory.
    #[default]
    File,
    /// Store hashes in memory only (lost on restart).
    Memory,
}
