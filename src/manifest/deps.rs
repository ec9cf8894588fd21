// src/manifest/deps.rs

//! Classification of dependency specifiers.

use std::path::PathBuf;

/// What a dependency specifier in `package.json` points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyRef {
    /// `file:../shared`
    LocalFile(PathBuf),
    /// `link:../shared`
    LocalLink(PathBuf),
    /// `git+ssh://...`, `github:user/repo`, `user/repo#tag`, `...repo.git`
    RemoteGit(String),
    /// `https://host/pkg.tgz`
    RemoteUrl(String),
    /// A registry version or range such as `^1.2.0`, `latest`, `npm:other@1`.
    Registry(String),
}

impl DependencyRef {
    pub fn classify(spec: &str) -> Self {
        let spec = spec.trim();

        if let Some(path) = spec.strip_prefix("file:") {
            return DependencyRef::LocalFile(PathBuf::from(path));
        }
        if let Some(path) = spec.strip_prefix("link:") {
            return DependencyRef::LocalLink(PathBuf::from(path));
        }

        const GIT_PREFIXES: [&str; 7] = [
            "git+", "git://", "git@", "github:", "gitlab:", "bitbucket:", "gist:",
        ];
        if GIT_PREFIXES.iter().any(|p| spec.starts_with(p)) || is_github_shorthand(spec) {
            return DependencyRef::RemoteGit(spec.to_string());
        }

        if spec.starts_with("http://") || spec.starts_with("https://") {
            let without_fragment = spec.split('#').next().unwrap_or(spec);
            if without_fragment.ends_with(".git") {
                return DependencyRef::RemoteGit(spec.to_string());
            }
            return DependencyRef::RemoteUrl(spec.to_string());
        }

        DependencyRef::Registry(spec.to_string())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, DependencyRef::LocalFile(_) | DependencyRef::LocalLink(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, DependencyRef::RemoteGit(_) | DependencyRef::RemoteUrl(_))
    }

    /// Specifier as written in the manifest, for use in `add name@spec`.
    pub fn to_spec(&self) -> String {
        match self {
            DependencyRef::LocalFile(p) => format!("file:{}", p.display()),
            DependencyRef::LocalLink(p) => format!("link:{}", p.display()),
            DependencyRef::RemoteGit(s) | DependencyRef::RemoteUrl(s) | DependencyRef::Registry(s) => {
                s.clone()
            }
        }
    }
}

/// `user/repo` or `user/repo#ref`, but not a scoped alias like `npm:@a/b`.
fn is_github_shorthand(spec: &str) -> bool {
    let body = spec.split('#').next().unwrap_or(spec);
    let mut parts = body.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(user), Some(repo), None) => {
            !user.is_empty()
                && !repo.is_empty()
                && !user.starts_with('@')
                && !user.starts_with('.')
                && !user.contains(':')
                && user
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        }
        _ => false,
    }
}
