//! Backup target configuration file
//!
//! The file is a JSON object mapping target names to their settings:
//!
//! ```json
//! {
//!     "root": { "mountpoint": "/", "repository": "root.borg", "excludes": ["/var/cache"] },
//!     "home": { "mountpoint": "/home", "repository": "/mnt/backup/home.borg" }
//! }
//! ```
//!
//! Targets keep the order they have in the file.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors while loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file {} is not a JSON object of targets", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid target '{name}' in {}", .path.display())]
    Target {
        name: String,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings of one target, as written in the file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetConfig {
    pub mountpoint: PathBuf,
    pub repository: PathBuf,
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl TargetConfig {
    /// Same settings with the repository made absolute against `config_dir`
    pub fn normalized(self, config_dir: &Path) -> Self {
        Self {
            repository: resolve_repository(config_dir, &self.repository),
            ..self
        }
    }
}

/// A target name with its settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTarget {
    pub name: String,
    pub config: TargetConfig,
}

/// Loaded configuration file
#[derive(Debug, Clone)]
pub struct TargetsFile {
    /// Canonical path of the file
    pub path: PathBuf,
    /// Directory relative repositories are resolved against
    pub dir: PathBuf,
    /// Targets in file order, repositories already absolute
    pub targets: Vec<NamedTarget>,
}

impl TargetsFile {
    /// Load and normalize the configuration at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let canonical = std::fs::canonicalize(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let dir = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        debug!("Loading config from {}", canonical.display());
        let contents = std::fs::read_to_string(&canonical).map_err(|source| ConfigError::Read {
            path: canonical.clone(),
            source,
        })?;

        let targets = parse_targets(&contents, &canonical)?
            .into_iter()
            .map(|target| NamedTarget {
                config: target.config.normalized(&dir),
                name: target.name,
            })
            .collect();

        Ok(Self {
            path: canonical,
            dir,
            targets,
        })
    }
}

/// Parse the target map, keeping file order
pub fn parse_targets(contents: &str, path: &Path) -> Result<Vec<NamedTarget>, ConfigError> {
    let map: Map<String, Value> =
        serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    map.into_iter()
        .map(|(name, value)| {
            let config = serde_json::from_value(value).map_err(|source| ConfigError::Target {
                name: name.clone(),
                path: path.to_path_buf(),
                source,
            })?;
            Ok(NamedTarget { name, config })
        })
        .collect()
}

/// Make a repository path absolute
///
/// Relative paths are joined onto `config_dir`, then canonicalized when the
/// path exists, or cleaned of `.`/`..` components when it does not yet.
pub fn resolve_repository(config_dir: &Path, repository: &Path) -> PathBuf {
    if repository.is_absolute() {
        return repository.to_path_buf();
    }

    let joined = config_dir.join(repository);
    std::fs::canonicalize(&joined).unwrap_or_else(|_| normalize_lexically(&joined))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
