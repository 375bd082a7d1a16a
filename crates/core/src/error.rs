//! Fatal errors and recoverable warnings
//!
//! A [`FatalError`] aborts the whole run. A [`Warning`] is recorded by the
//! run coordinator and the run carries on.

use crate::config::ConfigError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Broad class of a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Misconfiguration detected before or while resolving targets
    Configuration,
    /// Snapshot creation, listing or deletion failed
    Snapshot,
    /// Archive pruning failed
    ArchivePrune,
    /// An external tool could not be started
    Tool,
}

/// Conditions that abort the run
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("found {count} matching mounts for mountpoint {}, expected exactly one", .mountpoint.display())]
    AmbiguousMount { mountpoint: PathBuf, count: usize },

    #[error("{} is not a mountpoint", .path.display())]
    NotAMountPoint { path: PathBuf },

    #[error("snapshot directory {} must be a mountpoint", .path.display())]
    SnapshotRootNotMountPoint { path: PathBuf },

    #[error("failed to create snapshot directory {}", .path.display())]
    SnapshotRootCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to query subvolume of {}: {reason}", .mountpoint.display())]
    SubvolumeQuery { mountpoint: PathBuf, reason: String },

    #[error("failed to snapshot {} into {}: {reason}", .mountpoint.display(), .destination.display())]
    SnapshotCreate {
        mountpoint: PathBuf,
        destination: PathBuf,
        reason: String,
    },

    #[error("failed to list snapshots in {}", .root.display())]
    SnapshotList {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete snapshot {}: {reason}", .path.display())]
    SnapshotDelete { path: PathBuf, reason: String },

    #[error("snapshot {name} does not end in a valid timestamp")]
    MalformedSnapshotName { name: String },

    #[error("failed to prune archives in {}: {reason}", .repository.display())]
    ArchivePrune { repository: PathBuf, reason: String },

    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl FatalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FatalError::AmbiguousMount { .. }
            | FatalError::NotAMountPoint { .. }
            | FatalError::SnapshotRootNotMountPoint { .. }
            | FatalError::SnapshotRootCreate { .. }
            | FatalError::Config(_) => ErrorKind::Configuration,
            FatalError::SubvolumeQuery { .. }
            | FatalError::SnapshotCreate { .. }
            | FatalError::SnapshotList { .. }
            | FatalError::SnapshotDelete { .. }
            | FatalError::MalformedSnapshotName { .. } => ErrorKind::Snapshot,
            FatalError::ArchivePrune { .. } => ErrorKind::ArchivePrune,
            FatalError::Spawn { .. } => ErrorKind::Tool,
        }
    }
}

/// Conditions recorded and repeated at the end of the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The target's filesystem cannot be snapshotted; it gets a live backup
    UnsupportedFilesystem { mountpoint: PathBuf, fstype: String },
    /// The backup tool exited unsuccessfully (`code` is `None` when killed by a signal)
    BackupFailed { target: String, code: Option<i32> },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnsupportedFilesystem { mountpoint, fstype } => write!(
                f,
                "Filesystem type {} of mountpoint {} not supported, unable to create snapshot!",
                fstype,
                mountpoint.display()
            ),
            Warning::BackupFailed { target, code: Some(code) } => write!(
                f,
                "Backup of {} exited with non-zero exit code {}, check the logs!",
                target, code
            ),
            Warning::BackupFailed { target, code: None } => write!(
                f,
                "Backup of {} was terminated by a signal, check the logs!",
                target
            ),
        }
    }
}
