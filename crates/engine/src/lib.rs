//! External engines driven by btrborg
//!
//! This crate provides:
//! - Mounted filesystem probing (filesystem type, mount point checks)
//! - btrfs snapshot creation, listing and deletion
//! - borg archive creation and pruning
//! - A command executor seam so every tool invocation can be recorded in tests

pub mod borg;
pub mod btrfs;
pub mod executor;
pub mod probe;

use btrborg_core::Result;
use retention::RetentionPolicy;
use std::path::Path;

// Re-exports
pub use borg::Borg;
pub use btrfs::Btrfs;
pub use executor::{CommandExecutor, SystemExecutor, ToolCommand, ToolOutput, ToolStatus};
pub use probe::{
    classify_mount, is_mount_point, supports_snapshots, MountEntry, MountTable, SNAPSHOT_FSTYPES,
};

/// Filesystem classification at a mount point
pub trait FilesystemProbe {
    /// Filesystem type of the single active mount at `mountpoint`
    fn classify(&self, mountpoint: &Path) -> Result<String>;

    /// Whether `path` is the root of a mounted filesystem
    fn is_mount_point(&self, path: &Path) -> bool;
}

/// Read-only snapshots of mounted subvolumes
pub trait SnapshotEngine {
    /// Subvolume path mounted at `mountpoint`
    fn subvolume_of(&self, mountpoint: &Path) -> Result<String>;

    /// Take a read-only snapshot of `mountpoint` at `destination`
    fn create(&self, mountpoint: &Path, destination: &Path) -> Result<()>;

    /// Names of the snapshots of `subvolume_name` under `snapshot_root`
    fn list(&self, snapshot_root: &Path, subvolume_name: &str) -> Result<Vec<String>>;

    /// Delete the snapshot at `path`
    fn delete(&self, path: &Path) -> Result<()>;
}

/// One backup run
#[derive(Debug, Clone, Copy)]
pub struct BackupRequest<'a> {
    /// Directory tree to archive (snapshot or live mount point)
    pub source: &'a Path,
    pub repository: &'a Path,
    pub excludes: &'a [String],
    /// Run under idle I/O and lowered CPU priority
    pub niced: bool,
}

/// Result of a backup run that managed to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStatus {
    Completed,
    /// `code` is `None` when the tool was killed by a signal
    Failed { code: Option<i32> },
}

/// Deduplicating archive storage
pub trait BackupEngine {
    /// Archive `request.source`; an unsuccessful run is reported, not raised
    fn backup(&self, request: &BackupRequest<'_>) -> Result<BackupStatus>;

    /// Thin out the repository's archives according to `policy`
    fn prune(&self, repository: &Path, policy: &RetentionPolicy, niced: bool) -> Result<()>;
}
