//! Mounted filesystem probing
//!
//! Filesystem types come from the disks `sysinfo` reports as mounted. A
//! target's mount point must match exactly one of them.

use crate::FilesystemProbe;
use btrborg_core::{FatalError, Result};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use sysinfo::{Disk, Disks};
use tracing::debug;

/// Filesystem types that can be snapshotted
pub const SNAPSHOT_FSTYPES: &[&str] = &["btrfs"];

/// Whether filesystems of type `fstype` can be snapshotted
pub fn supports_snapshots(fstype: &str) -> bool {
    SNAPSHOT_FSTYPES.contains(&fstype)
}

/// One mounted disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mountpoint: PathBuf,
    pub fstype: String,
}

impl From<&Disk> for MountEntry {
    fn from(disk: &Disk) -> Self {
        Self {
            device: disk.name().to_string_lossy().into_owned(),
            mountpoint: disk.mount_point().to_path_buf(),
            fstype: disk.file_system().to_string_lossy().into_owned(),
        }
    }
}

/// Probe backed by the system's list of mounted disks
///
/// The list is refreshed on every lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountTable;

impl MountTable {
    /// Currently mounted disks
    pub fn entries(&self) -> Vec<MountEntry> {
        Disks::new_with_refreshed_list()
            .iter()
            .map(MountEntry::from)
            .collect()
    }
}

impl FilesystemProbe for MountTable {
    fn classify(&self, mountpoint: &Path) -> Result<String> {
        classify_mount(&self.entries(), mountpoint)
    }

    fn is_mount_point(&self, path: &Path) -> bool {
        is_mount_point(path)
    }
}

/// Filesystem type of the single entry mounted exactly at `mountpoint`
pub fn classify_mount(entries: &[MountEntry], mountpoint: &Path) -> Result<String> {
    let matching: Vec<&MountEntry> = entries
        .iter()
        .filter(|entry| entry.mountpoint == mountpoint)
        .collect();

    let [entry] = matching.as_slice() else {
        return Err(FatalError::AmbiguousMount {
            mountpoint: mountpoint.to_path_buf(),
            count: matching.len(),
        });
    };

    debug!(
        "{} is {} on {}",
        mountpoint.display(),
        entry.fstype,
        entry.device
    );
    Ok(entry.fstype.clone())
}

/// Whether `path` is the root of a mounted filesystem
///
/// True when `path` is a real directory (not a symlink) whose device differs
/// from its parent's, or which is its own parent (`/`).
pub fn is_mount_point(path: &Path) -> bool {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(_) => return false,
    };
    if meta.file_type().is_symlink() {
        return false;
    }

    let parent = match std::fs::metadata(path.join("..")) {
        Ok(parent) => parent,
        Err(_) => return false,
    };

    meta.dev() != parent.dev() || meta.ino() == parent.ino()
}
