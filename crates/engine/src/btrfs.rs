//! btrfs subvolume snapshots

use crate::executor::{CommandExecutor, ToolCommand};
use crate::probe::is_mount_point;
use crate::SnapshotEngine;
use btrborg_core::{match_snapshot, FatalError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default location of the btrfs tool
pub const DEFAULT_BTRFS: &str = "/usr/bin/btrfs";

/// Snapshot engine driving the `btrfs` command line tool
#[derive(Debug, Clone)]
pub struct Btrfs<E> {
    binary: PathBuf,
    executor: E,
}

impl<E: CommandExecutor> Btrfs<E> {
    pub fn new(binary: impl Into<PathBuf>, executor: E) -> Self {
        Self {
            binary: binary.into(),
            executor,
        }
    }

    fn subvolume_command(&self) -> ToolCommand {
        ToolCommand::new(&self.binary).arg("subvolume")
    }

    fn spawn_error(&self, source: std::io::Error) -> FatalError {
        FatalError::Spawn {
            program: self.binary.display().to_string(),
            source,
        }
    }
}

impl<E: CommandExecutor> SnapshotEngine for Btrfs<E> {
    fn subvolume_of(&self, mountpoint: &Path) -> Result<String> {
        if !is_mount_point(mountpoint) {
            return Err(FatalError::NotAMountPoint {
                path: mountpoint.to_path_buf(),
            });
        }

        let command = self.subvolume_command().arg("show").arg(mountpoint);
        let output = self
            .executor
            .output(&command)
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.is_success() {
            return Err(FatalError::SubvolumeQuery {
                mountpoint: mountpoint.to_path_buf(),
                reason: output.status.to_string(),
            });
        }

        // First line of `btrfs subvolume show` is the subvolume path
        match output.stdout.lines().next().map(str::trim) {
            Some(subvolume) if !subvolume.is_empty() => {
                debug!("{} is subvolume {}", mountpoint.display(), subvolume);
                Ok(subvolume.to_string())
            }
            _ => Err(FatalError::SubvolumeQuery {
                mountpoint: mountpoint.to_path_buf(),
                reason: "no subvolume reported".to_string(),
            }),
        }
    }

    fn create(&self, mountpoint: &Path, destination: &Path) -> Result<()> {
        info!(
            "Snapshotting {} into {} ...",
            mountpoint.display(),
            destination.display()
        );

        let command = self
            .subvolume_command()
            .args(["snapshot", "-r"])
            .arg(mountpoint)
            .arg(destination);
        let status = self
            .executor
            .status(&command)
            .map_err(|e| self.spawn_error(e))?;

        if status.is_success() {
            Ok(())
        } else {
            Err(FatalError::SnapshotCreate {
                mountpoint: mountpoint.to_path_buf(),
                destination: destination.to_path_buf(),
                reason: status.to_string(),
            })
        }
    }

    fn list(&self, snapshot_root: &Path, subvolume_name: &str) -> Result<Vec<String>> {
        let list_error = |source| FatalError::SnapshotList {
            root: snapshot_root.to_path_buf(),
            source,
        };

        let mut names = Vec::new();
        for entry in std::fs::read_dir(snapshot_root).map_err(list_error)? {
            let entry = entry.map_err(list_error)?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            // Entries shaped like our snapshots are listed even when their
            // timestamp overflows, so the caller fails on them loudly.
            if !matches!(match_snapshot(subvolume_name, &name), Ok(None)) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    fn delete(&self, path: &Path) -> Result<()> {
        let command = self.subvolume_command().arg("delete").arg(path);
        let status = self
            .executor
            .status(&command)
            .map_err(|e| self.spawn_error(e))?;

        if status.is_success() {
            Ok(())
        } else {
            Err(FatalError::SnapshotDelete {
                path: path.to_path_buf(),
                reason: status.to_string(),
            })
        }
    }
}
