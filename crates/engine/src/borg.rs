//! borg archive creation and pruning
//!
//! The repository is handed to borg through `BORG_REPO` on each command,
//! and archive names are left to borg's own `{hostname}`/`{utcnow}`
//! placeholders.

use crate::executor::{CommandExecutor, ToolCommand};
use crate::{BackupEngine, BackupRequest, BackupStatus};
use btrborg_core::{FatalError, Result};
use retention::RetentionPolicy;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name template of created archives
pub const ARCHIVE_NAME: &str = "::{hostname}-{utcnow}";

/// Only archives created by this host are pruned
pub const PRUNE_PREFIX: &str = "--prefix={hostname}-";

const COMMON_ARGS: [&str; 2] = ["--show-rc", "--show-version"];

const CREATE_ARGS: [&str; 6] = [
    "--list",
    "--filter=E",
    "--stats",
    "--compression=lz4",
    "--one-file-system",
    "--exclude-caches",
];

/// Backup engine driving the `borg` command line tool
#[derive(Debug, Clone)]
pub struct Borg<E> {
    binary: PathBuf,
    executor: E,
}

impl<E: CommandExecutor> Borg<E> {
    pub fn new(binary: impl Into<PathBuf>, executor: E) -> Self {
        Self {
            binary: binary.into(),
            executor,
        }
    }

    /// `borg create` for `request`, run from inside the source directory
    pub fn create_command(&self, request: &BackupRequest<'_>) -> ToolCommand {
        ToolCommand::new(&self.binary)
            .args(COMMON_ARGS)
            .arg("create")
            .args(CREATE_ARGS)
            .args(request.excludes.iter().map(|p| format!("--exclude={}", p)))
            .args([ARCHIVE_NAME, "."])
            .current_dir(request.source)
            .env("BORG_REPO", request.repository)
            .niced(request.niced)
    }

    /// `borg prune` keeping the generations of `policy`
    pub fn prune_command(
        &self,
        repository: &Path,
        policy: &RetentionPolicy,
        niced: bool,
    ) -> ToolCommand {
        ToolCommand::new(&self.binary)
            .args(COMMON_ARGS)
            .args(["prune", "--list", PRUNE_PREFIX])
            .args(keep_flags(policy))
            .env("BORG_REPO", repository)
            .niced(niced)
    }

    fn spawn_error(&self, source: std::io::Error) -> FatalError {
        FatalError::Spawn {
            program: self.binary.display().to_string(),
            source,
        }
    }
}

/// `--keep-<tier>=<count>` for every tier of `policy`
pub fn keep_flags(policy: &RetentionPolicy) -> Vec<String> {
    policy
        .tiers()
        .iter()
        .map(|tier| format!("--keep-{}={}", tier.kind, tier.count))
        .collect()
}

impl<E: CommandExecutor> BackupEngine for Borg<E> {
    fn backup(&self, request: &BackupRequest<'_>) -> Result<BackupStatus> {
        let command = self.create_command(request);
        let status = self
            .executor
            .status(&command)
            .map_err(|e| self.spawn_error(e))?;

        if status.is_success() {
            Ok(BackupStatus::Completed)
        } else {
            warn!("{} {}, check the logs!", command, status);
            Ok(BackupStatus::Failed { code: status.code })
        }
    }

    fn prune(&self, repository: &Path, policy: &RetentionPolicy, niced: bool) -> Result<()> {
        info!("Pruning archives in {} ...", repository.display());

        let command = self.prune_command(repository, policy, niced);
        let status = self
            .executor
            .status(&command)
            .map_err(|e| self.spawn_error(e))?;

        if status.is_success() {
            Ok(())
        } else {
            Err(FatalError::ArchivePrune {
                repository: repository.to_path_buf(),
                reason: status.to_string(),
            })
        }
    }
}
