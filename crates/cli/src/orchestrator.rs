//! Per-target state machine
//!
//! A target moves linearly through
//! `Resolved -> Snapshotted | LiveWarned -> BackedUp -> Pruned -> SnapshotsPruned | Done`
//! with no retries. Every step returns `Err` for conditions that abort the
//! run and `Ok(Some(warning))` for conditions the run records and survives.

use btrborg_core::{
    match_snapshot, BackupTarget, FatalError, NamedTarget, Result, SnapshotPlan, Warning,
};
use chrono::DateTime;
use engine::{
    supports_snapshots, BackupEngine, BackupRequest, BackupStatus, FilesystemProbe,
    SnapshotEngine,
};
use retention::RetentionPolicy;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a target is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolved,
    Snapshotted,
    LiveWarned,
    BackedUp,
    Pruned,
    SnapshotsPruned,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolved => "resolved",
            Stage::Snapshotted => "snapshotted",
            Stage::LiveWarned => "live-warned",
            Stage::BackedUp => "backed-up",
            Stage::Pruned => "pruned",
            Stage::SnapshotsPruned => "snapshots-pruned",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Drives single targets through their steps
pub struct TargetOrchestrator<'a> {
    probe: &'a dyn FilesystemProbe,
    snapshots: &'a dyn SnapshotEngine,
    backups: &'a dyn BackupEngine,
    policy: &'a RetentionPolicy,
    snapshot_root: &'a Path,
    niced: bool,
}

impl<'a> TargetOrchestrator<'a> {
    pub fn new(
        probe: &'a dyn FilesystemProbe,
        snapshots: &'a dyn SnapshotEngine,
        backups: &'a dyn BackupEngine,
        policy: &'a RetentionPolicy,
        snapshot_root: &'a Path,
        niced: bool,
    ) -> Self {
        Self {
            probe,
            snapshots,
            backups,
            policy,
            snapshot_root,
            niced,
        }
    }

    pub fn probe(&self) -> &'a dyn FilesystemProbe {
        self.probe
    }

    pub fn snapshot_root(&self) -> &'a Path {
        self.snapshot_root
    }

    /// Classify the target's filesystem and plan its snapshot for `now`
    pub fn resolve(&self, named: &NamedTarget, now: i64) -> Result<BackupTarget> {
        let fstype = self.probe.classify(&named.config.mountpoint)?;
        let target = BackupTarget::new(
            named.name.clone(),
            named.config.clone(),
            fstype,
            self.niced,
        );

        let target = if supports_snapshots(target.fstype()) {
            let subvolume = self.snapshots.subvolume_of(target.mountpoint())?;
            let plan = SnapshotPlan::new(subvolume, self.snapshot_root, now);
            target.with_snapshot(plan)
        } else {
            target
        };

        advance(&target, Stage::Resolved);
        Ok(target)
    }

    /// Take the target's snapshot, or warn that it cannot have one
    pub fn snapshot(&self, target: &BackupTarget) -> Result<Option<Warning>> {
        match target.snapshot() {
            Some(plan) => {
                self.snapshots.create(target.mountpoint(), &plan.path)?;
                advance(target, Stage::Snapshotted);
                Ok(None)
            }
            None => {
                let warning = Warning::UnsupportedFilesystem {
                    mountpoint: target.mountpoint().to_path_buf(),
                    fstype: target.fstype().to_string(),
                };
                warn!("{}", warning);
                advance(target, Stage::LiveWarned);
                Ok(Some(warning))
            }
        }
    }

    /// Archive the snapshot (or the live mount point)
    pub fn backup(&self, target: &BackupTarget) -> Result<Option<Warning>> {
        info!(
            "Backing up {} into {} ...",
            target.mountpoint().display(),
            target.repository().display()
        );
        if target.snapshot().is_none() {
            warn!(
                "Mountpoint {} not snapshotted, doing live backup!",
                target.mountpoint().display()
            );
        }

        let request = BackupRequest {
            source: target.backup_source(),
            repository: target.repository(),
            excludes: target.excludes(),
            niced: target.niced(),
        };

        let warning = match self.backups.backup(&request)? {
            BackupStatus::Completed => None,
            BackupStatus::Failed { code } => {
                let warning = Warning::BackupFailed {
                    target: target.name().to_string(),
                    code,
                };
                warn!("{}", warning);
                Some(warning)
            }
        };

        advance(target, Stage::BackedUp);
        Ok(warning)
    }

    /// Prune the target's archives, whether or not its backup succeeded
    pub fn prune_archives(&self, target: &BackupTarget) -> Result<()> {
        info!(
            "Pruning backups of {} in {} ...",
            target.mountpoint().display(),
            target.repository().display()
        );
        self.backups
            .prune(target.repository(), self.policy, target.niced())?;
        advance(target, Stage::Pruned);
        Ok(())
    }

    /// Delete the target's snapshots that fall outside the retention policy
    ///
    /// Returns the deleted snapshot paths. Targets without snapshots are
    /// left alone.
    pub fn prune_snapshots(&self, target: &BackupTarget, now: i64) -> Result<Vec<PathBuf>> {
        let Some(plan) = target.snapshot() else {
            advance(target, Stage::Done);
            return Ok(Vec::new());
        };

        info!("Pruning snapshots in {} ...", self.snapshot_root.display());

        let mut found = Vec::new();
        for name in self.snapshots.list(self.snapshot_root, &plan.subvolume_name)? {
            match match_snapshot(&plan.subvolume_name, &name)? {
                Some(timestamp) => {
                    debug!("Found snapshot {} at timestamp {}", name, timestamp);
                    found.push((name, timestamp));
                }
                None => return Err(FatalError::MalformedSnapshotName { name }),
            }
        }
        found.sort_by_key(|(_, timestamp)| *timestamp);

        let timestamps: Vec<i64> = found.iter().map(|(_, timestamp)| *timestamp).collect();
        let retained = retention::plan(now, &timestamps, self.policy);

        // `prune` keeps the order of `found`, so one pass pairs them up
        let mut candidates = found.into_iter();
        let mut deleted = Vec::new();
        for timestamp in retained.prune {
            let Some((name, _)) = candidates.find(|(_, found_at)| *found_at == timestamp) else {
                continue;
            };

            info!(
                "Pruning snapshot {} at timestamp {} ({}) ...",
                name,
                timestamp,
                format_timestamp(timestamp)
            );
            let path = self.snapshot_root.join(&name);
            self.snapshots.delete(&path)?;
            deleted.push(path);
        }

        advance(target, Stage::SnapshotsPruned);
        Ok(deleted)
    }

    /// Every step after the snapshot phase, in order
    pub fn backup_and_prune(&self, target: &BackupTarget, now: i64) -> Result<Option<Warning>> {
        let warning = self.backup(target)?;
        self.prune_archives(target)?;
        self.prune_snapshots(target, now)?;
        Ok(warning)
    }
}

fn advance(target: &BackupTarget, stage: Stage) {
    debug!("Target {} is {}", target.name(), stage);
}

/// UTC rendering of a unix timestamp for log lines
pub fn format_timestamp(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "out of range".to_string(),
    }
}
