//! Two-phase run over all configured targets
//!
//! Every selected target is snapshotted before any backup starts, so all
//! snapshots of a run share one point in time. A [`SnapshotBarrier`] can
//! only be obtained by completing the snapshot phase, and the backup phase
//! consumes it.

use crate::orchestrator::TargetOrchestrator;
use btrborg_core::{BackupTarget, FatalError, NamedTarget, Result, TargetFilter, Warning};
use tracing::{debug, info, warn};

const REPEAT_HEADER: &str = "Repeating all warnings:";

/// Warnings collected over one run
#[derive(Debug, Default)]
pub struct RunOutcome {
    warnings: Vec<Warning>,
}

impl RunOutcome {
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn record(&mut self, warning: Option<Warning>) {
        if let Some(warning) = warning {
            self.warnings.push(warning);
        }
    }

    /// Lines logged by [`RunOutcome::repeat`]: a header, then one per warning
    pub fn repeated_lines(&self) -> Vec<String> {
        std::iter::once(REPEAT_HEADER.to_string())
            .chain(self.warnings.iter().map(ToString::to_string))
            .collect()
    }

    /// Log every warning again so they are not lost in the tool output
    ///
    /// The header is logged even when there is nothing to repeat.
    pub fn repeat(&self) {
        let mut lines = self.repeated_lines().into_iter();
        if let Some(header) = lines.next() {
            info!("{}", header);
        }
        for line in lines {
            warn!("{}", line);
        }
    }
}

/// Targets whose snapshots have all been taken
#[derive(Debug)]
pub struct SnapshotBarrier {
    targets: Vec<BackupTarget>,
    now: i64,
}

impl SnapshotBarrier {
    pub fn targets(&self) -> &[BackupTarget] {
        &self.targets
    }

    pub fn now(&self) -> i64 {
        self.now
    }
}

/// Runs the selected targets through both phases
pub struct RunCoordinator<'a> {
    orchestrator: TargetOrchestrator<'a>,
    filter: TargetFilter,
    now: i64,
}

impl<'a> RunCoordinator<'a> {
    /// `now` is shared by every snapshot name and retention decision of the run
    pub fn new(orchestrator: TargetOrchestrator<'a>, filter: TargetFilter, now: i64) -> Self {
        Self {
            orchestrator,
            filter,
            now,
        }
    }

    /// Check that the snapshot root is a mount point and create it if needed
    pub fn prepare_snapshot_root(&self) -> Result<()> {
        let root = self.orchestrator.snapshot_root();
        if !self.orchestrator.probe().is_mount_point(root) {
            return Err(FatalError::SnapshotRootNotMountPoint {
                path: root.to_path_buf(),
            });
        }

        std::fs::create_dir_all(root).map_err(|source| FatalError::SnapshotRootCreate {
            path: root.to_path_buf(),
            source,
        })
    }

    /// Resolve and snapshot every selected target, in configuration order
    pub fn snapshot_phase(
        &self,
        targets: &[NamedTarget],
        outcome: &mut RunOutcome,
    ) -> Result<SnapshotBarrier> {
        for name in self
            .filter
            .unknown_names(targets.iter().map(|t| t.name.as_str()))
        {
            debug!("Ignoring unknown target {}", name);
        }

        let mut resolved = Vec::new();
        for named in targets.iter().filter(|t| self.filter.allows(&t.name)) {
            let target = self.orchestrator.resolve(named, self.now)?;
            outcome.record(self.orchestrator.snapshot(&target)?);
            resolved.push(target);
        }

        Ok(SnapshotBarrier {
            targets: resolved,
            now: self.now,
        })
    }

    /// Back up, prune archives and prune snapshots of every snapshotted target
    pub fn backup_phase(&self, barrier: SnapshotBarrier, outcome: &mut RunOutcome) -> Result<()> {
        for target in &barrier.targets {
            outcome.record(self.orchestrator.backup_and_prune(target, barrier.now)?);
        }
        Ok(())
    }

    /// Both phases; the returned outcome carries the warnings of the run
    pub fn run(&self, targets: &[NamedTarget]) -> Result<RunOutcome> {
        let mut outcome = RunOutcome::default();
        let barrier = self.snapshot_phase(targets, &mut outcome)?;
        self.backup_phase(barrier, &mut outcome)?;
        outcome.repeat();
        Ok(outcome)
    }
}
