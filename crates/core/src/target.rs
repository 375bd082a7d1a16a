//! Resolved backup targets

use crate::config::TargetConfig;
use crate::snapshot::snapshot_name;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Where and under which name a target gets snapshotted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPlan {
    /// Subvolume path as reported by the snapshot tool (e.g. `/`, `home`)
    pub subvolume: String,
    /// Flattened subvolume name, the prefix of every snapshot of this target
    pub subvolume_name: String,
    /// Snapshot destination for this run
    pub path: PathBuf,
}

impl SnapshotPlan {
    pub fn new(subvolume: String, snapshot_root: &Path, now: i64) -> Self {
        let subvolume_name = subvolume_name(&subvolume);
        let path = snapshot_root.join(snapshot_name(&subvolume_name, now));
        Self {
            subvolume,
            subvolume_name,
            path,
        }
    }
}

/// Flatten a subvolume path into a single directory entry name
///
/// Slashes become underscores; the top-level subvolume becomes `ROOT`.
pub fn subvolume_name(subvolume: &str) -> String {
    let name = subvolume.replace('/', "_");
    if name == "_" {
        "ROOT".to_string()
    } else {
        name
    }
}

/// A fully resolved backup target
///
/// Built once during the snapshot phase and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTarget {
    name: String,
    mountpoint: PathBuf,
    repository: PathBuf,
    excludes: Vec<String>,
    fstype: String,
    niced: bool,
    snapshot: Option<SnapshotPlan>,
}

impl BackupTarget {
    /// Target without a snapshot plan; `config.repository` must already be absolute
    pub fn new(name: String, config: TargetConfig, fstype: String, niced: bool) -> Self {
        Self {
            name,
            mountpoint: config.mountpoint,
            repository: config.repository,
            excludes: config.excludes,
            fstype,
            niced,
            snapshot: None,
        }
    }

    /// The same target, snapshotted according to `plan`
    pub fn with_snapshot(self, plan: SnapshotPlan) -> Self {
        Self {
            snapshot: Some(plan),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }

    pub fn repository(&self) -> &Path {
        &self.repository
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    pub fn fstype(&self) -> &str {
        &self.fstype
    }

    pub fn niced(&self) -> bool {
        self.niced
    }

    pub fn snapshot(&self) -> Option<&SnapshotPlan> {
        self.snapshot.as_ref()
    }

    /// Directory the backup reads from: the snapshot if any, else the live mount
    pub fn backup_source(&self) -> &Path {
        self.snapshot
            .as_ref()
            .map(|plan| plan.path.as_path())
            .unwrap_or(&self.mountpoint)
    }
}

/// Optional allow-list of target names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    names: Option<BTreeSet<String>>,
}

impl TargetFilter {
    /// Filter letting every target through
    pub fn all() -> Self {
        Self { names: None }
    }

    /// Filter from a comma-separated list of names
    ///
    /// A list without any names filters nothing.
    pub fn parse(list: &str) -> Self {
        let names: BTreeSet<String> = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Self::all();
        }
        Self { names: Some(names) }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    pub fn allows(&self, name: &str) -> bool {
        match &self.names {
            Some(names) => names.contains(name),
            None => true,
        }
    }

    /// Names in the filter that match none of `configured`
    pub fn unknown_names<'a, I>(&'a self, configured: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(names) = &self.names else {
            return Vec::new();
        };
        let configured: BTreeSet<&str> = configured.into_iter().collect();
        names
            .iter()
            .map(String::as_str)
            .filter(|name| !configured.contains(name))
            .collect()
    }
}
