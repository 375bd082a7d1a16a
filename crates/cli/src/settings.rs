//! Run-wide settings shared by every target

use btrborg_core::TargetFilter;
use engine::btrfs::DEFAULT_BTRFS;
use retention::RetentionPolicy;
use std::path::{Path, PathBuf};

/// Default snapshot root
pub const DEFAULT_SNAPSHOT_DIR: &str = "/@snapshots";

/// Settings of one run, fixed before any target is touched
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub snapshot_root: PathBuf,
    pub borg: PathBuf,
    pub btrfs: PathBuf,
    pub niced: bool,
    pub filter: TargetFilter,
    pub policy: RetentionPolicy,
}

impl RunSettings {
    /// Settings with the stock tool locations and retention policy
    pub fn new(borg: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_root: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
            borg: borg.into(),
            btrfs: PathBuf::from(DEFAULT_BTRFS),
            niced: false,
            filter: TargetFilter::all(),
            policy: RetentionPolicy::default(),
        }
    }
}

/// `borg` living next to `exe`
pub fn borg_next_to(exe: &Path) -> PathBuf {
    exe.parent().unwrap_or_else(|| Path::new("/")).join("borg")
}
