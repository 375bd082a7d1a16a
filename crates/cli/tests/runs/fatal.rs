//! Fatal conditions abort the whole run where they happen

use super::NOW;
use crate::common::fakes::repository_of;
use crate::common::{Event, Scenario};
use btrborg_core::{ErrorKind, FatalError, TargetFilter};

fn is_backup(event: &Event) -> bool {
    matches!(event, Event::Backup { .. })
}

#[test]
fn test_snapshot_root_must_be_mount_point() {
    let mut scenario = Scenario::new();
    scenario.unmount_snapshot_root();

    let err = scenario
        .coordinator(TargetFilter::all(), NOW)
        .prepare_snapshot_root()
        .unwrap_err();

    assert!(matches!(err, FatalError::SnapshotRootNotMountPoint { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("must be a mountpoint"));
    assert!(!scenario.snapshot_root().exists());
}

#[test]
fn test_snapshot_failure_aborts_before_any_backup() {
    let mut scenario = Scenario::new();
    scenario
        .btrfs_target("root", "/", "/")
        .btrfs_target("home", "/home", "home");
    scenario.snapshots.fail_create = true;

    let err = scenario
        .coordinator(TargetFilter::all(), NOW)
        .run(&scenario.targets)
        .unwrap_err();

    assert!(matches!(err, FatalError::SnapshotCreate { .. }));
    assert_eq!(err.kind(), ErrorKind::Snapshot);
    assert!(scenario.log.events().is_empty());
}

#[test]
fn test_ambiguous_mount_aborts_snapshot_phase() {
    let mut scenario = Scenario::new();
    scenario
        .btrfs_target("root", "/", "/")
        .ambiguous_target("srv", "/srv")
        .btrfs_target("home", "/home", "home");

    let err = scenario
        .coordinator(TargetFilter::all(), NOW)
        .run(&scenario.targets)
        .unwrap_err();

    assert!(matches!(err, FatalError::AmbiguousMount { count: 2, .. }));
    // The earlier snapshot is left in place, nothing is backed up
    assert_eq!(scenario.log.count(|e| matches!(e, Event::Snapshot { .. })), 1);
    assert_eq!(scenario.log.count(is_backup), 0);
}

#[test]
fn test_archive_prune_failure_stops_remaining_targets() {
    let mut scenario = Scenario::new();
    scenario
        .btrfs_target("root", "/", "/")
        .btrfs_target("home", "/home", "home");
    scenario.backups.fail_prune = true;

    let err = scenario
        .coordinator(TargetFilter::all(), NOW)
        .run(&scenario.targets)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ArchivePrune);
    assert_eq!(scenario.log.count(is_backup), 1);
    assert_eq!(
        scenario.log.events().last(),
        Some(&Event::Prune {
            repository: repository_of("root")
        })
    );
}

#[test]
fn test_snapshot_delete_failure_is_fatal() {
    let mut scenario = Scenario::new();
    scenario
        .btrfs_target("root", "/", "/")
        .btrfs_target("home", "/home", "home");
    for day in 1..=30 {
        scenario
            .snapshots
            .existing(&format!("ROOT-{}", NOW - day * retention::DAY));
    }
    scenario.snapshots.fail_delete = true;

    let err = scenario
        .coordinator(TargetFilter::all(), NOW)
        .run(&scenario.targets)
        .unwrap_err();

    assert!(matches!(err, FatalError::SnapshotDelete { .. }));
    assert_eq!(scenario.log.count(is_backup), 1);
}

#[test]
fn test_overflowing_snapshot_timestamp_is_fatal() {
    let mut scenario = Scenario::new();
    scenario.btrfs_target("root", "/", "/");
    scenario.snapshots.existing("ROOT-99999999999999999999");

    let err = scenario
        .coordinator(TargetFilter::all(), NOW)
        .run(&scenario.targets)
        .unwrap_err();

    assert!(matches!(err, FatalError::MalformedSnapshotName { .. }));
}
