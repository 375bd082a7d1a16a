//! Every snapshot is taken before the first backup starts

use super::NOW;
use crate::common::fakes::repository_of;
use crate::common::{Event, Scenario};
use btrborg_core::TargetFilter;
use std::path::PathBuf;

fn two_btrfs_targets() -> Scenario {
    let mut scenario = Scenario::new();
    scenario
        .btrfs_target("root", "/", "/")
        .btrfs_target("home", "/home", "home");
    scenario
}

#[test]
fn test_snapshots_precede_backups() {
    let scenario = two_btrfs_targets();
    let root = scenario.snapshot_root().to_path_buf();

    let outcome = scenario
        .coordinator(TargetFilter::all(), NOW)
        .run(&scenario.targets)
        .unwrap();
    assert!(outcome.is_clean());

    assert_eq!(
        scenario.log.events(),
        vec![
            Event::Snapshot {
                mountpoint: PathBuf::from("/"),
                destination: root.join(format!("ROOT-{}", NOW)),
            },
            Event::Snapshot {
                mountpoint: PathBuf::from("/home"),
                destination: root.join(format!("home-{}", NOW)),
            },
            Event::Backup {
                source: root.join(format!("ROOT-{}", NOW)),
                repository: repository_of("root"),
                niced: false,
            },
            Event::Prune {
                repository: repository_of("root"),
            },
            Event::Backup {
                source: root.join(format!("home-{}", NOW)),
                repository: repository_of("home"),
                niced: false,
            },
            Event::Prune {
                repository: repository_of("home"),
            },
        ]
    );
}

#[test]
fn test_snapshot_phase_yields_barrier_in_config_order() {
    let mut scenario = two_btrfs_targets();
    scenario.plain_target("scratch", "/scratch", "xfs");

    let coordinator = scenario.coordinator(TargetFilter::all(), NOW);
    let mut outcome = Default::default();
    let barrier = coordinator
        .snapshot_phase(&scenario.targets, &mut outcome)
        .unwrap();

    let names: Vec<&str> = barrier.targets().iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["root", "home", "scratch"]);
    assert_eq!(barrier.now(), NOW);

    // Nothing is backed up until the barrier is handed to the backup phase
    assert_eq!(scenario.log.count(|e| matches!(e, Event::Backup { .. })), 0);

    coordinator.backup_phase(barrier, &mut outcome).unwrap();
    assert_eq!(scenario.log.count(|e| matches!(e, Event::Backup { .. })), 3);
}

#[test]
fn test_filter_restricts_both_phases() {
    let scenario = two_btrfs_targets();

    let outcome = scenario
        .coordinator(TargetFilter::parse("home,nosuchtarget"), NOW)
        .run(&scenario.targets)
        .unwrap();
    assert!(outcome.is_clean());

    let events = scenario.log.events();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|event| match event {
        Event::Snapshot { mountpoint, .. } => mountpoint == &PathBuf::from("/home"),
        Event::Backup { repository, .. } | Event::Prune { repository } => {
            repository == &repository_of("home")
        }
        Event::Delete { .. } => false,
    }));
}

#[test]
fn test_empty_filter_runs_every_target() {
    for list in ["", ","] {
        let scenario = two_btrfs_targets();

        let outcome = scenario
            .coordinator(TargetFilter::parse(list), NOW)
            .run(&scenario.targets)
            .unwrap();
        assert!(outcome.is_clean());

        assert_eq!(scenario.log.events().len(), 6, "{:?}", list);
        assert_eq!(
            scenario.log.count(|e| matches!(e, Event::Backup { .. })),
            2,
            "{:?}",
            list
        );
    }
}

#[test]
fn test_niced_run_reaches_backup_engine() {
    let mut scenario = two_btrfs_targets();
    scenario.niced = true;

    scenario
        .coordinator(TargetFilter::all(), NOW)
        .run(&scenario.targets)
        .unwrap();

    let niced = scenario.log.count(|e| matches!(e, Event::Backup { niced: true, .. }));
    assert_eq!(niced, 2);
}

#[test]
fn test_prepare_creates_snapshot_root() {
    let scenario = Scenario::new();
    assert!(!scenario.snapshot_root().exists());

    scenario
        .coordinator(TargetFilter::all(), NOW)
        .prepare_snapshot_root()
        .unwrap();
    assert!(scenario.snapshot_root().is_dir());
}

#[test]
fn test_resolved_target_plans_snapshot_for_now() {
    let scenario = two_btrfs_targets();
    let target = scenario
        .orchestrator()
        .resolve(&scenario.targets[1], NOW)
        .unwrap();

    let plan = target.snapshot().unwrap();
    assert_eq!(plan.subvolume, "home");
    assert_eq!(plan.subvolume_name, "home");
    assert_eq!(
        target.backup_source(),
        scenario.snapshot_root().join(format!("home-{}", NOW))
    );
    assert_eq!(target.fstype(), "btrfs");
}
