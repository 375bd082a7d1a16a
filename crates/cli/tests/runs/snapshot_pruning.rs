//! Snapshot pruning after the backup phase

use super::NOW;
use crate::common::{Event, Scenario};
use btrborg_core::TargetFilter;
use retention::{plan, select_keep, DAY};
use std::collections::BTreeSet;

#[test]
fn test_prunes_down_to_policy() {
    let mut scenario = Scenario::new();
    scenario.btrfs_target("root", "/", "/");
    for day in 1..=30 {
        scenario
            .snapshots
            .existing(&format!("ROOT-{}", NOW - day * DAY));
    }

    scenario
        .coordinator(TargetFilter::all(), NOW)
        .run(&scenario.targets)
        .unwrap();

    let mut timestamps: Vec<i64> = (1..=30).map(|day| NOW - day * DAY).collect();
    timestamps.push(NOW);
    timestamps.sort_unstable();
    let keep = select_keep(NOW, &timestamps, &scenario.policy);
    assert_eq!(keep.len(), scenario.policy.total_generations());

    let expected: BTreeSet<String> = keep.iter().map(|ts| format!("ROOT-{}", ts)).collect();
    assert_eq!(scenario.snapshots.entries(), expected);
    assert_eq!(
        scenario.log.count(|e| matches!(e, Event::Delete { .. })),
        timestamps.len() - keep.len()
    );
}

#[test]
fn test_deletes_follow_plan_oldest_first() {
    let mut scenario = Scenario::new();
    scenario.btrfs_target("home", "/home", "home");
    for day in (1..=25).rev() {
        scenario
            .snapshots
            .existing(&format!("home-{}", NOW - day * DAY));
    }
    let orchestrator = scenario.orchestrator();
    let target = orchestrator.resolve(&scenario.targets[0], NOW).unwrap();

    let deleted = orchestrator.prune_snapshots(&target, NOW).unwrap();

    let timestamps: Vec<i64> = (1..=25).rev().map(|day| NOW - day * DAY).collect();
    let expected: Vec<_> = plan(NOW, &timestamps, &scenario.policy)
        .prune
        .iter()
        .map(|ts| scenario.snapshot_root().join(format!("home-{}", ts)))
        .collect();
    assert!(!expected.is_empty());
    assert_eq!(deleted, expected);
    assert_eq!(
        scenario.log.count(|e| matches!(e, Event::Delete { .. })),
        expected.len()
    );
}

#[test]
fn test_deletes_happen_after_archive_prune() {
    let mut scenario = Scenario::new();
    scenario.btrfs_target("root", "/", "/");
    for day in 1..=20 {
        scenario
            .snapshots
            .existing(&format!("ROOT-{}", NOW - day * DAY));
    }

    scenario
        .coordinator(TargetFilter::all(), NOW)
        .run(&scenario.targets)
        .unwrap();

    let pruned = scenario
        .log
        .position(|e| matches!(e, Event::Prune { .. }))
        .unwrap();
    let first_delete = scenario
        .log
        .position(|e| matches!(e, Event::Delete { .. }))
        .unwrap();
    assert!(pruned < first_delete);
}

#[test]
fn test_other_subvolumes_untouched() {
    let mut scenario = Scenario::new();
    scenario.btrfs_target("root", "/", "/");
    for day in 1..=30 {
        scenario
            .snapshots
            .existing(&format!("ROOT-{}", NOW - day * DAY));
        scenario
            .snapshots
            .existing(&format!("home-{}", NOW - day * DAY));
    }
    scenario.snapshots.existing("ROOT-latest");

    scenario
        .coordinator(TargetFilter::all(), NOW)
        .run(&scenario.targets)
        .unwrap();

    let entries = scenario.snapshots.entries();
    let homes = entries.iter().filter(|name| name.starts_with("home-")).count();
    assert_eq!(homes, 30);
    assert!(entries.contains("ROOT-latest"));
}

#[test]
fn test_few_snapshots_are_all_kept() {
    let mut scenario = Scenario::new();
    scenario.btrfs_target("home", "/home", "home");
    for ts in [NOW - DAY, NOW - 3 * DAY, NOW - 40 * DAY] {
        scenario.snapshots.existing(&format!("home-{}", ts));
    }

    scenario
        .coordinator(TargetFilter::all(), NOW)
        .run(&scenario.targets)
        .unwrap();

    assert_eq!(scenario.snapshots.entries().len(), 4);
    assert_eq!(scenario.log.count(|e| matches!(e, Event::Delete { .. })), 0);
}

#[test]
fn test_live_targets_skip_snapshot_pruning() {
    let mut scenario = Scenario::new();
    scenario.plain_target("data", "/data", "ext4");
    let orchestrator = scenario.orchestrator();

    let target = orchestrator.resolve(&scenario.targets[0], NOW).unwrap();
    let deleted = orchestrator.prune_snapshots(&target, NOW).unwrap();
    assert!(deleted.is_empty());
}
