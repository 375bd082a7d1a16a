//! Keep-set planning for timestamped artifacts
//!
//! Walks the policy's generation slots from `now` backwards. Each slot aims
//! at `anchor - interval` and claims the closest unclaimed timestamp; the
//! claimed timestamp becomes the anchor for the next slot, so generations
//! telescope from artifacts that actually exist rather than from wall-clock
//! slots.

use crate::policy::{GapBehavior, RetentionPolicy};
use std::collections::BTreeSet;
use tracing::debug;

/// Outcome of planning over a set of timestamps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Timestamps that survive
    pub keep: BTreeSet<i64>,
    /// Timestamps eligible for deletion, in input order
    pub prune: Vec<i64>,
}

impl RetentionPlan {
    pub fn is_kept(&self, timestamp: i64) -> bool {
        self.keep.contains(&timestamp)
    }
}

/// Compute the timestamps to keep
///
/// Ties in distance go to the candidate seen first in `existing`.
pub fn select_keep(now: i64, existing: &[i64], policy: &RetentionPolicy) -> BTreeSet<i64> {
    let mut pool: Vec<i64> = existing.to_vec();
    let mut keep = BTreeSet::new();
    let mut anchor = now;

    for tier in policy.slots() {
        // A slot before the start of i64 time can never be filled
        let Some(target) = anchor.checked_sub(tier.interval_secs) else {
            debug!("No {} slot before {}, stopping", tier.kind, anchor);
            break;
        };

        match closest(target, &pool) {
            Some(idx) => {
                let chosen = pool.remove(idx);
                debug!(
                    "Found {} as {} candidate for {} in {:?}",
                    chosen, tier.kind, target, pool
                );
                keep.insert(chosen);
                anchor = chosen;
            }
            None => match policy.gap_behavior() {
                GapBehavior::StopOnFirstGap => {
                    debug!("No {} candidate for {}, stopping", tier.kind, target);
                    break;
                }
                GapBehavior::SkipAndContinue => {
                    debug!("No {} candidate for {}, skipping slot", tier.kind, target);
                    anchor = target;
                }
            },
        }
    }

    keep
}

/// Partition `existing` into keep and prune sets
pub fn plan(now: i64, existing: &[i64], policy: &RetentionPolicy) -> RetentionPlan {
    let keep = select_keep(now, existing, policy);
    let prune = existing
        .iter()
        .copied()
        .filter(|timestamp| !keep.contains(timestamp))
        .collect();

    RetentionPlan { keep, prune }
}

/// Index of the timestamp closest to `target`
///
/// The search starts with a best distance of `target` itself, as if a
/// timestamp `0` were already the best match. Only strictly closer
/// candidates win, so `0` is never returned and a non-positive target never
/// matches anything.
fn closest(target: i64, pool: &[i64]) -> Option<usize> {
    let mut best = None;
    let mut best_distance = i128::from(target);

    for (idx, &candidate) in pool.iter().enumerate() {
        let distance = (i128::from(target) - i128::from(candidate)).abs();
        if distance < best_distance {
            best = Some(idx);
            best_distance = distance;
        }
    }

    best
}
