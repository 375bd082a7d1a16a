//! Generational retention planning
//!
//! This crate provides:
//! - Generation tiers (daily/weekly/monthly) and the retention policy built from them
//! - The keep-set planner used to prune timestamped snapshots
//! - Gap handling policy for when a generation has no usable candidate

pub mod planner;
pub mod policy;

// Re-exports
pub use planner::{plan, select_keep, RetentionPlan};
pub use policy::{GapBehavior, PolicyError, RetentionPolicy, Tier, TierKind, DAY, MONTH, WEEK};
