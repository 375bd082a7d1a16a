//! Retention policy configuration

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One day in seconds
pub const DAY: i64 = 60 * 60 * 24;
/// One week in seconds
pub const WEEK: i64 = DAY * 7;
/// One "month" in seconds (four weeks)
pub const MONTH: i64 = WEEK * 4;

/// Errors raised while building a policy
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("retention policy has no generation tiers")]
    Empty,

    #[error("tier {kind} has non-positive interval {interval_secs}s")]
    NonPositiveInterval { kind: TierKind, interval_secs: i64 },

    #[error("tier {kind} ({interval_secs}s) is finer than the tier before it ({previous_secs}s)")]
    OutOfOrder {
        kind: TierKind,
        interval_secs: i64,
        previous_secs: i64,
    },

    #[error("unknown gap behavior '{0}' (expected 'stop' or 'skip')")]
    UnknownGapBehavior(String),
}

/// Rotation level of a generation tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierKind {
    Daily,
    Weekly,
    Monthly,
}

impl TierKind {
    /// Lowercase name, as used in `--keep-<name>` flags
    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Daily => "daily",
            TierKind::Weekly => "weekly",
            TierKind::Monthly => "monthly",
        }
    }

    /// Nominal spacing between two generations of this kind
    pub fn default_interval(&self) -> i64 {
        match self {
            TierKind::Daily => DAY,
            TierKind::Weekly => WEEK,
            TierKind::Monthly => MONTH,
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generation tier: keep `count` artifacts spaced `interval_secs` apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    pub kind: TierKind,
    pub count: usize,
    pub interval_secs: i64,
}

impl Tier {
    pub fn new(kind: TierKind, count: usize, interval_secs: i64) -> Self {
        Self {
            kind,
            count,
            interval_secs,
        }
    }

    pub fn daily(count: usize) -> Self {
        Self::new(TierKind::Daily, count, DAY)
    }

    pub fn weekly(count: usize) -> Self {
        Self::new(TierKind::Weekly, count, WEEK)
    }

    pub fn monthly(count: usize) -> Self {
        Self::new(TierKind::Monthly, count, MONTH)
    }
}

/// What the planner does when a generation slot has no usable candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapBehavior {
    /// Abandon every remaining slot, coarser tiers included
    #[default]
    StopOnFirstGap,
    /// Leave the slot empty, move the anchor to the slot's target and go on
    SkipAndContinue,
}

impl GapBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            GapBehavior::StopOnFirstGap => "stop",
            GapBehavior::SkipAndContinue => "skip",
        }
    }
}

impl fmt::Display for GapBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GapBehavior {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" | "stop-on-first-gap" => Ok(GapBehavior::StopOnFirstGap),
            "skip" | "skip-and-continue" => Ok(GapBehavior::SkipAndContinue),
            other => Err(PolicyError::UnknownGapBehavior(other.to_string())),
        }
    }
}

/// Ordered generation tiers, finest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    tiers: Vec<Tier>,
    gap_behavior: GapBehavior,
}

impl Default for RetentionPolicy {
    /// 7 daily, 4 weekly and 6 monthly generations, stopping on the first gap
    fn default() -> Self {
        Self {
            tiers: vec![Tier::daily(7), Tier::weekly(4), Tier::monthly(6)],
            gap_behavior: GapBehavior::StopOnFirstGap,
        }
    }
}

impl RetentionPolicy {
    /// Build a policy, checking that tiers go from finer to coarser
    pub fn new(tiers: Vec<Tier>, gap_behavior: GapBehavior) -> Result<Self, PolicyError> {
        if tiers.is_empty() {
            return Err(PolicyError::Empty);
        }

        let mut previous: Option<&Tier> = None;
        for tier in &tiers {
            if tier.interval_secs <= 0 {
                return Err(PolicyError::NonPositiveInterval {
                    kind: tier.kind,
                    interval_secs: tier.interval_secs,
                });
            }
            if let Some(prev) = previous {
                if tier.interval_secs < prev.interval_secs {
                    return Err(PolicyError::OutOfOrder {
                        kind: tier.kind,
                        interval_secs: tier.interval_secs,
                        previous_secs: prev.interval_secs,
                    });
                }
            }
            previous = Some(tier);
        }

        Ok(Self { tiers, gap_behavior })
    }

    /// Same tiers, different gap handling
    pub fn with_gap_behavior(mut self, gap_behavior: GapBehavior) -> Self {
        self.gap_behavior = gap_behavior;
        self
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn gap_behavior(&self) -> GapBehavior {
        self.gap_behavior
    }

    /// Every generation slot in evaluation order (`count` copies of each tier)
    pub fn slots(&self) -> impl Iterator<Item = &Tier> + '_ {
        self.tiers
            .iter()
            .flat_map(|tier| std::iter::repeat(tier).take(tier.count))
    }

    /// Upper bound on the size of any keep-set
    pub fn total_generations(&self) -> usize {
        self.tiers.iter().map(|tier| tier.count).sum()
    }
}
