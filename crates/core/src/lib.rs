//! Core data model for btrborg
//!
//! This crate provides:
//! - Target configuration loading (JSON, file order preserved)
//! - Resolved backup targets and their snapshot plans
//! - Snapshot naming and timestamp parsing
//! - Fatal error taxonomy and recoverable warnings

pub mod config;
pub mod error;
pub mod snapshot;
pub mod target;

// Re-exports
pub use config::{ConfigError, NamedTarget, TargetConfig, TargetsFile};
pub use error::{ErrorKind, FatalError, Warning};
pub use snapshot::{match_snapshot, snapshot_name};
pub use target::{subvolume_name, BackupTarget, SnapshotPlan, TargetFilter};

/// Result type for operations that can abort the run
pub type Result<T> = std::result::Result<T, FatalError>;
