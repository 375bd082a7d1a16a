//! btrborg run orchestration
//!
//! This crate provides:
//! - The per-target state machine (snapshot, backup, prune, snapshot pruning)
//! - The two-phase run over all configured targets
//! - Run-wide settings and logging setup for the `btrborg` binary

pub mod coordinator;
pub mod logging;
pub mod orchestrator;
pub mod settings;

// Re-exports
pub use coordinator::{RunCoordinator, RunOutcome, SnapshotBarrier};
pub use logging::LogLevel;
pub use orchestrator::{Stage, TargetOrchestrator};
pub use settings::RunSettings;
