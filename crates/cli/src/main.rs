//! btrborg - btrfs snapshots backed up with borg

use anyhow::{Context, Result};
use btrborg_core::{TargetFilter, TargetsFile};
use clap::Parser;
use cli_lib::logging::{self, LogLevel};
use cli_lib::settings::{borg_next_to, DEFAULT_SNAPSHOT_DIR};
use cli_lib::{RunCoordinator, RunSettings, TargetOrchestrator};
use engine::btrfs::DEFAULT_BTRFS;
use engine::{Borg, Btrfs, MountTable, SystemExecutor};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Snapshot btrfs mount points and back them up into borg repositories
#[derive(Parser)]
#[command(name = "btrborg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file mapping target names to mountpoint, repository and excludes
    config_file: PathBuf,

    /// Log verbosity
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Only back up these targets (comma separated)
    #[arg(long, value_name = "NAMES")]
    backup_only: Option<String>,

    /// Directory holding the snapshots, must be a mountpoint
    #[arg(long, default_value = DEFAULT_SNAPSHOT_DIR)]
    snapshot_dir: PathBuf,

    /// borg binary (default: `borg` next to this executable)
    #[arg(long, value_name = "PATH")]
    with_borg: Option<PathBuf>,

    /// btrfs binary
    #[arg(long, value_name = "PATH", default_value = DEFAULT_BTRFS)]
    with_btrfs: PathBuf,

    /// Run borg with idle I/O priority and lowered CPU priority
    #[arg(long)]
    nice: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

impl Cli {
    fn settings(&self) -> Result<RunSettings> {
        let borg = match &self.with_borg {
            Some(path) => path.clone(),
            None => {
                let exe = std::env::current_exe()
                    .context("Failed to locate the btrborg executable")?;
                borg_next_to(&exe)
            }
        };

        let mut settings = RunSettings::new(borg);
        settings.snapshot_root = self.snapshot_dir.clone();
        settings.btrfs = self.with_btrfs.clone();
        settings.niced = self.nice;
        if let Some(names) = &self.backup_only {
            settings.filter = TargetFilter::parse(names);
        }
        Ok(settings)
    }
}

fn run(cli: Cli) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    let settings = cli.settings()?;

    let probe = MountTable::default();
    let snapshots = Btrfs::new(&settings.btrfs, SystemExecutor);
    let backups = Borg::new(&settings.borg, SystemExecutor);

    let orchestrator = TargetOrchestrator::new(
        &probe,
        &snapshots,
        &backups,
        &settings.policy,
        &settings.snapshot_root,
        settings.niced,
    );
    let coordinator = RunCoordinator::new(orchestrator, settings.filter.clone(), now);

    coordinator.prepare_snapshot_root()?;

    let config = TargetsFile::load(&cli.config_file)
        .with_context(|| format!("Failed to load {}", cli.config_file.display()))?;

    let outcome = coordinator.run(&config.targets)?;
    if outcome.is_clean() {
        println!("{} All targets backed up", "✓".green());
    } else {
        println!(
            "{} Finished with {} warning(s)",
            "!".yellow().bold(),
            outcome.warnings().len()
        );
    }
    Ok(())
}
