//! Log output setup

use clap::ValueEnum;
use tracing::Level;

/// Verbosity selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// Most verbose level that gets printed (`critical` has no tracing equivalent)
    pub fn max_level(self) -> Level {
        match self {
            LogLevel::Critical | LogLevel::Error => Level::ERROR,
            LogLevel::Warning => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
        }
    }
}

/// Install the global subscriber, logging to stderr
pub fn init(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_max_level(level.max_level())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
