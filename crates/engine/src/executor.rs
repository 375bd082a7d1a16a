//! External command execution
//!
//! Every tool invocation is described by a [`ToolCommand`] and run through a
//! [`CommandExecutor`]. Environment variables are attached to the command
//! itself; the process environment is never modified.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Prefix putting a command in the idle I/O class with a lower CPU priority
const NICE_ARGS: [&str; 3] = ["-c3", "nice", "-n10"];

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set a variable for this command only
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Wrap in `ionice -c3 nice -n10` when `enabled`
    pub fn niced(self, enabled: bool) -> Self {
        if !enabled {
            return self;
        }

        let mut args: Vec<OsString> = NICE_ARGS.iter().map(|arg| OsString::from(*arg)).collect();
        args.push(self.program.into_os_string());
        args.extend(self.args);

        Self {
            program: PathBuf::from("ionice"),
            args,
            cwd: self.cwd,
            env: self.env,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Value of a variable set with [`ToolCommand::env`]
    pub fn get_env(&self, key: &str) -> Option<&OsStr> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// Program and arguments as lossy strings, for assertions and logs
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect()
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// How a finished command exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolStatus {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
}

impl ToolStatus {
    pub fn success() -> Self {
        Self { code: Some(0) }
    }

    pub fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exited with code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Exit status plus captured standard output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub status: ToolStatus,
    pub stdout: String,
}

/// Runs external commands to completion
pub trait CommandExecutor {
    /// Run with inherited stdio and wait for it
    fn status(&self, command: &ToolCommand) -> io::Result<ToolStatus>;

    /// Run capturing stdout and wait for it
    fn output(&self, command: &ToolCommand) -> io::Result<ToolOutput>;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    fn status(&self, command: &ToolCommand) -> io::Result<ToolStatus> {
        (**self).status(command)
    }

    fn output(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
        (**self).output(command)
    }
}

/// Executor spawning real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn status(&self, command: &ToolCommand) -> io::Result<ToolStatus> {
        debug!("Running {}", command);
        let status = command.to_command().status()?;
        Ok(ToolStatus {
            code: status.code(),
        })
    }

    fn output(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
        debug!("Running {}", command);
        let output = command
            .to_command()
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()?;
        Ok(ToolOutput {
            status: ToolStatus {
                code: output.status.code(),
            },
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}
