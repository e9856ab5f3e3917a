//! Launch Commands
//!
//! Turns a [`LaunchSpec`] into the argument vector used to start the worker.
//! Building is pure; spawning lives in the supervisor.
//!
//! Token layout:
//!
//! ```text
//! <exe> [extra args...] [-h] [-f <config file>] [-l <severity>] > /dev/null 2>&1 &
//! ```
//!
//! Extra arguments come first so later flags win in binaries that apply the
//! last occurrence. The trailing tokens describe the launch mode (output
//! discarded, detached); they are rendered for display and logging while the
//! actual spawn applies them natively through [`LaunchCommand::stdout`],
//! [`LaunchCommand::stderr`] and [`LaunchCommand::detach`].

mod level;

pub use level::{LogLevel, LogLevelError};

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Help flag; the worker prints usage and exits
pub const HELP_FLAG: &str = "-h";
/// Configuration file flag
pub const CONFIG_FLAG: &str = "-f";
/// Log level flag
pub const LOG_LEVEL_FLAG: &str = "-l";
/// Rendered form of the discard-output, run-in-background launch mode
pub const DETACH_TOKENS: [&str; 3] = [">", "/dev/null", "2>&1"];
pub const BACKGROUND_TOKEN: &str = "&";

/// One configured-but-not-yet-running worker instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// Caller-chosen identifier, unique within a supervisor
    pub key: String,
    pub executable_path: PathBuf,
    /// `None` leaves the worker's default
    pub log_level: Option<LogLevel>,
    pub config_file: Option<PathBuf>,
    /// Ask the worker to print help and exit immediately
    pub show_help: bool,
    /// Raw arguments, split on whitespace
    pub extra_args: Option<String>,
}

impl LaunchSpec {
    pub fn new(key: impl Into<String>, executable_path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            executable_path: executable_path.into(),
            log_level: None,
            config_file: None,
            show_help: false,
            extra_args: None,
        }
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn show_help(mut self, show_help: bool) -> Self {
        self.show_help = show_help;
        self
    }

    pub fn extra_args(mut self, args: impl Into<String>) -> Self {
        self.extra_args = Some(args.into());
        self
    }
}

/// Where a launched process's output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Discard,
    Inherit,
}

/// A fully built launch, ready to spawn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub stdout: OutputMode,
    pub stderr: OutputMode,
    /// Run in a new process group, not waited on
    pub detach: bool,
}

impl LaunchCommand {
    /// Full argument vector including the launch-mode tokens
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::with_capacity(self.args.len() + 5);
        tokens.push(self.program.to_string_lossy().into_owned());
        tokens.extend(self.args.iter().cloned());

        if self.stdout == OutputMode::Discard {
            tokens.push(DETACH_TOKENS[0].to_string());
            tokens.push(DETACH_TOKENS[1].to_string());
            if self.stderr == OutputMode::Discard {
                tokens.push(DETACH_TOKENS[2].to_string());
            }
        }
        if self.detach {
            tokens.push(BACKGROUND_TOKEN.to_string());
        }
        tokens
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens().join(" "))
    }
}

/// Build the launch command for `spec`
pub fn build(spec: &LaunchSpec) -> LaunchCommand {
    let mut args = Vec::new();

    if let Some(ref extra) = spec.extra_args {
        args.extend(extra.split_whitespace().map(str::to_string));
    }

    // Later flags are still passed after -h; the worker ignores them
    if spec.show_help {
        args.push(HELP_FLAG.to_string());
    }

    if let Some(ref config_file) = spec.config_file {
        args.push(CONFIG_FLAG.to_string());
        args.push(config_file.to_string_lossy().into_owned());
    }

    if let Some(level) = spec.log_level {
        args.push(LOG_LEVEL_FLAG.to_string());
        args.push(level.severity().to_string());
    }

    LaunchCommand {
        program: spec.executable_path.clone(),
        args,
        stdout: OutputMode::Discard,
        stderr: OutputMode::Discard,
        detach: true,
    }
}
