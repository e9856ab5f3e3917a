//! Process Supervisor
//!
//! Starts worker instances from registered launch specs and answers "is a
//! worker running?" by scanning the live-process table instead of asking
//! the handles returned at launch. Those handles are kept only to reap
//! workers that have exited. Two predicates are deliberately
//! distinct:
//!
//! - liveness ([`ProcessSupervisor::is_alive`]) matches the resolved
//!   executable path exactly;
//! - stopping ([`ProcessSupervisor::stop_all`]) matches the process name
//!   against a pattern, which also catches stray instances started elsewhere.
//!
//! A supervisor has a single owner; it does no internal locking.

mod table;

pub use table::{FakeProcess, FakeProcessTable, ProcTable, ProcessTable};

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use regex_lite::Regex;
use tracing::{debug, info, warn};

use crate::config::SupervisorConfig;
use crate::launch::{self, LaunchCommand, LaunchSpec, OutputMode};

/// Supervisor errors
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Unknown instance key '{0}'")]
    UnknownKey(String),

    #[error("Failed to launch instance '{key}': {reason}")]
    Launch { key: String, reason: String },

    #[error("Failed to issue termination: {0}")]
    Termination(String),

    #[error("Invalid process name pattern: {0}")]
    InvalidPattern(#[from] regex_lite::Error),
}

/// Supervises worker instances through a [`ProcessTable`]
pub struct ProcessSupervisor<T: ProcessTable = ProcTable> {
    executable_path: PathBuf,
    name_pattern: Regex,
    table: T,
    specs: HashMap<String, LaunchCommand>,
    /// Detached children, held only so they can be reaped once they exit
    children: Vec<Child>,
}

impl ProcessSupervisor<ProcTable> {
    /// Supervisor over the real procfs table described by `config`
    pub fn from_config(config: &SupervisorConfig) -> Result<Self, SupervisorError> {
        Self::new(
            &config.executable_path,
            &config.process_name,
            ProcTable::new(&config.proc_root),
        )
    }
}

impl<T: ProcessTable> ProcessSupervisor<T> {
    pub fn new(
        executable_path: impl Into<PathBuf>,
        process_name: &str,
        table: T,
    ) -> Result<Self, SupervisorError> {
        Ok(Self {
            executable_path: executable_path.into(),
            name_pattern: Regex::new(process_name)?,
            table,
            specs: HashMap::new(),
            children: Vec::new(),
        })
    }

    pub fn executable_path(&self) -> &Path {
        &self.executable_path
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    /// Build and store the command for `spec`, replacing any previous spec
    /// with the same key
    pub fn register(&mut self, spec: &LaunchSpec) -> &LaunchCommand {
        let command = launch::build(spec);
        debug!(key = %spec.key, command = %command, "Registered c3qo instance");
        self.specs.insert(spec.key.clone(), command);
        &self.specs[&spec.key]
    }

    /// Built command for `key`, without launching it
    pub fn command(&self, key: &str) -> Option<&LaunchCommand> {
        self.specs.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Launch the instance registered under `key`
    ///
    /// Detached commands are spawned and not waited on. Success means the
    /// process was created, not that the worker is still running.
    pub fn start(&mut self, key: &str) -> Result<(), SupervisorError> {
        let command = self
            .specs
            .get(key)
            .ok_or_else(|| SupervisorError::UnknownKey(key.to_string()))?;

        let child = spawn(command).map_err(|reason| SupervisorError::Launch {
            key: key.to_string(),
            reason,
        })?;

        info!(key = %key, command = %command, "Started c3qo instance");
        self.children.extend(child);
        Ok(())
    }

    /// True when any process in the table runs the configured executable
    ///
    /// Global check: not limited to instances started by this supervisor.
    pub fn is_alive(&self) -> bool {
        let pids = match self.table.pids() {
            Ok(pids) => pids,
            Err(e) => {
                warn!(error = %e, "Cannot read process table");
                return false;
            }
        };

        pids.into_iter().any(|pid| self.runs_executable(pid))
    }

    /// Path predicate used by liveness
    pub fn runs_executable(&self, pid: u32) -> bool {
        // Uninspectable entries are skipped, never reported
        match self.table.executable(pid) {
            Ok(path) => path == self.executable_path,
            Err(_) => false,
        }
    }

    /// Name predicate used by `stop_all`
    pub fn matches_name(&self, pid: u32) -> bool {
        match self.table.name(pid) {
            Ok(name) => self.name_pattern.is_match(&name),
            Err(_) => false,
        }
    }

    /// Send a termination request to every process whose name matches
    ///
    /// Returns how many processes were signalled; zero is not an error.
    /// Processes that have already exited are skipped, and exited children
    /// of this supervisor are reaped first. Registered specs are cleared whether or not every signal was issued.
    pub fn stop_all(&mut self) -> Result<usize, SupervisorError> {
        self.specs.clear();
        self.reap();

        let own_pid = std::process::id();
        let pids = self
            .table
            .pids()
            .map_err(|e| SupervisorError::Termination(format!("cannot read process table: {}", e)))?;

        let mut signalled = 0;
        for pid in pids {
            if pid == own_pid || !self.matches_name(pid) {
                continue;
            }
            // Exited but not yet reaped by its parent
            if self.table.is_zombie(pid).unwrap_or(false) {
                debug!(pid, "Skipping exited c3qo process");
                continue;
            }
            match self.table.terminate(pid) {
                Ok(()) => signalled += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(SupervisorError::Termination(format!(
                        "cannot signal process {}: {}",
                        pid, e
                    )));
                }
            }
        }

        info!(count = signalled, pattern = self.name_pattern.as_str(), "Killed every c3qo instance");
        Ok(signalled)
    }

    /// Collect exit statuses of launched children that have terminated
    fn reap(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = child.id(), status = %status, "Reaped c3qo instance");
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!(pid = child.id(), error = %e, "Cannot query c3qo instance");
                false
            }
        });
    }

    /// Poll until liveness equals `expected`
    ///
    /// Checks at most `attempts` times, sleeping `interval` between checks.
    pub fn wait_for_liveness(&self, expected: bool, attempts: u32, interval: Duration) -> bool {
        for attempt in 0..attempts {
            if self.is_alive() == expected {
                return true;
            }
            if attempt + 1 < attempts {
                std::thread::sleep(interval);
            }
        }
        false
    }
}

fn stdio(mode: OutputMode) -> Stdio {
    match mode {
        OutputMode::Discard => Stdio::null(),
        OutputMode::Inherit => Stdio::inherit(),
    }
}

/// Keep the worker out of the caller's process group and its signals
#[cfg(unix)]
fn new_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn new_process_group(_cmd: &mut Command) {}

/// Run `command`; detached launches hand back the child for later reaping
fn spawn(command: &LaunchCommand) -> Result<Option<Child>, String> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(stdio(command.stdout))
        .stderr(stdio(command.stderr));

    if command.detach {
        new_process_group(&mut cmd);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| format!("{}: {}", command.program.display(), e))?;

    if command.detach {
        // Liveness is still read back from the process table
        return Ok(Some(child));
    }

    let status = child.wait().map_err(|e| e.to_string())?;
    if !status.success() {
        return Err(format!("launcher exited with {}", status));
    }
    Ok(None)
}
