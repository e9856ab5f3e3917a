//! Live-process table access.
//!
//! Every liveness or stop decision is re-derived from the table, so the table sits behind a trait
//! and tests can substitute [`FakeProcessTable`].

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Read access to running processes plus the ability to signal them
pub trait ProcessTable {
    /// Identifiers of every process currently in the table
    fn pids(&self) -> io::Result<Vec<u32>>;

    /// Resolved executable path of `pid`
    ///
    /// Fails when the process is not inspectable (privilege, already exited).
    fn executable(&self, pid: u32) -> io::Result<PathBuf>;

    /// Short process name of `pid`
    fn name(&self, pid: u32) -> io::Result<String>;

    /// True when `pid` has exited but not been reaped yet
    fn is_zombie(&self, pid: u32) -> io::Result<bool>;

    /// Ask `pid` to terminate
    ///
    /// A process that no longer exists yields `ErrorKind::NotFound`.
    fn terminate(&self, pid: u32) -> io::Result<()>;
}

/// Process table backed by procfs
#[derive(Debug, Clone)]
pub struct ProcTable {
    root: PathBuf,
}

impl ProcTable {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for ProcTable {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcessTable for ProcTable {
    fn pids(&self) -> io::Result<Vec<u32>> {
        let mut pids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            // Entries can disappear while iterating
            let Ok(entry) = entry else { continue };
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(pid) = name.parse::<u32>() {
                    pids.push(pid);
                }
            }
        }
        Ok(pids)
    }

    fn executable(&self, pid: u32) -> io::Result<PathBuf> {
        std::fs::read_link(self.root.join(pid.to_string()).join("exe"))
    }

    fn name(&self, pid: u32) -> io::Result<String> {
        let comm = std::fs::read_to_string(self.root.join(pid.to_string()).join("comm"))?;
        Ok(comm.trim_end_matches('\n').to_string())
    }

    fn is_zombie(&self, pid: u32) -> io::Result<bool> {
        let stat = std::fs::read_to_string(self.root.join(pid.to_string()).join("stat"))?;
        // The name field may itself contain ')' so the state follows the last one
        let state = stat
            .rfind(')')
            .and_then(|end| stat[end + 1..].split_whitespace().next());
        match state {
            Some(state) => Ok(state == "Z"),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed stat for pid {}", pid),
            )),
        }
    }

    #[cfg(unix)]
    fn terminate(&self, pid: u32) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

        match signal::kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(io::Error::new(io::ErrorKind::NotFound, "process exited")),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self, _pid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "signals are only supported on unix",
        ))
    }
}

/// One process in a [`FakeProcessTable`]
#[derive(Debug, Clone)]
pub struct FakeProcess {
    pub name: String,
    /// `None` makes the executable unresolvable
    pub executable: Option<PathBuf>,
    /// Error returned when this process is signalled
    pub terminate_error: Option<io::ErrorKind>,
    /// Exited but not reaped
    pub zombie: bool,
}

/// In-memory process table for tests
///
/// Terminating a process removes it from the table.
#[derive(Debug, Default)]
pub struct FakeProcessTable {
    processes: Mutex<BTreeMap<u32, FakeProcess>>,
    signalled: Mutex<Vec<u32>>,
    unreadable: Mutex<bool>,
}

impl FakeProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an inspectable process
    pub fn insert(&self, pid: u32, name: &str, executable: impl Into<PathBuf>) {
        self.insert_process(
            pid,
            FakeProcess {
                name: name.to_string(),
                executable: Some(executable.into()),
                terminate_error: None,
                zombie: false,
            },
        );
    }

    /// Add a process whose executable cannot be resolved
    pub fn insert_hidden(&self, pid: u32, name: &str) {
        self.insert_process(
            pid,
            FakeProcess {
                name: name.to_string(),
                executable: None,
                terminate_error: None,
                zombie: false,
            },
        );
    }

    /// Add an exited, unreaped process: visible by name, executable gone
    pub fn insert_zombie(&self, pid: u32, name: &str) {
        self.insert_process(
            pid,
            FakeProcess {
                name: name.to_string(),
                executable: None,
                terminate_error: None,
                zombie: true,
            },
        );
    }

    pub fn insert_process(&self, pid: u32, process: FakeProcess) {
        if let Ok(mut processes) = self.processes.lock() {
            processes.insert(pid, process);
        }
    }

    pub fn remove(&self, pid: u32) {
        if let Ok(mut processes) = self.processes.lock() {
            processes.remove(&pid);
        }
    }

    /// Make the whole table unreadable
    pub fn set_unreadable(&self, unreadable: bool) {
        if let Ok(mut flag) = self.unreadable.lock() {
            *flag = unreadable;
        }
    }

    /// Pids that received a termination request, in order
    pub fn signalled(&self) -> Vec<u32> {
        self.signalled.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.processes
            .lock()
            .map(|p| p.contains_key(&pid))
            .unwrap_or(false)
    }

    fn with_process<R>(&self, pid: u32, f: impl FnOnce(&FakeProcess) -> io::Result<R>) -> io::Result<R> {
        let processes = self
            .processes
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "fake table poisoned"))?;
        match processes.get(&pid) {
            Some(process) => f(process),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such process")),
        }
    }
}

impl ProcessTable for FakeProcessTable {
    fn pids(&self) -> io::Result<Vec<u32>> {
        if self.unreadable.lock().map(|f| *f).unwrap_or(false) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "table unreadable"));
        }
        Ok(self
            .processes
            .lock()
            .map(|p| p.keys().copied().collect())
            .unwrap_or_default())
    }

    fn executable(&self, pid: u32) -> io::Result<PathBuf> {
        self.with_process(pid, |p| {
            p.executable
                .clone()
                .ok_or_else(|| io::Error::new(io::ErrorKind::PermissionDenied, "exe not readable"))
        })
    }

    fn name(&self, pid: u32) -> io::Result<String> {
        self.with_process(pid, |p| Ok(p.name.clone()))
    }

    fn is_zombie(&self, pid: u32) -> io::Result<bool> {
        self.with_process(pid, |p| Ok(p.zombie))
    }

    fn terminate(&self, pid: u32) -> io::Result<()> {
        self.with_process(pid, |p| match p.terminate_error {
            Some(kind) => Err(io::Error::new(kind, "terminate refused")),
            None => Ok(()),
        })?;
        if let Ok(mut signalled) = self.signalled.lock() {
            signalled.push(pid);
        }
        self.remove(pid);
        Ok(())
    }
}
