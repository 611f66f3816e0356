//! Process management: the host seams, the identity record, the running
//! verdict and the control program executor.

mod control;
mod executor;
mod libpath;
mod pidfile;
mod state;

#[cfg(test)]
pub(crate) mod fake;

use std::io;
use std::path::Path;
use std::process::{Child, ExitStatus};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

pub use control::{is_process_alive, SystemProcessTable, SystemSpawner, ThreadSleeper};
pub use executor::CommandExecutor;
pub use libpath::{ensure_library_path, path_entries};
pub use pidfile::PidFile;
pub use state::{is_running, process_info, running_pid};

/// Maximum number of `stop` invocations before giving up on an instance.
pub const MAX_STOP_ATTEMPTS: u32 = 10;

/// Pause between `stop` invocations.
pub const STOP_RETRY_PAUSE: Duration = Duration::from_secs(5);

/// Read access to the OS process table.
pub trait ProcessTable: Send + Sync {
    /// Whether `pid` names a live (non-zombie) process right now.
    fn is_alive(&self, pid: u32) -> bool;

    /// Direct child PIDs of `pid`. Empty when the process is gone.
    fn children(&self, pid: u32) -> Vec<u32>;
}

/// Launches external programs.
pub trait Spawner: Send + Sync {
    fn spawn(&self, program: &Path, args: &[String]) -> io::Result<ControlHandle>;
}

/// Blocking timed pause.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// The OS facilities the lifecycle controller runs against.
#[derive(Clone)]
pub struct Host {
    pub table: Arc<dyn ProcessTable>,
    pub spawner: Arc<dyn Spawner>,
    pub sleeper: Arc<dyn Sleeper>,
}

impl Host {
    pub fn system() -> Self {
        Self {
            table: Arc::new(SystemProcessTable),
            spawner: Arc::new(SystemSpawner),
            sleeper: Arc::new(ThreadSleeper),
        }
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::system()
    }
}

/// Handle to a spawned control program.
#[derive(Debug)]
pub struct ControlHandle {
    pid: u32,
    child: Option<Child>,
}

impl ControlHandle {
    pub fn spawned(child: Child) -> Self {
        Self {
            pid: child.id(),
            child: Some(child),
        }
    }

    /// A handle with no child to wait on.
    pub fn detached(pid: u32) -> Self {
        Self { pid, child: None }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Block until the control program exits. Detached handles return `None`.
    pub fn wait(self) -> io::Result<Option<ExitStatus>> {
        match self.child {
            Some(mut child) => child.wait().map(Some),
            None => Ok(None),
        }
    }
}

/// Live process details for a running instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Direct children of the server process (backends and workers).
    pub children: usize,
}
