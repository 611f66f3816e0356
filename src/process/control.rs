//! System implementations of the process seams.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use sysinfo::{Pid, Process, ProcessStatus, ProcessesToUpdate, System};

use super::libpath::lock_env;
use super::{ControlHandle, ProcessTable, Sleeper, Spawner};

/// Check if a process is alive by PID.
///
/// A process owned by another user answers `EPERM`, which still means it exists.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid as NixPid;

    // pid 0 and negative values address process groups, never one process
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }

    matches!(kill(NixPid::from_raw(raw), None), Ok(()) | Err(Errno::EPERM))
}

/// Check if a process is alive by PID.
#[cfg(not(unix))]
pub fn is_process_alive(pid: u32) -> bool {
    let mut system = System::new();
    let target = Pid::from_u32(pid);
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    system.process(target).is_some()
}

fn is_zombie(pid: u32) -> bool {
    let mut system = System::new();
    let target = Pid::from_u32(pid);
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    matches!(
        system.process(target).map(Process::status),
        Some(ProcessStatus::Zombie)
    )
}

/// Process table backed by signals and `sysinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessTable;

impl ProcessTable for SystemProcessTable {
    fn is_alive(&self, pid: u32) -> bool {
        is_process_alive(pid) && !is_zombie(pid)
    }

    fn children(&self, pid: u32) -> Vec<u32> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let parent = Pid::from_u32(pid);
        let mut children: Vec<u32> = system
            .processes()
            .values()
            .filter(|p| p.thread_kind().is_none() && p.parent() == Some(parent))
            .map(|p| p.pid().as_u32())
            .collect();
        children.sort_unstable();
        children
    }
}

/// Spawns programs as plain child processes sharing our environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSpawner;

impl Spawner for SystemSpawner {
    fn spawn(&self, program: &Path, args: &[String]) -> io::Result<ControlHandle> {
        let _env = lock_env();
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()?;
        Ok(ControlHandle::spawned(child))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
