//! In-memory host used by unit tests: a process table, a control program
//! that acts on the identity record the way `pg_ctl` would, and a sleeper
//! that only records pauses.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{ControlHandle, Host, ProcessTable, Sleeper, Spawner};
use crate::paths::pid_file_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRecord {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl SpawnRecord {
    pub fn operation(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Default)]
struct State {
    alive: HashSet<u32>,
    children: HashMap<u32, Vec<u32>>,
    /// Remaining successful liveness checks before a PID dies.
    expiring: HashMap<u32, usize>,
    spawns: Vec<SpawnRecord>,
    pauses: Vec<Duration>,
    next_pid: u32,
    fail_spawns: bool,
    start_fails: bool,
    /// Stop invocation (1-based) that brings the server down; `None` never does.
    stop_converges_on: Option<usize>,
    stop_calls: usize,
}

pub struct FakeHost {
    state: Mutex<State>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_pid: 1000,
                stop_converges_on: Some(1),
                ..State::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn into_host(self: Arc<Self>) -> Host {
        Host {
            table: Arc::clone(&self) as Arc<dyn ProcessTable>,
            spawner: Arc::clone(&self) as Arc<dyn Spawner>,
            sleeper: self as Arc<dyn Sleeper>,
        }
    }

    pub fn set_alive(&self, pid: u32) {
        self.lock().alive.insert(pid);
    }

    pub fn kill(&self, pid: u32) {
        self.lock().alive.remove(&pid);
    }

    pub fn set_children(&self, pid: u32, children: &[u32]) {
        self.lock().children.insert(pid, children.to_vec());
    }

    pub fn expire_after_checks(&self, pid: u32, checks: usize) {
        self.lock().expiring.insert(pid, checks);
    }

    pub fn fail_spawns(&self) {
        self.lock().fail_spawns = true;
    }

    pub fn start_fails(&self) {
        self.lock().start_fails = true;
    }

    pub fn stop_converges_on(&self, attempt: Option<usize>) {
        self.lock().stop_converges_on = attempt;
    }

    pub fn spawns(&self) -> Vec<SpawnRecord> {
        self.lock().spawns.clone()
    }

    pub fn operations(&self) -> Vec<String> {
        self.lock()
            .spawns
            .iter()
            .map(|s| s.operation().to_string())
            .collect()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.lock().pauses.clone()
    }

    /// Write an identity record for a live server, as if started elsewhere.
    pub fn boot(&self, pgdata: &Path) -> u32 {
        let mut state = self.lock();
        let pid = state.next_pid;
        state.next_pid += 1;
        state.alive.insert(pid);
        drop(state);
        write_pidfile(pgdata, pid);
        pid
    }

    fn act(&self, args: &[String]) {
        let Some(pgdata) = args
            .iter()
            .find_map(|a| a.strip_prefix("--pgdata="))
            .map(PathBuf::from)
        else {
            return;
        };

        match args.first().map(String::as_str) {
            Some("start") => {
                if !self.lock().start_fails {
                    self.boot(&pgdata);
                }
            }
            Some("restart") => {
                self.shutdown(&pgdata);
                self.boot(&pgdata);
            }
            Some("stop") => {
                let mut state = self.lock();
                state.stop_calls += 1;
                let converges = state.stop_converges_on == Some(state.stop_calls);
                drop(state);
                if converges {
                    self.shutdown(&pgdata);
                }
            }
            _ => {}
        }
    }

    fn shutdown(&self, pgdata: &Path) {
        let path = pid_file_path(pgdata);
        if let Some(pid) = fs::read_to_string(&path)
            .ok()
            .and_then(|c| c.lines().next().and_then(|l| l.trim().parse::<u32>().ok()))
        {
            self.kill(pid);
        }
        let _ = fs::remove_file(path);
    }
}

fn write_pidfile(pgdata: &Path, pid: u32) {
    let _ = fs::write(pid_file_path(pgdata), format!("{pid}\n{}\n", pgdata.display()));
}

impl ProcessTable for FakeHost {
    fn is_alive(&self, pid: u32) -> bool {
        let mut state = self.lock();
        if !state.alive.contains(&pid) {
            return false;
        }
        match state.expiring.get_mut(&pid) {
            Some(0) => {
                state.alive.remove(&pid);
                state.expiring.remove(&pid);
                false
            }
            Some(remaining) => {
                *remaining -= 1;
                true
            }
            None => true,
        }
    }

    fn children(&self, pid: u32) -> Vec<u32> {
        self.lock().children.get(&pid).cloned().unwrap_or_default()
    }
}

impl Spawner for FakeHost {
    fn spawn(&self, program: &Path, args: &[String]) -> io::Result<ControlHandle> {
        let mut state = self.lock();
        if state.fail_spawns {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        }
        state.spawns.push(SpawnRecord {
            program: program.to_path_buf(),
            args: args.to_vec(),
        });
        let pid = state.next_pid;
        state.next_pid += 1;
        drop(state);

        self.act(args);
        Ok(ControlHandle::detached(pid))
    }
}

impl Sleeper for FakeHost {
    fn sleep(&self, duration: Duration) {
        self.lock().pauses.push(duration);
    }
}
