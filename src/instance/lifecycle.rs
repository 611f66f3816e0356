//! Instance lifecycle management (start/stop/restart/reload/promote/status).
//!
//! Process state is never cached: every decision re-reads the identity record
//! and the process table.

use std::sync::Arc;

use super::types::{InstanceStatus, Operation, OperationOutcome};
use crate::config::InstanceConfig;
use crate::error::{FleetError, Result};
use crate::process::{
    is_running, process_info, running_pid, CommandExecutor, Host, PidFile, ProcessInfo,
    ProcessTable, MAX_STOP_ATTEMPTS, STOP_RETRY_PAUSE,
};

/// Controls one configured instance.
pub struct InstanceController {
    name: String,
    config: InstanceConfig,
    pidfile: PidFile,
    executor: CommandExecutor,
    host: Host,
}

impl InstanceController {
    pub fn new(name: &str, config: InstanceConfig, library_path_var: &str, host: Host) -> Self {
        let executor =
            CommandExecutor::new(name, &config, library_path_var, Arc::clone(&host.spawner));
        Self {
            name: name.to_string(),
            pidfile: PidFile::for_data_dir(&config.pgdata),
            config,
            executor,
            host,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    pub fn pidfile(&self) -> &PidFile {
        &self.pidfile
    }

    fn table(&self) -> &dyn ProcessTable {
        self.host.table.as_ref()
    }

    pub fn is_running(&self) -> Result<bool> {
        is_running(&self.pidfile, self.table())
    }

    fn running_pid(&self) -> Result<Option<u32>> {
        running_pid(&self.pidfile, self.table())
    }

    pub fn process_info(&self) -> Result<Option<ProcessInfo>> {
        process_info(&self.pidfile, self.table())
    }

    /// Get status for an instance.
    pub fn status(&self) -> Result<InstanceStatus> {
        let info = self.process_info()?;
        Ok(InstanceStatus {
            name: self.name.clone(),
            running: info.is_some(),
            pid: info.map(|i| i.pid),
            children: info.map(|i| i.children),
            port: self.config.port,
        })
    }

    /// Start an instance. Returns whether it is running afterwards.
    pub fn start(&self) -> Result<bool> {
        if let Some(pid) = self.running_pid()? {
            log::info!("{} is already running ({})", self.name, pid);
            return Ok(true);
        }

        log::info!("starting {}", self.name);
        self.run_control(Operation::Start, &self.server_args())?;
        self.report_running("start")
    }

    /// Stop an instance, retrying until it is down or the attempts run out.
    pub fn stop(&self) -> Result<()> {
        let Some(mut last_pid) = self.running_pid()? else {
            log::info!("{} is already stopped", self.name);
            return Ok(());
        };

        for attempt in 1..=MAX_STOP_ATTEMPTS {
            if attempt == 1 {
                log::info!("stopping {} ({})", self.name, last_pid);
            } else {
                log::info!(
                    "{} ({}) not stopped yet, retrying (attempt {}/{})",
                    self.name,
                    last_pid,
                    attempt,
                    MAX_STOP_ATTEMPTS
                );
            }

            self.run_control(Operation::Stop, &[])?;

            match self.running_pid()? {
                None => {
                    log::info!("{} ({}) has stopped", self.name, last_pid);
                    return Ok(());
                }
                Some(pid) => last_pid = pid,
            }

            if attempt < MAX_STOP_ATTEMPTS {
                self.host.sleeper.sleep(STOP_RETRY_PAUSE);
            }
        }

        log::error!("server {} ({}) did not stop", self.name, last_pid);
        Err(FleetError::server_stop(&self.name, last_pid))
    }

    /// Restart an instance through the control program, or start it when it
    /// is not running.
    pub fn restart(&self) -> Result<bool> {
        if !self.is_running()? {
            log::warn!("{} is not running, just issuing start", self.name);
            return self.start();
        }

        log::info!("restarting {}", self.name);
        self.run_control(Operation::Restart, &self.server_args())?;
        self.report_running("restart")
    }

    /// Reload the configuration file for an instance.
    pub fn reload(&self) -> Result<()> {
        self.run_control(Operation::Reload, &[])
    }

    /// Promote an instance out of replication mode and allow writing.
    pub fn promote(&self) -> Result<()> {
        self.run_control(Operation::Promote, &[])
    }

    pub fn perform(&self, operation: Operation) -> Result<OperationOutcome> {
        match operation {
            Operation::Start => self
                .start()
                .map(|running| OperationOutcome::Running { running }),
            Operation::Stop => self.stop().map(|()| OperationOutcome::Stopped),
            Operation::Restart => self
                .restart()
                .map(|running| OperationOutcome::Running { running }),
            Operation::Reload => self.reload().map(|()| OperationOutcome::Issued),
            Operation::Promote => self.promote().map(|()| OperationOutcome::Issued),
            Operation::Status => self.status().map(OperationOutcome::Status),
        }
    }

    /// Named arguments for operations that bring the server up.
    fn server_args(&self) -> Vec<(String, String)> {
        let mut named = vec![("log".to_string(), self.config.log.display().to_string())];
        if !self.config.options.is_empty() {
            let options: Vec<String> = self
                .config
                .options
                .iter()
                .map(|(key, value)| format!("-c {key}={value}"))
                .collect();
            named.push(("options".to_string(), options.join(" ")));
        }
        named
    }

    fn report_running(&self, operation: &str) -> Result<bool> {
        let running = self.is_running()?;
        if running {
            log::info!("{} {} issued, server is up", self.name, operation);
        } else {
            log::error!("server {} did not {}", self.name, operation);
        }
        Ok(running)
    }

    /// Issue `operation` and wait for the control program to exit. A non-zero
    /// exit is logged; the caller re-derives state instead of trusting it.
    fn run_control(&self, operation: Operation, named: &[(String, String)]) -> Result<()> {
        let handle = self.executor.invoke(operation.as_str(), &[], named)?;
        let pid = handle.pid();
        match handle.wait() {
            Ok(Some(status)) if !status.success() => log::error!(
                "{} {} for {} exited with {}",
                self.executor.program().display(),
                operation,
                self.name,
                status
            ),
            Ok(_) => {}
            Err(e) => log::warn!(
                "lost track of {} {} for {} (pid {}): {}",
                self.executor.program().display(),
                operation,
                self.name,
                pid,
                e
            ),
        }
        Ok(())
    }
}
