//! Builds and launches control program invocations for one instance.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::libpath::ensure_library_path;
use super::{ControlHandle, Spawner};
use crate::config::InstanceConfig;
use crate::error::{FleetError, Result};
use crate::paths::{control_program_path, library_dir};

pub struct CommandExecutor {
    instance: String,
    program: PathBuf,
    pgdata: PathBuf,
    library_dir: PathBuf,
    library_path_var: String,
    spawner: Arc<dyn Spawner>,
}

impl CommandExecutor {
    pub fn new(
        instance: &str,
        config: &InstanceConfig,
        library_path_var: &str,
        spawner: Arc<dyn Spawner>,
    ) -> Self {
        Self {
            instance: instance.to_string(),
            program: control_program_path(&config.pgbinaries),
            pgdata: config.pgdata.clone(),
            library_dir: library_dir(&config.pgbinaries),
            library_path_var: library_path_var.to_string(),
            spawner,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Argument list for `operation`: the data directory always comes first,
    /// then positionals in order, then `--name=value` pairs in order.
    pub fn build_args(
        &self,
        operation: &str,
        positional: &[String],
        named: &[(String, String)],
    ) -> Vec<String> {
        let mut args = vec![
            operation.to_string(),
            "--silent".to_string(),
            format!("--pgdata={}", self.pgdata.display()),
        ];
        args.extend(positional.iter().cloned());
        args.extend(named.iter().map(|(name, value)| format!("--{name}={value}")));
        args
    }

    /// Launch the control program and return without waiting for it.
    pub fn invoke(
        &self,
        operation: &str,
        positional: &[String],
        named: &[(String, String)],
    ) -> Result<ControlHandle> {
        if ensure_library_path(&self.library_path_var, &self.library_dir)? {
            log::debug!(
                "prepended {} to {} for {}",
                self.library_dir.display(),
                self.library_path_var,
                self.instance
            );
        }

        let args = self.build_args(operation, positional, named);
        log::debug!("issuing {} for instance {}", operation, self.instance);
        log::debug!("args are: {:?}", args);

        let handle = self
            .spawner
            .spawn(&self.program, &args)
            .map_err(|e| FleetError::launch(&self.program, e.to_string()))?;
        log::debug!(
            "{} for {} running as pid {}",
            operation,
            self.instance,
            handle.pid()
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::process::fake::FakeHost;
    use crate::process::libpath::set_test_var;
    use crate::process::path_entries;

    fn executor(host: &Arc<FakeHost>, var: &str, pgbinaries: &str) -> CommandExecutor {
        let config = InstanceConfig::new("/srv/pg/main", pgbinaries, "/var/log/pg/main.log");
        let spawner: Arc<dyn Spawner> = Arc::clone(host) as Arc<dyn Spawner>;
        CommandExecutor::new("main", &config, var, spawner)
    }

    #[test]
    fn orders_data_dir_positionals_then_named() {
        let host = Arc::new(FakeHost::new());
        let exec = executor(&host, "PGFLEET_TEST_EXEC_ORDER", "/usr/lib/postgresql/16");
        let args = exec.build_args(
            "start",
            &["-W".to_string()],
            &[
                ("log".to_string(), "/var/log/pg/main.log".to_string()),
                ("timeout".to_string(), "30".to_string()),
            ],
        );
        assert_eq!(
            args,
            vec![
                "start",
                "--silent",
                "--pgdata=/srv/pg/main",
                "-W",
                "--log=/var/log/pg/main.log",
                "--timeout=30",
            ]
        );
    }

    #[test]
    fn invoke_spawns_control_program() {
        let host = Arc::new(FakeHost::new());
        let exec = executor(&host, "PGFLEET_TEST_EXEC_SPAWN", "/usr/lib/postgresql/16");
        exec.invoke("reload", &[], &[]).unwrap();

        let spawns = host.spawns();
        assert_eq!(spawns.len(), 1);
        assert_eq!(
            spawns[0].program,
            PathBuf::from("/usr/lib/postgresql/16/bin/pg_ctl")
        );
        assert_eq!(spawns[0].args[0], "reload");
    }

    #[test]
    fn shared_library_dir_added_once_across_instances() {
        let var = "PGFLEET_TEST_EXEC_LIBPATH";
        set_test_var(var, Some("/usr/local/lib"));
        let host = Arc::new(FakeHost::new());
        let first = executor(&host, var, "/usr/lib/postgresql/16");
        let config =
            InstanceConfig::new("/srv/pg/other", "/usr/lib/postgresql/16", "/tmp/o.log");
        let spawner: Arc<dyn Spawner> = Arc::clone(&host) as Arc<dyn Spawner>;
        let second = CommandExecutor::new("other", &config, var, spawner);

        first.invoke("status", &[], &[]).unwrap();
        first.invoke("reload", &[], &[]).unwrap();
        second.invoke("reload", &[], &[]).unwrap();

        let lib = PathBuf::from("/usr/lib/postgresql/16/lib");
        let entries = path_entries(var);
        assert_eq!(entries.iter().filter(|e| **e == lib).count(), 1);
        assert_eq!(entries[0], lib);
    }

    #[test]
    fn spawn_failure_is_launch_error() {
        let host = Arc::new(FakeHost::new());
        host.fail_spawns();
        let exec = executor(&host, "PGFLEET_TEST_EXEC_FAIL", "/nowhere");
        let err = exec.invoke("start", &[], &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Launch);
        assert_eq!(err.detail("program"), Some("/nowhere/bin/pg_ctl"));
    }
}
