//! The identity record a server leaves in its data directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::ProcessTable;
use crate::error::{FleetError, Result};
use crate::paths::pid_file_path;

/// Read-only view of `postmaster.pid`. The file is written by the server,
/// never by us; every query re-reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn for_data_dir(pgdata: &Path) -> Self {
        Self {
            path: pid_file_path(pgdata),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// PID of the live process recorded in the file.
    ///
    /// A recorded PID with no live process makes the file stale: it is removed
    /// and `None` is returned.
    pub fn pid(&self, table: &dyn ProcessTable) -> Result<Option<u32>> {
        let Some(pid) = self.read()? else {
            return Ok(None);
        };

        if table.is_alive(pid) {
            return Ok(Some(pid));
        }

        log::warn!("removing stale pidfile {} ({})", self.path.display(), pid);
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            // someone else cleaned up first
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(FleetError::file_access(&self.path, e.to_string())),
        }
        Ok(None)
    }

    /// Recorded PID without a liveness check. Unparsable content reads as absent.
    fn read(&self) -> Result<Option<u32>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FleetError::file_access(&self.path, e.to_string())),
        };

        let content = String::from_utf8_lossy(&bytes);
        let first_line = content.lines().next().unwrap_or("").trim();
        match first_line.parse::<u32>() {
            Ok(pid) if pid > 0 && i32::try_from(pid).is_ok() => Ok(Some(pid)),
            _ => {
                log::debug!(
                    "ignoring unparsable pidfile {}: {:?}",
                    self.path.display(),
                    first_line
                );
                Ok(None)
            }
        }
    }
}
