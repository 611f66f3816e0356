//! Centralized path utilities.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FleetError, Result};

/// Identity record written by the server into its data directory.
pub const PID_FILE_NAME: &str = "postmaster.pid";

/// Get the root data directory for the tool (~/.pgfleet).
pub fn get_data_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| FleetError::config("Cannot find home directory"))?;
    Ok(home.join(".pgfleet"))
}

/// Get the default path of the instance map.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("instances.toml"))
}

/// Get the path of the identity record for a data directory.
pub fn pid_file_path(pgdata: &Path) -> PathBuf {
    pgdata.join(PID_FILE_NAME)
}

/// Get the control program for a binaries root.
pub fn control_program_path(pgbinaries: &Path) -> PathBuf {
    pgbinaries.join("bin").join("pg_ctl")
}

/// Get the shared library directory for a binaries root.
pub fn library_dir(pgbinaries: &Path) -> PathBuf {
    pgbinaries.join("lib")
}

/// Make the directory enclosing `path`, returning it.
pub fn ensure_parent_dir(path: &Path) -> Result<Option<PathBuf>> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(None);
    };
    fs::create_dir_all(parent)
        .map_err(|e| FleetError::io(format!("Failed to create {}: {}", parent.display(), e)))?;
    Ok(Some(parent.to_path_buf()))
}
