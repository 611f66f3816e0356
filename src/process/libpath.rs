//! Process-wide shared library search path.

use std::env;
use std::ffi::OsString;
use std::iter;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{FleetError, Result};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Guard serializing environment updates with process spawns.
pub(super) fn lock_env() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Entries of a path-list environment variable, empty entries dropped.
pub fn path_entries(var: &str) -> Vec<PathBuf> {
    env::var_os(var)
        .map(|value| {
            env::split_paths(&value)
                .filter(|entry| !entry.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Prepend `dir` to the search path in `var` unless an identical entry is
/// already present. Returns whether the variable changed. Existing entries,
/// empty ones included, are kept as they are.
///
/// The check and the update happen under one lock; the change is inherited
/// by every program spawned afterwards.
pub fn ensure_library_path(var: &str, dir: &Path) -> Result<bool> {
    let _guard = lock_env();

    if path_entries(var).iter().any(|entry| entry == dir) {
        return Ok(false);
    }

    let updated = prepended(dir, env::var_os(var))
        .map_err(|e| FleetError::launch(dir, format!("cannot add to {var}: {e}")))?;
    log::debug!("prepending {} to {}", dir.display(), var);
    env::set_var(var, updated);
    Ok(true)
}

fn prepended(
    dir: &Path,
    current: Option<OsString>,
) -> std::result::Result<OsString, env::JoinPathsError> {
    match current.filter(|value| !value.is_empty()) {
        Some(value) => {
            env::join_paths(iter::once(dir.to_path_buf()).chain(env::split_paths(&value)))
        }
        None => env::join_paths(iter::once(dir)),
    }
}

/// Set or clear a variable under the environment lock.
#[cfg(test)]
pub(crate) fn set_test_var(var: &str, value: Option<&str>) {
    let _guard = lock_env();
    match value {
        Some(value) => env::set_var(var, value),
        None => env::remove_var(var),
    }
}
