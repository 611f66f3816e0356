//! The running verdict: identity record plus live process table.

use super::{PidFile, ProcessInfo, ProcessTable};
use crate::error::Result;

/// Whether the instance owning `record` is running at this moment.
///
/// The process may exit between reading the record and the second liveness
/// check; that disagreement reads as "not running".
pub fn is_running(record: &PidFile, table: &dyn ProcessTable) -> Result<bool> {
    Ok(running_pid(record, table)?.is_some())
}

/// PID of the running instance, confirmed live after the record was read.
pub fn running_pid(record: &PidFile, table: &dyn ProcessTable) -> Result<Option<u32>> {
    Ok(record.pid(table)?.filter(|&pid| table.is_alive(pid)))
}

/// PID and child count of the running instance, `None` when stopped.
pub fn process_info(record: &PidFile, table: &dyn ProcessTable) -> Result<Option<ProcessInfo>> {
    let Some(pid) = running_pid(record, table)? else {
        return Ok(None);
    };
    Ok(Some(ProcessInfo {
        pid,
        children: table.children(pid).len(),
    }))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::process::fake::FakeHost;

    #[test]
    fn no_record_is_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new();
        let record = PidFile::for_data_dir(dir.path());
        assert!(!is_running(&record, &host).unwrap());
        assert_eq!(process_info(&record, &host).unwrap(), None);
    }

    #[test]
    fn stale_record_is_cleaned_by_one_query() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new();
        let record = PidFile::for_data_dir(dir.path());
        fs::write(record.path(), "999\n").unwrap();

        assert!(!is_running(&record, &host).unwrap());
        assert!(!record.exists());
    }

    #[test]
    fn reports_pid_and_children() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new();
        host.set_alive(700);
        host.set_children(700, &[701, 702, 703]);
        let record = PidFile::for_data_dir(dir.path());
        fs::write(record.path(), "700\n").unwrap();

        assert!(is_running(&record, &host).unwrap());
        assert_eq!(
            process_info(&record, &host).unwrap(),
            Some(ProcessInfo {
                pid: 700,
                children: 3
            })
        );
    }

    #[test]
    fn process_exiting_between_checks_is_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new();
        host.set_alive(800);
        // alive for the record read, gone for the verdict
        host.expire_after_checks(800, 1);
        let record = PidFile::for_data_dir(dir.path());
        fs::write(record.path(), "800\n").unwrap();

        assert!(!is_running(&record, &host).unwrap());
    }
}
