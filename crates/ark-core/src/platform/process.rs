//! Process table access and signalling.
//!
//! Enumeration goes through `sysinfo`; signals go through `nix` on unix.

use crate::error::{ArkError, Result};
use std::ffi::OsStr;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::{debug, warn};

/// One row of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    /// Arguments joined by single spaces.
    pub cmdline: String,
}

/// CPU and memory usage of one process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessUsage {
    pub cpu_percent: f32,
    pub memory_bytes: u64,
}

/// Check if a process with the given PID is alive.
///
/// # Platform Behavior
/// - **Linux/macOS**: `kill(pid, 0)`; `EPERM` still means the process exists
/// - **Other**: looks the PID up in the process table
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid as NixPid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        if raw <= 0 {
            return false;
        }
        match kill(NixPid::from_raw(raw), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    {
        let mut sys = System::new();
        let target = Pid::from_u32(pid);
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[target]),
            true,
            ProcessRefreshKind::new(),
        );
        sys.process(target).is_some()
    }
}

/// Send a graceful termination request.
///
/// Returns `Ok(false)` when the process no longer exists.
pub fn send_terminate(pid: u32) -> Result<bool> {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid as NixPid;

        let raw = i32::try_from(pid)
            .map_err(|_| ArkError::Other(format!("PID {} out of range", pid)))?;

        debug!("Sending SIGTERM to process {}", pid);
        match kill(NixPid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(e) => {
                warn!("Failed to send SIGTERM to {}: {}", pid, e);
                Err(ArkError::Other(format!(
                    "Failed to signal process {}: {}",
                    pid, e
                )))
            }
        }
    }

    #[cfg(not(unix))]
    {
        let mut sys = System::new();
        let target = Pid::from_u32(pid);
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[target]),
            true,
            ProcessRefreshKind::new(),
        );
        Ok(sys.process(target).map(|p| p.kill()).unwrap_or(false))
    }
}

/// Snapshot every process with its command line.
///
/// Processes whose command line cannot be read (other users, kernel
/// threads) come back with an empty command line and never match a pattern.
pub fn list_processes() -> Result<Vec<ProcessEntry>> {
    if !sysinfo::IS_SUPPORTED_SYSTEM {
        return Err(ArkError::ProbeFault {
            message: "process enumeration is not supported on this platform".into(),
        });
    }

    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::new().with_cmd(UpdateKind::Always),
    );

    let mut entries: Vec<ProcessEntry> = sys
        .processes()
        .iter()
        .map(|(pid, process)| ProcessEntry {
            pid: pid.as_u32(),
            cmdline: join_cmd(process.cmd()),
        })
        .collect();
    entries.sort_by_key(|e| e.pid);
    Ok(entries)
}

/// Command line of a single process, if it exists.
pub fn process_cmdline(pid: u32) -> Option<String> {
    let mut sys = System::new();
    let target = Pid::from_u32(pid);
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[target]),
        true,
        ProcessRefreshKind::new().with_cmd(UpdateKind::Always),
    );
    sys.process(target).map(|p| join_cmd(p.cmd()))
}

/// Sample CPU and memory for `pid`.
///
/// CPU usage needs two refreshes separated by sysinfo's minimum interval, so
/// this blocks for that long.
pub fn sample_usage(pid: u32) -> Option<ProcessUsage> {
    let mut sys = System::new();
    let target = Pid::from_u32(pid);
    let kind = ProcessRefreshKind::new().with_cpu().with_memory();

    sys.refresh_processes_specifics(ProcessesToUpdate::Some(&[target]), true, kind);
    sys.process(target)?;
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_processes_specifics(ProcessesToUpdate::Some(&[target]), true, kind);

    sys.process(target).map(|p| ProcessUsage {
        cpu_percent: p.cpu_usage(),
        memory_bytes: p.memory(),
    })
}

fn join_cmd<S: AsRef<OsStr>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| arg.as_ref().to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_process_alive_self() {
        assert!(is_process_alive(std::process::id()));
    }

    #[test]
    fn test_is_process_alive_nonexistent() {
        assert!(!is_process_alive(4_000_000_000));
    }

    #[test]
    fn test_list_processes_contains_self() {
        let me = std::process::id();
        let processes = list_processes().unwrap();
        assert!(processes.iter().any(|p| p.pid == me));
    }

    #[test]
    fn test_join_cmd() {
        let args = ["ShooterGameServer", "TheIsland?listen", "-Port=7777"];
        assert_eq!(join_cmd(&args), "ShooterGameServer TheIsland?listen -Port=7777");
    }
}
