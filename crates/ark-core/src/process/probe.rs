//! Process probe for game servers.
//!
//! A server's process is found by command line: it must contain
//! `ShooterGameServer <map>` and the decimal game port. The PID recorded by
//! the launcher is checked first; a stale or missing PID file falls back to
//! a full scan of the process table.
//!
//! The substring match is approximate. Another process carrying the same
//! map name and a port number anywhere in its command line will also match.

use crate::error::{ArkError, Result};
use crate::platform::{self, ProcessEntry};
use crate::registry::ServerDefinition;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Where a process was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessSource {
    /// Found via the launcher's PID file.
    PidFile,
    /// Found by scanning the process table.
    ProcessScan,
}

/// Live resource usage of a server process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetrics {
    pub pid: u32,
    pub cpu_percent: f32,
    pub memory_bytes: u64,
    pub source: ProcessSource,
}

impl ProcessMetrics {
    pub fn memory_mb(&self) -> f64 {
        self.memory_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Whether a command line belongs to `def`'s server.
pub fn matches_server(def: &ServerDefinition, cmdline: &str) -> bool {
    cmdline.contains(&def.process_signature()) && cmdline.contains(&def.game_port.to_string())
}

/// Read a PID file, ignoring anything unparseable.
pub fn read_pid_file(path: &Path) -> Option<u32> {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
}

/// Process probe bound to one server definition.
pub struct ProcessProbe<'a> {
    def: &'a ServerDefinition,
}

impl<'a> ProcessProbe<'a> {
    pub fn new(def: &'a ServerDefinition) -> Self {
        Self { def }
    }

    /// Locate the server's process without sampling usage.
    pub fn find(&self) -> Result<Option<(u32, ProcessSource)>> {
        if let Some(pid) = self.pid_from_file() {
            return Ok(Some((pid, ProcessSource::PidFile)));
        }

        let found = platform::list_processes()?
            .into_iter()
            .find(|ProcessEntry { cmdline, .. }| matches_server(self.def, cmdline));

        Ok(found.map(|entry| {
            debug!(
                "Found server {} process {} by scan",
                self.def.id, entry.pid
            );
            (entry.pid, ProcessSource::ProcessScan)
        }))
    }

    /// Fallible probe: `Ok(None)` means no matching process.
    ///
    /// Blocks for sysinfo's minimum CPU sampling interval when a process is
    /// found.
    pub fn probe(&self) -> Result<Option<ProcessMetrics>> {
        let Some((pid, source)) = self.find()? else {
            return Ok(None);
        };

        let usage = platform::sample_usage(pid);
        if usage.is_none() {
            debug!("Process {} exited while sampling", pid);
        }
        let usage = usage.unwrap_or(platform::ProcessUsage {
            cpu_percent: 0.0,
            memory_bytes: 0,
        });

        Ok(Some(ProcessMetrics {
            pid,
            cpu_percent: usage.cpu_percent,
            memory_bytes: usage.memory_bytes,
            source,
        }))
    }

    /// Whether a matching process exists. Probe faults count as not running.
    pub fn is_running(&self) -> bool {
        match self.find() {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!("Probe for server {} failed: {}", self.def.id, e);
                false
            }
        }
    }

    /// Metrics of the running process, or `ProcessNotRunning`.
    pub fn metrics(&self) -> Result<ProcessMetrics> {
        self.probe()?
            .ok_or(ArkError::ProcessNotRunning { id: self.def.id })
    }

    fn pid_from_file(&self) -> Option<u32> {
        let pid_file = self.def.pid_file();
        let pid = read_pid_file(&pid_file)?;

        if !platform::is_process_alive(pid) {
            debug!("Stale PID file {} (pid {})", pid_file.display(), pid);
            return None;
        }

        match platform::process_cmdline(pid) {
            Some(cmdline) if matches_server(self.def, &cmdline) => Some(pid),
            _ => {
                debug!(
                    "PID {} from {} does not belong to server {}",
                    pid,
                    pid_file.display(),
                    self.def.id
                );
                None
            }
        }
    }
}
