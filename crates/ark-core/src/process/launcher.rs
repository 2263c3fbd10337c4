//! Starting and stopping game server processes.

use crate::error::{ArkError, Result};
use crate::install_state::InstallationState;
use crate::platform;
use crate::process::launch_script::LaunchScriptGenerator;
use crate::registry::ServerDefinition;
use crate::settings::ServerSettings;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, error, info, warn};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

/// Result of a start request. The server may still be loading.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchResult {
    pub pid: u32,
    pub script_path: PathBuf,
    pub log_path: PathBuf,
}

/// Process launcher for game servers.
pub struct ServerLauncher;

impl ServerLauncher {
    /// Regenerate the launch script and spawn it detached.
    ///
    /// Output goes to `log_path`, truncated on every start. Does not wait for
    /// the server to become reachable.
    pub fn start(
        def: &ServerDefinition,
        state: &InstallationState,
        settings: &ServerSettings,
        log_path: &Path,
    ) -> Result<LaunchResult> {
        if !state.is_installed() {
            return Err(ArkError::NotInstalled { id: def.id });
        }

        let config_dir = def.runtime_config_dir();
        fs::create_dir_all(&config_dir).map_err(|e| ArkError::io_with_path(e, &config_dir))?;

        let script_path = LaunchScriptGenerator::new(def, settings).generate()?;

        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ArkError::io_with_path(e, parent))?;
        }
        let file = fs::File::create(log_path).map_err(|e| ArkError::Io {
            message: "create run log".to_string(),
            path: Some(log_path.to_path_buf()),
            source: Some(e),
        })?;
        let stdout_file = file.try_clone().map_err(|e| ArkError::Io {
            message: "clone run log handle".to_string(),
            path: Some(log_path.to_path_buf()),
            source: Some(e),
        })?;

        let mut cmd = Command::new("bash");
        cmd.arg(&script_path)
            .current_dir(&def.path)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(file));

        // Own process group, so signals aimed at the panel's terminal do not
        // reach the game server.
        #[cfg(unix)]
        cmd.process_group(0);

        info!(
            "Launching server {} ({}) from {}",
            def.id,
            def.map,
            def.path.display()
        );

        let mut child = cmd.spawn().map_err(|e| {
            error!("Failed to spawn server {}: {}", def.id, e);
            ArkError::LaunchFailed {
                id: def.id,
                message: e.to_string(),
            }
        })?;
        let pid = child.id();

        if let Err(e) = fs::write(def.pid_file(), pid.to_string()) {
            warn!("Failed to write PID file for server {}: {}", def.id, e);
        }

        // Reap the child when it exits so it never lingers as a zombie.
        let reaper = std::thread::Builder::new()
            .name(format!("ark-reaper-{}", def.id))
            .spawn(move || match child.wait() {
                Ok(status) => debug!("Server process {} exited: {}", pid, status),
                Err(e) => debug!("wait() on {} failed: {}", pid, e),
            });
        if let Err(e) = reaper {
            warn!("Failed to start reaper thread for {}: {}", pid, e);
        }

        info!("Launched server {} with PID {}", def.id, pid);
        Ok(LaunchResult {
            pid,
            script_path,
            log_path: log_path.to_path_buf(),
        })
    }

    /// Send SIGTERM to every process carrying this server's signature and
    /// remove the PID file. Does not wait for exit.
    ///
    /// Returns the number of processes signalled.
    pub fn stop(def: &ServerDefinition) -> Result<usize> {
        let mut signalled = 0;
        for entry in platform::list_processes()? {
            if !matches_stop_signature(&entry.cmdline, def.game_port) {
                continue;
            }
            debug!("Stopping process {}: {}", entry.pid, entry.cmdline);
            match platform::send_terminate(entry.pid) {
                Ok(true) => signalled += 1,
                Ok(false) => {}
                Err(e) => warn!("Could not stop {}: {}", entry.pid, e),
            }
        }

        Self::remove_pid_file(&def.pid_file())?;
        info!("Stop requested for server {}: {} process(es) signalled", def.id, signalled);
        Ok(signalled)
    }

    pub fn remove_pid_file(pid_file: &Path) -> Result<()> {
        match fs::remove_file(pid_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ArkError::Io {
                message: "remove PID file".to_string(),
                path: Some(pid_file.to_path_buf()),
                source: Some(e),
            }),
        }
    }
}

/// `ShooterGameServer` followed later by `-Port=<port>` (or `?Port=`) with no
/// further digits.
pub fn matches_stop_signature(cmdline: &str, game_port: u16) -> bool {
    let Some(exe_at) = cmdline.find("ShooterGameServer") else {
        return false;
    };
    let rest = &cmdline[exe_at..];
    let needle = format!("Port={}", game_port);

    rest.match_indices(&needle).any(|(at, _)| {
        let preceded = rest[..at].ends_with(['-', '?']);
        let followed_by_digit = rest[at + needle.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit());
        preceded && !followed_by_digit
    })
}
