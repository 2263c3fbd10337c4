//! Install, force install and update.
//!
//! Every operation runs to completion before returning: the fetch tool is
//! spawned, its output streamed line by line into the logs, and the result
//! verified. Callers that want background execution spawn the future.

use crate::fanout::LogFanout;
use crate::phase::{InstallPhase, Operation, PhaseTracker};
use crate::steamcmd::{CombinedLines, FetchToolConfig, TOOL_NAME};
use ark_core::install_state::{self, InstallationState};
use ark_core::platform::set_executable;
use ark_core::{ArkError, LogStore, LogStream, Result, ServerDefinition};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Child;
use tracing::{debug, error, info, warn};

/// Result of a successful install or update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallOutcome {
    pub operation: Operation,
    pub server_id: u32,
    pub branch: String,
    pub phases: Vec<InstallPhase>,
    pub exit_code: Option<i32>,
    /// Lines of tool output written to the logs.
    pub lines: usize,
}

struct FetchResult {
    exit_code: Option<i32>,
    lines: usize,
}

/// Phase tracking plus logging for a single run.
struct Run {
    tracker: PhaseTracker,
    fanout: LogFanout,
}

impl Run {
    fn enter(&mut self, phase: InstallPhase) {
        if self.tracker.advance(phase) {
            self.fanout.line(&format!("Phase: {}", phase));
        }
    }

    fn note(&mut self, message: &str) {
        self.fanout.line(message);
    }

    fn fail(&mut self, err: ArkError) -> ArkError {
        error!("[{}] {}", self.fanout.tag(), err);
        self.fanout.line(&format!("ERROR: {}", err));
        self.enter(InstallPhase::Failed);
        err
    }
}

/// Drives SteamCMD for install and update, and owns uninstall.
#[derive(Debug, Clone)]
pub struct Installer {
    pub(crate) config: FetchToolConfig,
    pub(crate) logs: LogStore,
}

impl Installer {
    pub fn new(config: FetchToolConfig, logs: LogStore) -> Self {
        Self { config, logs }
    }

    pub fn config(&self) -> &FetchToolConfig {
        &self.config
    }

    pub fn logs(&self) -> &LogStore {
        &self.logs
    }

    /// Install into `def.path`.
    ///
    /// Fails with `AlreadyInstalled` when the server carries an install
    /// marker; use [`force_install`](Self::force_install) to reinstall.
    pub async fn install(
        &self,
        def: &ServerDefinition,
        branch: Option<&str>,
    ) -> Result<InstallOutcome> {
        if InstallationState::detect(def).is_installed() {
            return Err(ArkError::AlreadyInstalled { id: def.id });
        }
        self.run_install(def, branch, Operation::Install).await
    }

    /// Wipe `def.path` and install from scratch.
    ///
    /// The tool is checked before anything is removed, so a missing SteamCMD
    /// leaves the existing install in place.
    pub async fn force_install(
        &self,
        def: &ServerDefinition,
        branch: Option<&str>,
    ) -> Result<InstallOutcome> {
        self.run_install(def, branch, Operation::ForceInstall).await
    }

    /// Re-run the fetch tool over an existing install.
    pub async fn update(
        &self,
        def: &ServerDefinition,
        branch: Option<&str>,
    ) -> Result<InstallOutcome> {
        if !InstallationState::detect(def).is_installed() {
            return Err(ArkError::NotInstalled { id: def.id });
        }

        let branch = self.config.resolve_branch(branch);
        let mut run = Run {
            tracker: PhaseTracker::new(def.id, Operation::Update),
            fanout: LogFanout::open(&self.logs, LogStream::Update(def.id))?,
        };
        run.note(&format!(
            "Starting update of {} in {} (branch: {})",
            def.name,
            def.path.display(),
            branch
        ));

        run.enter(InstallPhase::Preparing);
        if let Err(e) = self.config.ensure_tool() {
            return Err(run.fail(e));
        }

        run.enter(InstallPhase::Fetching);
        let fetched = match self.fetch(&mut run, def, &branch).await {
            Ok(f) => f,
            Err(e) => return Err(run.fail(e)),
        };
        if fetched.exit_code != Some(0) {
            return Err(run.fail(exit_failure(fetched.exit_code)));
        }

        run.note("Update completed");
        run.enter(InstallPhase::Succeeded);
        Ok(InstallOutcome {
            operation: Operation::Update,
            server_id: def.id,
            branch,
            phases: run.tracker.phases(),
            exit_code: fetched.exit_code,
            lines: fetched.lines,
        })
    }

    async fn run_install(
        &self,
        def: &ServerDefinition,
        branch: Option<&str>,
        operation: Operation,
    ) -> Result<InstallOutcome> {
        let branch = self.config.resolve_branch(branch);
        let mut run = Run {
            tracker: PhaseTracker::new(def.id, operation),
            fanout: LogFanout::open(&self.logs, LogStream::Install(def.id))?,
        };
        run.note(&format!(
            "Starting installation of {} into {} (branch: {})",
            def.name,
            def.path.display(),
            branch
        ));

        run.enter(InstallPhase::Preparing);
        if let Err(e) = self.config.ensure_tool() {
            return Err(run.fail(e));
        }
        if operation == Operation::ForceInstall && def.path.exists() {
            info!("Removing {} before reinstall", def.path.display());
            run.note(&format!(
                "Removing existing directory for force install: {}",
                def.path.display()
            ));
            if let Err(e) = tokio::fs::remove_dir_all(&def.path).await {
                return Err(run.fail(ArkError::io_with_path(e, &def.path)));
            }
            tokio::time::sleep(self.config.settle_delay).await;
        }
        if let Err(e) = tokio::fs::create_dir_all(&def.path).await {
            return Err(run.fail(ArkError::io_with_path(e, &def.path)));
        }

        run.enter(InstallPhase::Fetching);
        let fetched = match self.fetch(&mut run, def, &branch).await {
            Ok(f) => f,
            Err(e) => return Err(run.fail(e)),
        };
        if fetched.exit_code != Some(0) {
            return Err(run.fail(exit_failure(fetched.exit_code)));
        }

        run.enter(InstallPhase::Verifying);
        let executable = match locate_executable(def) {
            Ok(path) => path,
            Err(reason) => {
                run.note("The download may have fetched a non-Linux build");
                return Err(run.fail(ArkError::ExternalToolFailure {
                    tool: TOOL_NAME.to_string(),
                    message: reason,
                }));
            }
        };

        run.enter(InstallPhase::Finalizing);
        if let Err(e) = finalize(def, &executable, &branch).await {
            return Err(run.fail(e));
        }

        run.note("Server installed successfully");
        run.enter(InstallPhase::Succeeded);
        Ok(InstallOutcome {
            operation,
            server_id: def.id,
            branch,
            phases: run.tracker.phases(),
            exit_code: fetched.exit_code,
            lines: fetched.lines,
        })
    }

    async fn fetch(
        &self,
        run: &mut Run,
        def: &ServerDefinition,
        branch: &str,
    ) -> Result<FetchResult> {
        run.note(&format!(
            "Command: {}",
            self.config.display_command(def, branch)
        ));

        let mut child = self
            .config
            .command(def, branch)
            .spawn()
            .map_err(|e| ArkError::ExternalToolFailure {
                tool: TOOL_NAME.to_string(),
                message: format!("failed to start: {}", e),
            })?;
        debug!("{} started for server {} (pid {:?})", TOOL_NAME, def.id, child.id());

        let mut output = CombinedLines::from_child(&mut child);
        let mut lines = 0;
        loop {
            match output.next_line().await {
                Ok(Some(line)) => {
                    run.fanout.line(&line);
                    lines += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Lost {} output for server {}: {}", TOOL_NAME, def.id, e);
                    run.note(&format!("Output stream failed, stopping {}: {}", TOOL_NAME, e));
                    abandon(&mut child);
                    break;
                }
            }
        }
        drop(output);

        let status = child.wait().await.map_err(|e| ArkError::ExternalToolFailure {
            tool: TOOL_NAME.to_string(),
            message: format!("failed to wait for exit: {}", e),
        })?;
        run.note(&format!("{} exited with {}", TOOL_NAME, status));

        Ok(FetchResult {
            exit_code: status.code(),
            lines,
        })
    }
}

/// Kill a child whose output is no longer read, so it cannot block forever
/// on a full pipe.
fn abandon(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!("Could not stop {}: {}", TOOL_NAME, e);
    }
}

fn exit_failure(code: Option<i32>) -> ArkError {
    let message = match code {
        Some(code) => format!("exited with code {}", code),
        None => "terminated by signal".to_string(),
    };
    ArkError::ExternalToolFailure {
        tool: TOOL_NAME.to_string(),
        message,
    }
}

/// Where the downloaded executable is. SteamCMD leaves it under the Linux
/// binaries dir; a validate run over an earlier install finds it already at
/// the root.
fn locate_executable(def: &ServerDefinition) -> std::result::Result<PathBuf, String> {
    let binaries = def.platform_binaries_dir();
    if !binaries.is_dir() {
        return Err("platform directory missing".to_string());
    }

    let nested = binaries.join(ark_core::config::PathsConfig::EXECUTABLE_NAME);
    if nested.is_file() {
        return Ok(nested);
    }
    let root = def.executable();
    if root.is_file() {
        return Ok(root);
    }
    Err("server executable missing".to_string())
}

async fn finalize(def: &ServerDefinition, executable: &Path, branch: &str) -> Result<()> {
    let target = def.executable();
    if executable != target.as_path() {
        tokio::fs::rename(executable, &target)
            .await
            .map_err(|e| ArkError::io_with_path(e, executable))?;
    }
    set_executable(&target)?;

    let def = def.clone();
    let branch = branch.to_string();
    tokio::task::spawn_blocking(move || install_state::write_markers(&def, &branch))
        .await
        .map_err(|e| ArkError::Other(format!("marker write task failed: {}", e)))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_core::registry::DEFAULT_CATALOG;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_locate_executable() {
        let temp = TempDir::new().unwrap();
        let def = DEFAULT_CATALOG[0].to_definition(temp.path());

        assert_eq!(
            locate_executable(&def).unwrap_err(),
            "platform directory missing"
        );

        fs::create_dir_all(def.platform_binaries_dir()).unwrap();
        assert_eq!(
            locate_executable(&def).unwrap_err(),
            "server executable missing"
        );

        fs::write(def.executable(), "").unwrap();
        assert_eq!(locate_executable(&def).unwrap(), def.executable());

        let nested = def.platform_binaries_dir().join("ShooterGameServer");
        fs::write(&nested, "").unwrap();
        assert_eq!(locate_executable(&def).unwrap(), nested);
    }

    #[tokio::test]
    async fn test_abandoned_writer_is_reaped() {
        let mut child = tokio::process::Command::new("yes")
            .stdout(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        // Hold the pipe without reading until the writer blocks.
        let _stdout = child.stdout.take();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        abandon(&mut child);
        let status = tokio::time::timeout(std::time::Duration::from_secs(5), child.wait())
            .await
            .expect("child still running")
            .unwrap();
        assert!(!status.success());
        assert_eq!(status.code(), None);
    }

    #[test]
    fn test_exit_failure_message() {
        let err = exit_failure(Some(8));
        assert!(err.to_string().contains("exited with code 8"));
        assert!(exit_failure(None).to_string().contains("signal"));
    }
}
