//! Best-effort uninstall.

use crate::fanout::LogFanout;
use crate::orchestrator::Installer;
use ark_core::install_state;
use ark_core::{ArkError, Result, ServerDefinition, ServerLauncher};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UninstallStep {
    StopProcesses,
    RemoveMarkers,
    RemoveDirectory,
    RemoveLogs,
}

impl fmt::Display for UninstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UninstallStep::StopProcesses => "stop processes",
            UninstallStep::RemoveMarkers => "remove markers",
            UninstallStep::RemoveDirectory => "remove directory",
            UninstallStep::RemoveLogs => "remove logs",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: UninstallStep,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UninstallReport {
    pub server_id: u32,
    pub steps: Vec<StepOutcome>,
}

impl UninstallReport {
    pub fn all_ok(&self) -> bool {
        self.steps.iter().all(|s| s.ok)
    }

    fn record(&mut self, fanout: &mut LogFanout, step: UninstallStep, result: Result<String>) {
        let outcome = match result {
            Ok(detail) => StepOutcome {
                step,
                ok: true,
                detail,
            },
            Err(e) => {
                warn!("Uninstall of server {}: {} failed: {}", self.server_id, step, e);
                StepOutcome {
                    step,
                    ok: false,
                    detail: e.to_string(),
                }
            }
        };
        fanout.line(&format!(
            "{}: {} ({})",
            step,
            if outcome.ok { "ok" } else { "failed" },
            outcome.detail
        ));
        self.steps.push(outcome);
    }
}

impl Installer {
    /// Stop, delete markers, delete the install tree and the server's logs.
    ///
    /// Each step runs regardless of earlier failures. Only a directory that
    /// survives the run fails the whole operation.
    pub async fn uninstall(&self, def: &ServerDefinition) -> Result<UninstallReport> {
        let mut fanout = LogFanout::global_only(&self.logs, format!("UNINSTALL_SERVER_{}", def.id))?;
        fanout.line(&format!(
            "Starting uninstall of {} at {}",
            def.name,
            def.path.display()
        ));
        let mut report = UninstallReport {
            server_id: def.id,
            steps: Vec::new(),
        };

        let stopped = {
            let def = def.clone();
            tokio::task::spawn_blocking(move || ServerLauncher::stop(&def))
                .await
                .map_err(|e| ArkError::Other(format!("stop task failed: {}", e)))
                .and_then(|r| r)
        };
        let signalled = *stopped.as_ref().unwrap_or(&0);
        report.record(
            &mut fanout,
            UninstallStep::StopProcesses,
            stopped.map(|n| format!("{} process(es) signalled", n)),
        );
        if signalled > 0 {
            tokio::time::sleep(self.config.stop_settle_delay).await;
        }

        report.record(
            &mut fanout,
            UninstallStep::RemoveMarkers,
            install_state::remove_markers(def).map(|_| "markers removed".to_string()),
        );

        let removed = if def.path.exists() {
            tokio::fs::remove_dir_all(&def.path)
                .await
                .map(|_| format!("removed {}", def.path.display()))
                .map_err(|e| ArkError::io_with_path(e, &def.path))
        } else {
            Ok(format!("{} not found", def.path.display()))
        };
        report.record(&mut fanout, UninstallStep::RemoveDirectory, removed);

        let log_results = self.logs.remove_server_logs(def.id);
        let failures: Vec<String> = log_results
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| format!("{}: {}", name, e)))
            .collect();
        let logs_result = if failures.is_empty() {
            Ok(format!("{} log file(s) checked", log_results.len()))
        } else {
            Err(ArkError::Other(failures.join("; ")))
        };
        report.record(&mut fanout, UninstallStep::RemoveLogs, logs_result);

        if def.path.exists() {
            fanout.line("Uninstall incomplete");
            return Err(ArkError::UninstallIncomplete {
                id: def.id,
                path: def.path.clone(),
            });
        }

        info!("Server {} uninstalled", def.id);
        fanout.line("Server uninstalled");
        Ok(report)
    }
}
