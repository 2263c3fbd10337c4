//! Point-in-time status snapshots.
//!
//! [`compose_status`] is a pure function of the installation state, the
//! probe result and the query result. Nothing here is cached.

use crate::config::LogConfig;
use crate::error::ArkError;
use crate::install_state::InstallationState;
use crate::process::ProcessMetrics;
use crate::query::QueryInfo;
use crate::registry::ServerDefinition;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived runtime state of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeStatus {
    NotInstalled,
    Offline,
    Online,
    Error,
}

impl RuntimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeStatus::NotInstalled => "not_installed",
            RuntimeStatus::Offline => "offline",
            RuntimeStatus::Online => "online",
            RuntimeStatus::Error => "error",
        }
    }
}

impl fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub server: ServerDefinition,
    pub status: RuntimeStatus,
    pub players: u32,
    pub max_players: u32,
    pub cpu_percent: f32,
    pub memory_mb: f64,
    pub pid: Option<u32>,
    pub last_check: String,
    pub version: String,
    pub install_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_error: Option<String>,
}

/// Counts over a batch of snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_servers: usize,
    pub installed_servers: usize,
    pub online_servers: usize,
    pub offline_servers: usize,
    pub total_players: u32,
}

impl DashboardStats {
    pub fn from_statuses(statuses: &[ServerStatus]) -> Self {
        let installed = statuses
            .iter()
            .filter(|s| s.status != RuntimeStatus::NotInstalled)
            .count();
        let online: Vec<_> = statuses
            .iter()
            .filter(|s| s.status == RuntimeStatus::Online)
            .collect();

        Self {
            total_servers: statuses.len(),
            installed_servers: installed,
            online_servers: online.len(),
            offline_servers: installed - online.len(),
            total_players: online.iter().map(|s| s.players).sum(),
        }
    }
}

/// Build a snapshot.
///
/// - `probe`: `Ok(None)` means no matching process; `Err` is a probe fault.
/// - `query`: only consulted when online; `Err` degrades to zero players.
pub fn compose_status(
    def: &ServerDefinition,
    state: &InstallationState,
    version: Option<String>,
    probe: Result<Option<ProcessMetrics>, ArkError>,
    query: Option<Result<QueryInfo, ArkError>>,
) -> ServerStatus {
    let mut snapshot = ServerStatus {
        server: def.clone(),
        status: RuntimeStatus::NotInstalled,
        players: 0,
        max_players: 0,
        cpu_percent: 0.0,
        memory_mb: 0.0,
        pid: None,
        last_check: Local::now().format(LogConfig::TIMESTAMP_FORMAT).to_string(),
        version: "N/A".to_string(),
        install_date: state.install_date_display(),
        error: None,
        query_error: None,
    };

    if !state.is_installed() {
        return snapshot;
    }
    snapshot.version = version.unwrap_or_else(|| "Unknown".to_string());

    match probe {
        Err(e) => {
            snapshot.status = RuntimeStatus::Error;
            snapshot.error = Some(e.to_string());
        }
        Ok(None) => snapshot.status = RuntimeStatus::Offline,
        Ok(Some(metrics)) => {
            snapshot.status = RuntimeStatus::Online;
            snapshot.pid = Some(metrics.pid);
            snapshot.cpu_percent = (metrics.cpu_percent * 10.0).round() / 10.0;
            snapshot.memory_mb = (metrics.memory_mb() * 10.0).round() / 10.0;
            match query {
                Some(Ok(info)) => {
                    snapshot.players = info.players;
                    snapshot.max_players = info.max_players;
                }
                Some(Err(e)) => snapshot.query_error = Some(e.to_string()),
                None => {}
            }
        }
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessSource;
    use crate::registry::DEFAULT_CATALOG;
    use std::path::Path;

    fn def() -> ServerDefinition {
        DEFAULT_CATALOG[0].to_definition(Path::new("/srv/ark"))
    }

    fn installed() -> InstallationState {
        InstallationState::Installed { installed_at: None }
    }

    fn metrics() -> ProcessMetrics {
        ProcessMetrics {
            pid: 4242,
            cpu_percent: 12.345,
            memory_bytes: 3 * 1024 * 1024 * 1024,
            source: ProcessSource::PidFile,
        }
    }

    #[test]
    fn test_not_installed_ignores_probe() {
        let status = compose_status(
            &def(),
            &InstallationState::NotInstalled,
            None,
            Ok(Some(metrics())),
            None,
        );
        assert_eq!(status.status, RuntimeStatus::NotInstalled);
        assert_eq!(status.version, "N/A");
        assert_eq!(status.install_date, "N/A");
        assert_eq!(status.pid, None);
    }

    #[test]
    fn test_offline_when_no_process() {
        let status = compose_status(&def(), &installed(), None, Ok(None), None);
        assert_eq!(status.status, RuntimeStatus::Offline);
        assert_eq!(status.version, "Unknown");
    }

    #[test]
    fn test_online_with_query() {
        let info = QueryInfo {
            name: "x".into(),
            map: "TheIsland".into(),
            players: 5,
            max_players: 70,
        };
        let status = compose_status(
            &def(),
            &installed(),
            Some("Branch: preaquatica".into()),
            Ok(Some(metrics())),
            Some(Ok(info)),
        );
        assert_eq!(status.status, RuntimeStatus::Online);
        assert_eq!(status.players, 5);
        assert_eq!(status.max_players, 70);
        assert_eq!(status.cpu_percent, 12.3);
        assert_eq!(status.memory_mb, 3072.0);
    }

    #[test]
    fn test_query_fault_degrades() {
        let status = compose_status(
            &def(),
            &installed(),
            None,
            Ok(Some(metrics())),
            Some(Err(ArkError::Other("timeout".into()))),
        );
        assert_eq!(status.status, RuntimeStatus::Online);
        assert_eq!(status.players, 0);
        assert!(status.query_error.is_some());
    }

    #[test]
    fn test_probe_fault_is_error() {
        let status = compose_status(
            &def(),
            &installed(),
            None,
            Err(ArkError::ProbeFault {
                message: "denied".into(),
            }),
            None,
        );
        assert_eq!(status.status, RuntimeStatus::Error);
        assert_eq!(status.players, 0);
        assert!(status.error.unwrap().contains("denied"));
    }

    #[test]
    fn test_dashboard_counts() {
        let online = {
            let mut s = compose_status(&def(), &installed(), None, Ok(Some(metrics())), None);
            s.players = 7;
            s
        };
        let offline = compose_status(&def(), &installed(), None, Ok(None), None);
        let missing =
            compose_status(&def(), &InstallationState::NotInstalled, None, Ok(None), None);

        let stats = DashboardStats::from_statuses(&[online, offline, missing]);
        assert_eq!(stats.total_servers, 3);
        assert_eq!(stats.installed_servers, 2);
        assert_eq!(stats.online_servers, 1);
        assert_eq!(stats.offline_servers, 1);
        assert_eq!(stats.total_players, 7);
    }
}
