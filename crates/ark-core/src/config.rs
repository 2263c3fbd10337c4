//! Centralized configuration for the ARK panel.
//!
//! Constant tables for file names, default locations, log limits and
//! timeouts, plus [`PanelPaths`], the runtime layout of the panel's own data
//! directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "ARK Server Panel";
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 5000;
    pub const DEFAULT_DATA_DIR: &'static str = ".";
}

/// Shared directory and file names.
pub struct PathsConfig;

impl PathsConfig {
    // Panel data directory
    pub const CONFIG_DIR_NAME: &'static str = "config";
    pub const LOGS_DIR_NAME: &'static str = "logs";
    pub const REGISTRY_FILENAME: &'static str = "servers.json";

    // Default base directory for server installations
    pub const DEFAULT_SERVERS_BASE: &'static str = "/home/arkserver/ark-servers";

    // Per-server files
    pub const INSTALLED_MARKER: &'static str = ".ark_installed";
    pub const VERSION_MARKER: &'static str = ".ark_version";
    pub const PID_FILENAME: &'static str = "ark_server.pid";
    pub const LAUNCH_SCRIPT: &'static str = "start_server.sh";
    pub const SETTINGS_SIDECAR: &'static str = ".ark_settings.json";
    pub const EXECUTABLE_NAME: &'static str = "ShooterGameServer";
    pub const PLATFORM_BINARIES_DIR: &'static str = "ShooterGame/Binaries/Linux";
    pub const RUNTIME_CONFIG_DIR: &'static str = "ShooterGame/Saved/Config/LinuxServer";
    pub const GAME_USER_SETTINGS: &'static str = "GameUserSettings.ini";
}

/// Defaults for driving SteamCMD.
pub struct InstallerConfig;

impl InstallerConfig {
    pub const STEAMCMD_PATH: &'static str = "/home/arkserver/steamcmd/steamcmd.sh";
    pub const APP_ID: u32 = 376030;
    pub const DEFAULT_BRANCH: &'static str = "preaquatica";
    pub const RUN_AS_USER: &'static str = "arkserver";
    pub const SETTLE_DELAY: Duration = Duration::from_secs(2);
    pub const STOP_SETTLE_DELAY: Duration = Duration::from_secs(2);
}

/// Log aggregation limits and formats.
pub struct LogConfig;

impl LogConfig {
    pub const DEFAULT_TAIL_LINES: usize = 500;
    pub const SPECIFIC_LOG_TAIL_LINES: usize = 1000;
    pub const TIMESTAMP_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";
    pub const DATE_FORMAT: &'static str = "%Y-%m-%d";
    pub const INSTALLATION_LOG: &'static str = "installation.log";
}

/// Query protocol settings.
pub struct QueryConfig;

impl QueryConfig {
    pub const TIMEOUT: Duration = Duration::from_secs(2);
}

/// Runtime layout of the panel's data directory.
///
/// ```text
/// <root>/config/servers.json
/// <root>/logs/server_<id>.log
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelPaths {
    root: PathBuf,
}

impl PanelPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join(PathsConfig::CONFIG_DIR_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(PathsConfig::LOGS_DIR_NAME)
    }

    pub fn registry_file(&self) -> PathBuf {
        self.config_dir().join(PathsConfig::REGISTRY_FILENAME)
    }
}

impl Default for PanelPaths {
    fn default() -> Self {
        Self::new(AppConfig::DEFAULT_DATA_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_paths_layout() {
        let paths = PanelPaths::new("/srv/panel");
        assert_eq!(paths.config_dir(), PathBuf::from("/srv/panel/config"));
        assert_eq!(paths.logs_dir(), PathBuf::from("/srv/panel/logs"));
        assert_eq!(
            paths.registry_file(),
            PathBuf::from("/srv/panel/config/servers.json")
        );
    }

    #[test]
    fn test_installer_defaults() {
        assert_eq!(InstallerConfig::APP_ID, 376030);
        assert_eq!(InstallerConfig::DEFAULT_BRANCH, "preaquatica");
        assert_eq!(InstallerConfig::SETTLE_DELAY, Duration::from_secs(2));
    }
}
