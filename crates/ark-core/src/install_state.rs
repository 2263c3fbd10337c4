//! Installation state derived from marker files.
//!
//! A server is installed when `<path>/.ark_installed` exists. The state is
//! computed once per operation and passed down so that a single operation
//! never re-reads the filesystem between decisions.

use crate::atomic::write_synced;
use crate::config::LogConfig;
use crate::registry::ServerDefinition;
use crate::{ArkError, Result};
use chrono::{DateTime, FixedOffset, Local, SecondsFormat};
use std::fs;
use std::io::ErrorKind;
use tracing::{debug, info, warn};

/// Whether a server's files are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallationState {
    NotInstalled,
    Installed {
        /// Time recorded in the marker, or the marker's mtime for markers
        /// written by older panels.
        installed_at: Option<DateTime<FixedOffset>>,
    },
}

impl InstallationState {
    /// Inspect the markers of `def`.
    ///
    /// A relocated executable without a marker is an installation made by an
    /// older panel; the marker is backfilled.
    pub fn detect(def: &ServerDefinition) -> Self {
        let marker = def.installed_marker();
        if marker.is_file() {
            return InstallationState::Installed {
                installed_at: installed_at(def),
            };
        }

        if def.executable().is_file() {
            info!(
                "Server {} has an executable but no marker, backfilling {}",
                def.id,
                marker.display()
            );
            let contents = format!("Installed at: {}\n", marker_timestamp());
            if let Err(e) = write_synced(&marker, &contents) {
                warn!("Failed to backfill install marker for server {}: {}", def.id, e);
            }
            return InstallationState::Installed {
                installed_at: installed_at(def),
            };
        }

        InstallationState::NotInstalled
    }

    pub fn is_installed(&self) -> bool {
        matches!(self, InstallationState::Installed { .. })
    }

    pub fn installed_at(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            InstallationState::Installed { installed_at } => *installed_at,
            InstallationState::NotInstalled => None,
        }
    }

    /// `YYYY-MM-DD HH:MM:SS`, or `"N/A"` when not installed.
    pub fn install_date_display(&self) -> String {
        match self {
            InstallationState::Installed {
                installed_at: Some(at),
            } => at.format(LogConfig::TIMESTAMP_FORMAT).to_string(),
            InstallationState::Installed { installed_at: None } => "Unknown".to_string(),
            InstallationState::NotInstalled => "N/A".to_string(),
        }
    }
}

fn marker_timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parse the timestamp on the marker's first line, falling back to mtime.
pub fn installed_at(def: &ServerDefinition) -> Option<DateTime<FixedOffset>> {
    let marker = def.installed_marker();
    let contents = fs::read_to_string(&marker).ok()?;

    let parsed = contents
        .lines()
        .next()
        .and_then(|line| line.split_once(": "))
        .and_then(|(_, ts)| DateTime::parse_from_rfc3339(ts.trim()).ok());
    if parsed.is_some() {
        return parsed;
    }

    fs::metadata(&marker)
        .and_then(|m| m.modified())
        .ok()
        .map(|t| DateTime::<Local>::from(t).fixed_offset())
}

/// Contents of `.ark_version`, trimmed.
pub fn read_version(def: &ServerDefinition) -> Option<String> {
    fs::read_to_string(def.version_marker())
        .ok()
        .map(|s| s.trim().to_string())
}

/// Write `.ark_version` and then `.ark_installed`.
///
/// The installed marker is written last and synced, so a crash in between
/// leaves the server `NotInstalled`.
pub fn write_markers(def: &ServerDefinition, branch: &str) -> Result<InstallationState> {
    let ts = marker_timestamp();
    let branch_label = if branch.is_empty() { "public" } else { branch };

    let version_path = def.version_marker();
    write_synced(
        &version_path,
        &format!("Linux version installed at: {}\nBranch: {}\n", ts, branch_label),
    )?;

    let marker_path = def.installed_marker();
    write_synced(
        &marker_path,
        &format!(
            "Installed successfully at: {}\nLinux version (branch: {})\n",
            ts, branch_label
        ),
    )?;

    debug!("Wrote install markers for server {}", def.id);
    Ok(InstallationState::Installed {
        installed_at: DateTime::parse_from_rfc3339(&ts).ok(),
    })
}

/// Remove both markers. Missing markers are not an error.
pub fn remove_markers(def: &ServerDefinition) -> Result<()> {
    for path in [def.installed_marker(), def.version_marker()] {
        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(ArkError::io_with_path(e, path)),
        }
    }
    Ok(())
}
