//! Names of the panel's log streams.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a per-server log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Game server stdout/stderr.
    Main,
    Install,
    Update,
}

impl LogKind {
    pub const ALL: [LogKind; 3] = [LogKind::Main, LogKind::Install, LogKind::Update];

    pub fn display_name(&self) -> &'static str {
        match self {
            LogKind::Main => "Server output",
            LogKind::Install => "Installation",
            LogKind::Update => "Update",
        }
    }

    pub fn stream(&self, id: u32) -> LogStream {
        match self {
            LogKind::Main => LogStream::Run(id),
            LogKind::Install => LogStream::Install(id),
            LogKind::Update => LogStream::Update(id),
        }
    }
}

/// One append-only log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStream {
    /// `server_<id>.log`
    Run(u32),
    /// `install_server_<id>.log`
    Install(u32),
    /// `update_server_<id>.log`
    Update(u32),
    /// `installation.log`, shared by every server.
    Installation,
}

impl LogStream {
    pub fn file_name(&self) -> String {
        match self {
            LogStream::Run(id) => format!("server_{}.log", id),
            LogStream::Install(id) => format!("install_server_{}.log", id),
            LogStream::Update(id) => format!("update_server_{}.log", id),
            LogStream::Installation => crate::config::LogConfig::INSTALLATION_LOG.to_string(),
        }
    }

    /// Tag used when this stream's lines are mirrored into the global log.
    pub fn global_tag(&self) -> Option<String> {
        match self {
            LogStream::Install(id) => Some(format!("SERVER_{}", id)),
            LogStream::Update(id) => Some(format!("UPDATE_SERVER_{}", id)),
            LogStream::Run(_) | LogStream::Installation => None,
        }
    }

    /// Resolve an allow-listed file name for server `id`.
    pub fn from_file_name(id: u32, file_name: &str) -> Option<Self> {
        LogKind::ALL
            .iter()
            .map(|kind| kind.stream(id))
            .find(|stream| stream.file_name() == file_name)
    }
}

impl fmt::Display for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}
