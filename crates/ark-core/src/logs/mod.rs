//! Log aggregation.
//!
//! Every log lives in one directory:
//!
//! ```text
//! logs/server_<id>.log           game server output (truncated per start)
//! logs/install_server_<id>.log   install / force install
//! logs/update_server_<id>.log    update
//! logs/installation.log          every installer line, tagged by server
//! ```
//!
//! Reads filter first and cap second, so a search is applied to the whole
//! file rather than to the visible tail.

mod reader;
mod sink;
mod streams;

pub use reader::{filter_lines, parse_line_timestamp, tail_lines, LogFilter};
pub use sink::{timestamp, LogSink};
pub use streams::{LogKind, LogStream};

use crate::config::LogConfig;
use crate::error::{ArkError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A filtered, capped read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub filter: LogFilter,
    pub limit: usize,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            filter: LogFilter::default(),
            limit: LogConfig::DEFAULT_TAIL_LINES,
        }
    }
}

/// An existing per-server log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFileInfo {
    pub name: String,
    pub file: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
}

/// Directory of log files.
#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, stream: &LogStream) -> PathBuf {
        self.dir.join(stream.file_name())
    }

    /// Open an append sink for `stream`.
    pub fn open_sink(&self, stream: &LogStream) -> Result<LogSink> {
        LogSink::open(self.path(stream))
    }

    /// Append one timestamped entry.
    pub fn append(&self, stream: &LogStream, message: &str) -> Result<()> {
        self.open_sink(stream)?.write_entry(message)
    }

    /// All lines of `stream`.
    pub fn read_lines(&self, stream: &LogStream) -> Result<Vec<String>> {
        let path = self.path(stream);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ArkError::LogNotFound {
                    name: stream.file_name(),
                })
            }
            Err(e) => return Err(ArkError::io_with_path(e, path)),
        };
        Ok(String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Last `limit` lines of `stream`.
    pub fn tail(&self, stream: &LogStream, limit: usize) -> Result<Vec<String>> {
        Ok(tail_lines(self.read_lines(stream)?, limit))
    }

    /// Filter, then keep the last `query.limit` lines.
    pub fn query(&self, stream: &LogStream, query: &LogQuery) -> Result<Vec<String>> {
        let lines = filter_lines(self.read_lines(stream)?, &query.filter);
        Ok(tail_lines(lines, query.limit))
    }

    /// Read one of server `id`'s own logs by file name.
    ///
    /// Only `server_<id>.log`, `install_server_<id>.log` and
    /// `update_server_<id>.log` are readable; anything else is `Forbidden`.
    pub fn specific_log(&self, id: u32, file_name: &str, limit: usize) -> Result<Vec<String>> {
        let stream = LogStream::from_file_name(id, file_name).ok_or_else(|| {
            debug!("Rejected log request for {:?} (server {})", file_name, id);
            ArkError::Forbidden {
                name: file_name.to_string(),
            }
        })?;
        self.tail(&stream, limit)
    }

    /// Existing logs for server `id`, in main/install/update order.
    pub fn available_logs(&self, id: u32) -> Vec<LogFileInfo> {
        LogKind::ALL
            .iter()
            .filter_map(|kind| {
                let stream = kind.stream(id);
                self.path(&stream).is_file().then(|| LogFileInfo {
                    name: kind.display_name().to_string(),
                    file: stream.file_name(),
                    kind: *kind,
                })
            })
            .collect()
    }

    /// Delete server `id`'s three logs. Missing files count as removed.
    pub fn remove_server_logs(&self, id: u32) -> Vec<(String, Result<()>)> {
        LogKind::ALL
            .iter()
            .map(|kind| {
                let path = self.path(&kind.stream(id));
                let outcome = match fs::remove_file(&path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(ArkError::io_with_path(e, &path)),
                };
                (kind.stream(id).file_name(), outcome)
            })
            .collect()
    }
}
