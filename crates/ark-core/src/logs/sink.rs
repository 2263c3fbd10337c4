//! Append-only line writer.

use crate::config::LogConfig;
use crate::error::{ArkError, Result};
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current time as `YYYY-MM-DD HH:MM:SS`.
pub fn timestamp() -> String {
    Local::now().format(LogConfig::TIMESTAMP_FORMAT).to_string()
}

/// One open log file. Each line is written whole and flushed immediately;
/// the handle is closed on drop.
#[derive(Debug)]
pub struct LogSink {
    path: PathBuf,
    file: File,
}

impl LogSink {
    /// Open `path` in append mode, creating it and its directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ArkError::io_with_path(e, parent))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ArkError::io_with_path(e, &path))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `[ts] message`
    pub fn write_entry(&mut self, message: &str) -> Result<()> {
        self.write_line(&format!("[{}] {}", timestamp(), message))
    }

    /// `[ts] [tag] message`
    pub fn write_tagged(&mut self, tag: &str, message: &str) -> Result<()> {
        self.write_line(&format!("[{}] [{}] {}", timestamp(), tag, message))
    }

    /// Write `line` verbatim followed by a newline, then flush.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line.trim_end_matches(['\r', '\n']));
        buf.push('\n');
        self.file
            .write_all(buf.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|e| ArkError::io_with_path(e, &self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::reader::parse_line_timestamp;
    use tempfile::TempDir;

    #[test]
    fn test_sink_appends_timestamped_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs/install_server_1.log");

        {
            let mut sink = LogSink::open(&path).unwrap();
            sink.write_entry("Preparing").unwrap();
        }
        {
            let mut sink = LogSink::open(&path).unwrap();
            sink.write_tagged("SERVER_1", "Fetching\n").unwrap();
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(parse_line_timestamp(lines[0]).is_some());
        assert!(lines[0].ends_with("] Preparing"));
        assert!(lines[1].ends_with("] [SERVER_1] Fetching"));
    }
}
