//! Two-sink log writer for installer operations.

use ark_core::{ArkError, LogSink, LogStore, LogStream, Result};
use tracing::warn;

/// Writes every line to the operation's own log and, tagged, to the shared
/// installation log.
///
/// Both files are opened up front and closed when the fan-out is dropped,
/// whichever way the operation ends. A failed write is reported once and
/// does not abort the operation.
pub struct LogFanout {
    operation: Option<LogSink>,
    global: LogSink,
    tag: String,
    write_failed: bool,
}

impl LogFanout {
    /// Fan out to `stream` and `installation.log`, tagged with the stream's
    /// global tag. Only install and update streams have one.
    pub fn open(logs: &LogStore, stream: LogStream) -> Result<Self> {
        let tag = stream.global_tag().ok_or_else(|| {
            ArkError::Other(format!("{} is not mirrored into the installation log", stream))
        })?;
        Ok(Self {
            operation: Some(logs.open_sink(&stream)?),
            global: logs.open_sink(&LogStream::Installation)?,
            tag,
            write_failed: false,
        })
    }

    /// Write only to `installation.log`.
    pub fn global_only(logs: &LogStore, tag: impl Into<String>) -> Result<Self> {
        Ok(Self {
            operation: None,
            global: logs.open_sink(&LogStream::Installation)?,
            tag: tag.into(),
            write_failed: false,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// One line of tool output, or a note from the orchestrator.
    pub fn line(&mut self, line: &str) {
        let mut result = Ok(());
        if let Some(op) = self.operation.as_mut() {
            result = op.write_entry(line);
        }
        let global = self.global.write_tagged(&self.tag, line);
        if let Err(e) = result.and(global) {
            if !self.write_failed {
                warn!("Log write failed for [{}]: {}", self.tag, e);
                self.write_failed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_fanout_writes_both_sinks() {
        let temp = TempDir::new().unwrap();
        let logs = LogStore::new(temp.path());

        {
            let mut fanout = LogFanout::open(&logs, LogStream::Update(2)).unwrap();
            assert_eq!(fanout.tag(), "UPDATE_SERVER_2");
            fanout.line("Update state (0x61) downloading");
        }

        let own = fs::read_to_string(logs.path(&LogStream::Update(2))).unwrap();
        let global = fs::read_to_string(logs.path(&LogStream::Installation)).unwrap();
        assert!(own.trim_end().ends_with("] Update state (0x61) downloading"));
        assert!(global
            .trim_end()
            .ends_with("] [UPDATE_SERVER_2] Update state (0x61) downloading"));
    }

    #[test]
    fn test_open_rejects_untagged_streams() {
        let temp = TempDir::new().unwrap();
        let logs = LogStore::new(temp.path());
        assert!(LogFanout::open(&logs, LogStream::Run(1)).is_err());
        assert!(!logs.path(&LogStream::Run(1)).exists());
    }

    #[test]
    fn test_global_only() {
        let temp = TempDir::new().unwrap();
        let logs = LogStore::new(temp.path());
        LogFanout::global_only(&logs, "UNINSTALL_SERVER_5")
            .unwrap()
            .line("Removing files");

        assert!(!logs.path(&LogStream::Install(5)).exists());
        let global = fs::read_to_string(logs.path(&LogStream::Installation)).unwrap();
        assert!(global.contains("[UNINSTALL_SERVER_5] Removing files"));
    }
}
