//! Error types for the ARK panel core.
//!
//! Every fallible operation in the workspace returns [`ArkError`]. The HTTP
//! boundary maps variants to status codes through [`ArkError::http_status`].

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the panel.
#[derive(Debug, Error)]
pub enum ArkError {
    // Lookup errors
    #[error("Server not found: {id}")]
    ServerNotFound { id: u32 },

    #[error("Log not found: {name}")]
    LogNotFound { name: String },

    #[error("Access denied to log file: {name}")]
    Forbidden { name: String },

    // Installation state errors
    #[error("Server {id} is not installed")]
    NotInstalled { id: u32 },

    #[error("Server {id} is already installed, use force install to reinstall")]
    AlreadyInstalled { id: u32 },

    #[error("{tool} failed: {message}. Check the installation logs for details")]
    ExternalToolFailure { tool: String, message: String },

    #[error("Uninstall of server {id} incomplete: {path:?} still exists")]
    UninstallIncomplete { id: u32, path: PathBuf },

    // Process errors
    #[error("Process probe failed: {message}")]
    ProbeFault { message: String },

    #[error("Process launch failed for server {id}: {message}")]
    LaunchFailed { id: u32, message: String },

    #[error("Process not running for server {id}")]
    ProcessNotRunning { id: u32 },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for panel operations.
pub type Result<T> = std::result::Result<T, ArkError>;

impl From<std::io::Error> for ArkError {
    fn from(err: std::io::Error) -> Self {
        ArkError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ArkError {
    fn from(err: serde_json::Error) -> Self {
        ArkError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl ArkError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ArkError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Map to an HTTP status code.
    ///
    /// - 404: unknown server, missing log, process not running
    /// - 403: log file outside the allow-list
    /// - 409: precondition on installation state failed
    /// - 400: invalid input
    /// - 500: everything else
    pub fn http_status(&self) -> u16 {
        match self {
            ArkError::ServerNotFound { .. }
            | ArkError::LogNotFound { .. }
            | ArkError::ProcessNotRunning { .. } => 404,

            ArkError::Forbidden { .. } => 403,

            ArkError::NotInstalled { .. } | ArkError::AlreadyInstalled { .. } => 409,

            ArkError::Validation { .. } => 400,

            _ => 500,
        }
    }

    /// Whether the error reports a missing entity rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ArkError::ServerNotFound { .. } | ArkError::LogNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArkError::AlreadyInstalled { id: 3 };
        assert_eq!(
            err.to_string(),
            "Server 3 is already installed, use force install to reinstall"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(ArkError::ServerNotFound { id: 99 }.http_status(), 404);
        assert_eq!(
            ArkError::Forbidden {
                name: "../../etc/passwd".into()
            }
            .http_status(),
            403
        );
        assert_eq!(ArkError::NotInstalled { id: 1 }.http_status(), 409);
        assert_eq!(ArkError::Other("boom".into()).http_status(), 500);
    }

    #[test]
    fn test_io_with_path_keeps_path() {
        let err = ArkError::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/tmp/x",
        );
        match err {
            ArkError::Io { path, .. } => assert_eq!(path, Some(PathBuf::from("/tmp/x"))),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
