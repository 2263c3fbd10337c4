//! File permission handling.

use crate::error::Result;
use std::path::Path;
use tracing::debug;

/// Make a file executable (mode 0o755 on unix, no-op elsewhere).
pub fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        use crate::ArkError;
        let metadata = std::fs::metadata(path).map_err(|e| ArkError::io_with_path(e, path))?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(path, permissions).map_err(|e| ArkError::io_with_path(e, path))?;
        debug!("Set executable permissions on: {}", path.display());
    }

    #[cfg(not(unix))]
    {
        debug!("Skipping executable bit for: {}", path.display());
    }

    Ok(())
}

/// Check if any execute bit is set.
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
