//! Game server process management.
//!
//! # Detection Strategy
//!
//! 1. **PID file** - written by [`ServerLauncher::start`], checked first
//! 2. **Process table scan** - fallback when the PID file is missing or stale
//!
//! Starting regenerates `start_server.sh` from the saved settings and runs
//! it detached; stopping signals every process carrying the server's
//! executable name and game port.

mod launch_script;
mod launcher;
mod probe;

pub use launch_script::{shell_quote, LaunchScriptGenerator};
pub use launcher::{matches_stop_signature, LaunchResult, ServerLauncher};
pub use probe::{matches_server, read_pid_file, ProcessMetrics, ProcessProbe, ProcessSource};
