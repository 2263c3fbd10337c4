//! ARK Installer - SteamCMD-driven install, update and uninstall.
//!
//! Operations block until the tool exits. Output is streamed, line by line,
//! into the server's own operation log and the shared `installation.log`.
//! There is no per-server locking here; serialising operations on the same
//! server is the caller's job.
//!
//! # Modules
//!
//! - `steamcmd` - Tool configuration, command line, output streaming
//! - `orchestrator` - Install, force install and update
//! - `uninstall` - Best-effort teardown
//! - `phase` - Phase state machine

pub mod fanout;
pub mod orchestrator;
pub mod phase;
pub mod steamcmd;
pub mod uninstall;

pub use fanout::LogFanout;
pub use orchestrator::{InstallOutcome, Installer};
pub use phase::{InstallPhase, Operation, PhaseTracker};
pub use steamcmd::{CombinedLines, FetchToolConfig};
pub use uninstall::{StepOutcome, UninstallReport, UninstallStep};

// Re-export ark-core types that are commonly needed with the installer
pub use ark_core::error::{ArkError, Result};
