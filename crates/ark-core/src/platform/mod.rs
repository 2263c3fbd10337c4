//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific behavior live here:
//! - `permissions` - executable bits
//! - `process` - process table, liveness checks, signals
//!
//! Linux is the supported target; other unix systems work for everything
//! except running the game server itself.

pub mod permissions;
pub mod process;

pub use permissions::{is_executable, set_executable};
pub use process::{
    is_process_alive, list_processes, process_cmdline, sample_usage, send_terminate,
    ProcessEntry, ProcessUsage,
};
