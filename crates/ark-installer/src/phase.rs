//! Installer phases.

use serde::Serialize;
use std::fmt;
use tracing::info;

/// Which installer operation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Install,
    ForceInstall,
    Update,
    Uninstall,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Install => "install",
            Operation::ForceInstall => "force_install",
            Operation::Update => "update",
            Operation::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Idle → Preparing → Fetching → Verifying → Finalizing → Succeeded | Failed`
///
/// Updates skip verifying and finalizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallPhase {
    Idle,
    Preparing,
    Fetching,
    Verifying,
    Finalizing,
    Succeeded,
    Failed,
}

impl InstallPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstallPhase::Succeeded | InstallPhase::Failed)
    }

    /// Whether `next` may follow `self`.
    pub fn can_advance_to(&self, next: InstallPhase) -> bool {
        use InstallPhase::*;
        match (self, next) {
            (Succeeded | Failed, _) => false,
            (_, Failed) => true,
            (Idle, Preparing)
            | (Preparing, Fetching)
            | (Fetching, Verifying)
            | (Fetching, Succeeded)
            | (Verifying, Finalizing)
            | (Finalizing, Succeeded) => true,
            _ => false,
        }
    }
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstallPhase::Idle => "Idle",
            InstallPhase::Preparing => "Preparing",
            InstallPhase::Fetching => "Fetching",
            InstallPhase::Verifying => "Verifying",
            InstallPhase::Finalizing => "Finalizing",
            InstallPhase::Succeeded => "Succeeded",
            InstallPhase::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Records transitions of one operation.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    server_id: u32,
    operation: Operation,
    current: InstallPhase,
    history: Vec<InstallPhase>,
}

impl PhaseTracker {
    pub fn new(server_id: u32, operation: Operation) -> Self {
        Self {
            server_id,
            operation,
            current: InstallPhase::Idle,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> InstallPhase {
        self.current
    }

    /// Move to `next`. Returns false, without moving, when the transition is
    /// not allowed.
    pub fn advance(&mut self, next: InstallPhase) -> bool {
        if !self.current.can_advance_to(next) {
            return false;
        }
        info!(
            "Server {} {}: {} -> {}",
            self.server_id, self.operation, self.current, next
        );
        self.current = next;
        self.history.push(next);
        true
    }

    pub fn phases(&self) -> Vec<InstallPhase> {
        self.history.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InstallPhase::*;

    #[test]
    fn test_install_path() {
        let mut tracker = PhaseTracker::new(1, Operation::Install);
        for phase in [Preparing, Fetching, Verifying, Finalizing, Succeeded] {
            assert!(tracker.advance(phase), "{phase}");
        }
        assert_eq!(
            tracker.phases(),
            vec![Preparing, Fetching, Verifying, Finalizing, Succeeded]
        );
        assert!(!tracker.advance(Failed));
    }

    #[test]
    fn test_update_skips_verification() {
        let mut tracker = PhaseTracker::new(1, Operation::Update);
        assert!(tracker.advance(Preparing));
        assert!(tracker.advance(Fetching));
        assert!(tracker.advance(Succeeded));
        assert!(tracker.current().is_terminal());
    }

    #[test]
    fn test_rejects_skipping_ahead() {
        let mut tracker = PhaseTracker::new(1, Operation::Install);
        assert!(!tracker.advance(Finalizing));
        assert_eq!(tracker.current(), Idle);
        assert!(tracker.advance(Failed));
    }
}
