use serde::{Deserialize, Serialize};

/// The orchestrator's top-level state. See `colod-core::orchestrator` for the
/// per-state transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestratorState {
    SecondaryStartup,
    SecondaryWait,
    SecondaryColoRunning,
    PrimaryStartup,
    PrimaryWait,
    PrimaryStartMigration,
    PrimaryColoRunning,
    FailoverSync,
    Failover,
    FailedPeerFailover,
    Failed,
    Quit,
    AutoQuit,
}

impl OrchestratorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Quit)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SecondaryStartup => "secondary-startup",
            Self::SecondaryWait => "secondary-wait",
            Self::SecondaryColoRunning => "secondary-colo-running",
            Self::PrimaryStartup => "primary-startup",
            Self::PrimaryWait => "primary-wait",
            Self::PrimaryStartMigration => "primary-start-migration",
            Self::PrimaryColoRunning => "primary-colo-running",
            Self::FailoverSync => "failover-sync",
            Self::Failover => "failover",
            Self::FailedPeerFailover => "failed-peer-failover",
            Self::Failed => "failed",
            Self::Quit => "quit",
            Self::AutoQuit => "autoquit",
        }
    }
}
