//! The COLO failover orchestrator: the per-state transition logic driving a node
//! between `SecondaryStartup`/`PrimaryStartup` and a terminal `Quit`, plus the
//! ambient wiring (watchdog, management handle, event-bus signal) it needs to do that
//! against a real hypervisor channel and peer group.
mod bus;
mod config;
mod handle;
mod orchestrator;
mod status;
mod watchdog;

pub use bus::OrchestratorSignal;
pub use config::{CommandSlot, OrchestratorConfig};
pub use handle::{Command, Error, OrchestratorClient, OrchestratorHandle};
#[cfg(any(test, feature = "mocks"))]
pub use handle::MockHandle;
pub use orchestrator::Orchestrator;
pub use status::StatusReport;

#[cfg(test)]
mod tests;
