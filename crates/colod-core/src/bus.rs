use colod_types::OrchestratorState;
use event_bus::Event;

/// Published on the shared [`event_bus::EventBus`] every time the orchestrator enters a
/// new state, including the terminal `Quit`. Lets whoever owns the bus (the daemon
/// binary, in practice) fold state transitions into its own structured logging or an
/// audit trail without the orchestrator knowing anything about that consumer.
#[derive(Clone, Debug, Event)]
pub enum OrchestratorSignal {
    StateChanged(OrchestratorState),
}
