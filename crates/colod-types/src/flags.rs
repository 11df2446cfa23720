use serde::Serialize;

/// Runtime flags attached to the orchestrator, surfaced verbatim through
/// `query-status` on the management socket.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuntimeFlags {
    pub primary: bool,
    pub replication: bool,
    pub failed: bool,
    pub peer_failed: bool,
    pub peer_failover: bool,
    pub yellow: bool,
    pub peer_yellow: bool,
    pub qemu_quit: bool,
    pub transitioning: bool,
    pub peer: String,
}

impl RuntimeFlags {
    pub fn new(primary: bool) -> Self {
        Self {
            primary,
            ..Default::default()
        }
    }
}
