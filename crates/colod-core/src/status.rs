use colod_types::{OrchestratorState, RuntimeFlags};
use serde::Serialize;

/// The reply body for the management socket's `query-status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: &'static str,
    #[serde(flatten)]
    pub flags: RuntimeFlags,
}

impl StatusReport {
    pub fn new(state: OrchestratorState, flags: RuntimeFlags) -> Self {
        Self {
            state: state.as_str(),
            flags,
        }
    }
}
