use thiserror::Error;

pub type Result<T> = std::result::Result<T, ColodError>;

/// The error taxonomy shared by the hypervisor channel, the group adapter and the
/// orchestrator. Propagation policy lives in `colod-core::orchestrator`; this type
/// only names the cases.
#[derive(Debug, Error)]
pub enum ColodError {
    /// A reply or event didn't structurally match what was expected.
    #[error("malformed hypervisor protocol message: {0}")]
    Protocol(String),

    /// A hypervisor command reply carried an `error` member.
    #[error("hypervisor command failed: {0}")]
    HypervisorCommand(String),

    /// A suspend point exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// The hypervisor channel hit EOF on one of its streams.
    #[error("hypervisor channel closed")]
    Eof,

    /// A higher-priority event became visible while suspended; the caller must unwind
    /// and let the orchestrator dispatch it.
    #[error("interrupted by a higher-priority event")]
    Interrupt,

    /// Configuration or startup failure; fatal to the process.
    #[error("fatal startup error: {0}")]
    Fatal(String),
}
