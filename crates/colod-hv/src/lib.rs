//! The hypervisor control channel: line-framed JSON request/reply over the main
//! stream, an unsolicited event stream, and a yank side-channel, with timeout
//! escalation across pausing operations.
mod channel;
mod raise_timeout;
mod wire;

pub use channel::{HypervisorChannel, InterruptSource};
pub use raise_timeout::run as run_raise_timeout;
pub use wire::{event_name_pattern, matches_pattern, migration_status_pattern, HvCommand, HvEvent, HvLine, HvReply};

#[cfg(test)]
mod tests;
