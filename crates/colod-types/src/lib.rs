//! Shared types for colod: the events that flow through the orchestrator's
//! [`EventQueue`](event::EventQueue -- re-exported from `colod-queue`), the messages
//! exchanged with the peer over the group-messaging bus, the orchestrator's own state
//! and runtime flags, and the error taxonomy every component reports through.

mod error;
mod event;
mod flags;
mod peer;
mod state;

pub use error::{ColodError, Result};
pub use event::{Event, EventKind, SeqNo};
pub use flags::RuntimeFlags;
pub use peer::PeerMessage;
pub use state::OrchestratorState;
