use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Monotonically increasing sequence number assigned to an [`Event`] at the instant it
/// is inserted into the queue. Ties within a priority class are broken by `SeqNo`.
pub type SeqNo = u64;

/// A discrete occurrence the orchestrator reacts to. `payload` carries kind-specific
/// detail (e.g. the `QUORUM_REPORT_BAD` node name) and is otherwise empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub seqno: SeqNo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Event {
    pub fn new(kind: EventKind, seqno: SeqNo) -> Self {
        Self {
            kind,
            seqno,
            payload: None,
        }
    }

    pub fn with_payload(kind: EventKind, seqno: SeqNo, payload: Value) -> Self {
        Self {
            kind,
            seqno,
            payload: Some(payload),
        }
    }
}

/// The kinds of event the orchestrator's queue can hold.
///
/// `Failed`, `PeerFailover`, `Quit` and `AutoQuit` are *always-interrupting*: no state
/// may remove them from the interrupting set via [`EventQueue::set_interrupting`]
/// (`colod-queue`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Failed,
    PeerFailover,
    Quit,
    AutoQuit,
    FailoverSync,
    FailoverWin,
    Yellow,
    Unyellow,
    StartMigration,
}

impl EventKind {
    /// The subset of kinds that are interrupting in every state, independent of
    /// whatever dynamic set the current state has declared.
    pub const ALWAYS_INTERRUPTING: [EventKind; 4] = [
        EventKind::Failed,
        EventKind::PeerFailover,
        EventKind::Quit,
        EventKind::AutoQuit,
    ];

    pub fn is_always_interrupting(self) -> bool {
        Self::ALWAYS_INTERRUPTING.contains(&self)
    }
}
