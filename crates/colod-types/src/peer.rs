use serde::{Deserialize, Serialize};

/// A message exchanged with the peer over the group-messaging bus. The wire
/// representation is a 4-byte big-endian tag (see `colod-group`); this type is the
/// in-process representation used by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum PeerMessage {
    Failover = 0,
    Failed = 1,
    Hello = 2,
    Yellow = 3,
    Unyellow = 4,
}

impl PeerMessage {
    pub const ALL: [PeerMessage; 5] = [
        PeerMessage::Failover,
        PeerMessage::Failed,
        PeerMessage::Hello,
        PeerMessage::Yellow,
        PeerMessage::Unyellow,
    ];

    pub fn to_tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Some(match tag {
            0 => Self::Failover,
            1 => Self::Failed,
            2 => Self::Hello,
            3 => Self::Yellow,
            4 => Self::Unyellow,
            _ => return None,
        })
    }
}
