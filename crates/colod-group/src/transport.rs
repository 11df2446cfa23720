use tokio::sync::broadcast;

/// What the adapter observes from the group layer for one delivered message.
#[derive(Debug, Clone, Copy)]
pub enum GroupDelivery {
    /// A 32-bit tagged message was delivered in group order. `from_self` is set when
    /// this member is the one who sent it -- the only durable retransmission ack.
    Message { tag: u32, from_self: bool },
    /// The peer left the group without a coordinated shutdown.
    PeerLeft,
}

/// Abstracts the virtually-synchronous group-messaging backend (corosync CPG in
/// production; an in-memory loopback bus in tests). Required guarantees: agreed
/// delivery order among non-failed members, self-delivery, and a configuration-change
/// notification on peer join/leave. Without self-delivery, [`crate::GroupAdapter`]'s
/// retransmission can never terminate.
pub trait GroupTransport: Send + Sync {
    /// Best-effort, non-blocking send of a 4-byte tagged message to the group.
    fn send_raw(&self, tag: u32);

    /// Subscribes to the delivery stream. Each call may spawn its own bridging task;
    /// callers are expected to subscribe once and hold the receiver.
    fn subscribe(&self) -> broadcast::Receiver<GroupDelivery>;
}
