//! Peer group-messaging adapter: a virtually-synchronous broadcast joined by a
//! well-known group name (the instance name), with self-retransmission until
//! self-delivery proves the group ordered a message, and a peer-left notification.
mod adapter;
mod loopback;
mod tcp;
mod transport;

pub use adapter::{GroupAdapter, GroupEvent};
pub use loopback::LoopbackTransport;
pub use tcp::TcpTransport;
pub use transport::{GroupDelivery, GroupTransport};

#[cfg(test)]
mod tests;
