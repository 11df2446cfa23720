use tokio::sync::broadcast;

use crate::transport::{GroupDelivery, GroupTransport};

const BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
enum BusMessage {
    Sent { origin: u64, tag: u32 },
    Left { who: u64 },
}

/// An in-memory loopback group of exactly two members, standing in for corosync CPG in
/// tests. Delivery is instantaneous and total order falls out of the single underlying
/// broadcast channel.
pub struct LoopbackTransport {
    id: u64,
    bus: broadcast::Sender<BusMessage>,
}

impl LoopbackTransport {
    /// Creates both ends of a two-node group.
    pub fn pair() -> (Self, Self) {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        (
            Self { id: 0, bus: tx.clone() },
            Self { id: 1, bus: tx },
        )
    }

    /// Simulates this member leaving the group without a coordinated shutdown.
    pub fn leave(&self) {
        let _ = self.bus.send(BusMessage::Left { who: self.id });
    }
}

impl GroupTransport for LoopbackTransport {
    fn send_raw(&self, tag: u32) {
        let _ = self.bus.send(BusMessage::Sent { origin: self.id, tag });
    }

    fn subscribe(&self) -> broadcast::Receiver<GroupDelivery> {
        let mut bus_rx = self.bus.subscribe();
        let id = self.id;
        let (out_tx, out_rx) = broadcast::channel(BUS_CAPACITY);

        tokio::spawn(async move {
            loop {
                match bus_rx.recv().await {
                    Ok(BusMessage::Sent { origin, tag }) => {
                        let delivery = GroupDelivery::Message {
                            tag,
                            from_self: origin == id,
                        };
                        if out_tx.send(delivery).is_err() {
                            break;
                        }
                    }
                    Ok(BusMessage::Left { who }) if who != id => {
                        if out_tx.send(GroupDelivery::PeerLeft).is_err() {
                            break;
                        }
                    }
                    Ok(BusMessage::Left { .. }) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        out_rx
    }
}
