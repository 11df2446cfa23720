use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use colod_types::PeerMessage;
use tokio::sync::{broadcast, Mutex};
use tracing::trace;

use crate::transport::{GroupDelivery, GroupTransport};

const RETRANSMIT_INTERVAL: Duration = Duration::from_millis(100);
const EVENTS_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
pub enum GroupEvent {
    Delivered { msg: PeerMessage, from_self: bool },
    PeerLeft,
}

/// Wraps a [`GroupTransport`] with the retransmission discipline described in the
/// peer protocol: every `send` is re-broadcast every 100 ms until the adapter has
/// observed its own message delivered back to itself, at which point the
/// pending-retransmit flag clears. Repeated `send` of an already-pending message is a
/// no-op beyond the flag already being set.
pub struct GroupAdapter {
    transport: Arc<dyn GroupTransport>,
    pending: Mutex<HashSet<PeerMessage>>,
    events_tx: broadcast::Sender<GroupEvent>,
}

impl GroupAdapter {
    pub fn new(transport: Arc<dyn GroupTransport>) -> Arc<Self> {
        let (events_tx, _) = broadcast::channel(EVENTS_CAPACITY);
        let this = Arc::new(Self {
            transport,
            pending: Mutex::new(HashSet::new()),
            events_tx,
        });

        tokio::spawn(Self::deliver_task(this.clone()));
        tokio::spawn(Self::retransmit_task(this.clone()));

        this
    }

    /// Marks `msg` pending-retransmit (idempotently) and sends it once immediately;
    /// the retransmit task takes over from there.
    pub async fn send(&self, msg: PeerMessage) {
        self.pending.lock().await.insert(msg);
        self.transport.send_raw(msg.to_tag());
    }

    pub fn events(&self) -> broadcast::Receiver<GroupEvent> {
        self.events_tx.subscribe()
    }

    async fn deliver_task(this: Arc<Self>) {
        let mut deliveries = this.transport.subscribe();
        loop {
            match deliveries.recv().await {
                Ok(GroupDelivery::Message { tag, from_self }) => {
                    let Some(msg) = PeerMessage::from_tag(tag) else {
                        trace!(tag, "unrecognised peer message tag");
                        continue;
                    };
                    if from_self {
                        this.pending.lock().await.remove(&msg);
                    }
                    let _ = this.events_tx.send(GroupEvent::Delivered { msg, from_self });
                }
                Ok(GroupDelivery::PeerLeft) => {
                    let _ = this.events_tx.send(GroupEvent::PeerLeft);
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn retransmit_task(this: Arc<Self>) {
        let mut ticker = tokio::time::interval(RETRANSMIT_INTERVAL);
        loop {
            ticker.tick().await;
            let pending: Vec<PeerMessage> = this.pending.lock().await.iter().copied().collect();
            for msg in pending {
                this.transport.send_raw(msg.to_tag());
            }
        }
    }
}
