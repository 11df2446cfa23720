use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::transport::{GroupDelivery, GroupTransport};

const DELIVERY_CAPACITY: usize = 256;

/// A two-member [`GroupTransport`] over a single direct TCP connection to the peer
/// instance. With exactly two members, a point-to-point link already provides agreed
/// order (each byte stream is FIFO) and self-delivery just means publishing the
/// delivery locally the moment the write succeeds, without waiting on the wire.
pub struct TcpTransport {
    outgoing: mpsc::UnboundedSender<u32>,
    deliveries: broadcast::Sender<GroupDelivery>,
}

impl TcpTransport {
    /// Listens for the peer's connection. Used by the instance configured as primary,
    /// mirroring the primary/secondary asymmetry already present in the orchestrator's
    /// startup sequence.
    pub async fn accept(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "accepted peer group connection");
        Ok(Self::new(stream))
    }

    /// Connects to the peer's listening address. Used by the secondary instance.
    pub async fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }

    fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (deliveries_tx, _) = broadcast::channel(DELIVERY_CAPACITY);

        tokio::spawn(Self::writer_task(write_half, outgoing_rx, deliveries_tx.clone()));
        tokio::spawn(Self::reader_task(read_half, deliveries_tx.clone()));

        Self {
            outgoing: outgoing_tx,
            deliveries: deliveries_tx,
        }
    }

    async fn writer_task(
        mut write_half: tokio::net::tcp::OwnedWriteHalf,
        mut outgoing: mpsc::UnboundedReceiver<u32>,
        deliveries: broadcast::Sender<GroupDelivery>,
    ) {
        while let Some(tag) = outgoing.recv().await {
            if write_half.write_all(&tag.to_be_bytes()).await.is_err() {
                let _ = deliveries.send(GroupDelivery::PeerLeft);
                return;
            }
            let _ = deliveries.send(GroupDelivery::Message { tag, from_self: true });
        }
    }

    async fn reader_task(mut read_half: tokio::net::tcp::OwnedReadHalf, deliveries: broadcast::Sender<GroupDelivery>) {
        let mut buf = [0u8; 4];
        loop {
            match read_half.read_exact(&mut buf).await {
                Ok(_) => {
                    let tag = u32::from_be_bytes(buf);
                    let _ = deliveries.send(GroupDelivery::Message { tag, from_self: false });
                }
                Err(err) => {
                    debug!(%err, "peer group connection closed");
                    let _ = deliveries.send(GroupDelivery::PeerLeft);
                    return;
                }
            }
        }
    }
}

impl GroupTransport for TcpTransport {
    fn send_raw(&self, tag: u32) {
        let _ = self.outgoing.send(tag);
    }

    fn subscribe(&self) -> broadcast::Receiver<GroupDelivery> {
        self.deliveries.subscribe()
    }
}
