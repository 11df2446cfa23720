//! The management socket: a UNIX stream listener accepting any number of independent
//! clients, each speaking newline-delimited `exec-colod` JSON. A `ServerConfig` plus a
//! `run_server` entry point driven by a shared [`CancellationToken`], with one task per
//! connection tracked so shutdown can wait for in-flight requests to drain.
use std::io;
use std::path::PathBuf;

use colod_core::OrchestratorHandle;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::protocol::handle_request;

pub struct ServerConfig {
    /// Path of the UNIX stream socket, e.g. `<base_dir>/colod.sock`.
    pub socket_path: PathBuf,
}

/// Runs the management socket until `cancellation` fires, then waits for in-flight
/// client requests to finish before returning.
pub async fn run_server<H>(
    ServerConfig { socket_path }: ServerConfig,
    handle: H,
    cancellation: CancellationToken,
) -> eyre::Result<()>
where
    H: OrchestratorHandle + 'static,
{
    match std::fs::remove_file(&socket_path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err).map_err(|err| eyre::eyre!("failed to remove stale socket: {err}")),
    }

    let listener = UnixListener::bind(&socket_path)?;
    let connections = TaskTracker::new();

    loop {
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, _addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        warn!(%err, "failed to accept management connection");
                        continue;
                    }
                };

                connections.spawn(serve_connection(stream, handle.clone()));
            }
        }
    }

    connections.close();
    connections.wait().await;

    let _ = std::fs::remove_file(&socket_path);

    Ok(())
}

/// One client's lifetime: request lines in, reply lines out, until EOF or a malformed
/// line. An abrupt close is a normal occurrence, not an error worth logging.
async fn serve_connection(stream: UnixStream, handle: impl OrchestratorHandle) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(err) => {
                debug!(%err, "management connection read error");
                return;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let reply = handle_request(&handle, &line).await;
        let Ok(mut encoded) = serde_json::to_vec(&reply) else {
            continue;
        };
        encoded.push(b'\n');

        if write_half.write_all(&encoded).await.is_err() {
            return;
        }
    }
}
