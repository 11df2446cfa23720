use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use colod_types::ColodError;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, oneshot, watch, Mutex, Notify};
use tracing::{debug, trace, warn};

use crate::wire::{self, HvCommand, HvEvent, HvLine, HvReply};

const WRITE_TIMEOUT: Duration = Duration::from_secs(1);
const YANK_TIMEOUT: Duration = Duration::from_secs(1);
const EVENTS_CAPACITY: usize = 64;

/// Something the channel can ask "is there a higher-priority event pending?" before
/// blocking on I/O. The orchestrator's `colod-queue::EventQueue` is the concrete
/// instance; decoupling it behind a trait keeps this crate free of a dependency on the
/// queue or the rest of the orchestrator.
pub trait InterruptSource: Send + Sync {
    fn pending_interrupt(&self) -> bool;

    /// A `Notify` poked whenever a new interrupt is raised, so a `wait_event` caller
    /// blocked in its `select!` wakes immediately instead of riding out the timeout or
    /// waiting for an unrelated hypervisor event. `None` if this source never raises
    /// interrupts asynchronously (e.g. the test doubles that don't wake on a background
    /// queue).
    fn interrupt_notify(&self) -> Option<&Notify> {
        None
    }
}

impl InterruptSource for () {
    fn pending_interrupt(&self) -> bool {
        false
    }
}

/// A bidirectional line-framed JSON channel to the hypervisor, plus a unidirectional
/// auxiliary stream for out-of-band `yank` commands.
///
/// Only one `execute`/`execute_nocheck` round trip may be outstanding at a time;
/// concurrent callers queue on an internal lock. `wait_event` does not share that lock:
/// several independent waiters (the orchestrator's own wait and the raise-timeout
/// task's `STOP`/`RESUME` wait) may listen on the event stream at once, each against
/// its own pattern, since the hypervisor's event stream has no notion of "ownership".
pub struct HypervisorChannel {
    writer: Mutex<Box<dyn AsyncWrite + Unpin + Send>>,
    yank_writer: Mutex<Box<dyn AsyncWrite + Unpin + Send>>,
    execute_lock: Mutex<()>,
    reply_waiter: Mutex<Option<oneshot::Sender<HvReply>>>,
    events_tx: broadcast::Sender<HvEvent>,
    connected: watch::Sender<bool>,
    current_timeout_ms: AtomicU64,
    yank_pending: std::sync::atomic::AtomicBool,
}

impl HypervisorChannel {
    /// Spawns the reader task and returns a channel handle. `main_read`/`main_write`
    /// are the two halves of the main control stream; `yank_write` is the auxiliary
    /// out-of-band stream.
    pub fn connect<R, W, Y>(main_read: R, main_write: W, yank_write: Y, default_timeout_ms: u64) -> Arc<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        Y: AsyncWrite + Unpin + Send + 'static,
    {
        let (events_tx, _) = broadcast::channel(EVENTS_CAPACITY);
        let (connected, _) = watch::channel(true);

        let this = Arc::new(Self {
            writer: Mutex::new(Box::new(main_write)),
            yank_writer: Mutex::new(Box::new(yank_write)),
            execute_lock: Mutex::new(()),
            reply_waiter: Mutex::new(None),
            events_tx,
            connected,
            current_timeout_ms: AtomicU64::new(default_timeout_ms),
            yank_pending: std::sync::atomic::AtomicBool::new(false),
        });

        tokio::spawn(Self::reader_task(this.clone(), main_read));

        this
    }

    async fn reader_task<R>(this: Arc<Self>, read_half: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        use tokio::io::AsyncBufReadExt;

        let mut lines = BufReader::new(read_half).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("hypervisor channel reached EOF");
                    break;
                }
                Err(err) => {
                    warn!("hypervisor channel read error: {}", err);
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match wire::parse_line(&line) {
                Ok(HvLine::Reply(reply)) => {
                    let waiter = this.reply_waiter.lock().await.take();
                    match waiter {
                        Some(sender) => {
                            let _ = sender.send(reply);
                        }
                        None => warn!("hypervisor reply with no outstanding request: {}", line),
                    }
                }
                Ok(HvLine::Event(event)) => {
                    trace!(event = %event.name, "hypervisor event");
                    let _ = this.events_tx.send(event);
                }
                Err(err) => warn!("malformed hypervisor protocol line: {} ({})", err, line),
            }
        }

        let _ = this.connected.send(false);
        // Drop any outstanding reply waiter so a caller blocked in `execute` fails fast
        // with `Eof` instead of riding out its full timeout.
        this.reply_waiter.lock().await.take();
    }

    /// Resolves once the channel has observed EOF on the main stream, surfacing the
    /// terminal `hup` condition the orchestrator reacts to by raising `Failed` and
    /// setting `qemu_quit`.
    pub async fn closed(&self) {
        let mut rx = self.connected.subscribe();
        while *rx.borrow() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    pub fn set_timeout(&self, ms: u64) {
        self.current_timeout_ms.store(ms, Ordering::SeqCst);
    }

    pub fn current_timeout(&self) -> Duration {
        Duration::from_millis(self.current_timeout_ms.load(Ordering::SeqCst))
    }

    pub fn yank_pending(&self) -> bool {
        self.yank_pending.load(Ordering::SeqCst)
    }

    /// Runs `command`, lifting a reply with an `error` member into
    /// [`ColodError::HypervisorCommand`].
    pub async fn execute(&self, command: HvCommand) -> Result<serde_json::Value, ColodError> {
        match self.execute_nocheck(command).await? {
            HvReply::Return(value) => Ok(value),
            HvReply::Error(error) => Err(ColodError::HypervisorCommand(error.to_string())),
        }
    }

    /// Runs `command` without lifting an `error` reply to an `Err`; used on shutdown
    /// paths where the caller inspects the raw reply itself.
    pub async fn execute_nocheck(&self, command: HvCommand) -> Result<HvReply, ColodError> {
        let _guard = self.execute_lock.lock().await;

        if !self.is_connected() {
            return Err(ColodError::Eof);
        }

        let (tx, rx) = oneshot::channel();
        *self.reply_waiter.lock().await = Some(tx);

        let mut line = serde_json::to_string(&command).map_err(|err| ColodError::Protocol(err.to_string()))?;
        line.push('\n');

        {
            let mut writer = self.writer.lock().await;
            let write = async {
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await
            };
            if tokio::time::timeout(WRITE_TIMEOUT, write).await.is_err() {
                self.reply_waiter.lock().await.take();
                return Err(ColodError::Timeout);
            }
        }

        let timeout = self.current_timeout();
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ColodError::Eof),
            Err(_) => {
                self.reply_waiter.lock().await.take();
                Err(ColodError::Timeout)
            }
        }
    }

    /// Suspends until an unsolicited event matches `pattern`, `timeout` elapses, or
    /// `interrupt` reports a higher-priority event is visible. The interrupt check is
    /// performed first on every wakeup, per the channel's contract.
    pub async fn wait_event(
        &self,
        pattern: &serde_json::Value,
        timeout: Duration,
        interrupt: &dyn InterruptSource,
    ) -> Result<HvEvent, ColodError> {
        let mut events = self.events_tx.subscribe();
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if interrupt.pending_interrupt() {
                return Err(ColodError::Interrupt);
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(ColodError::Timeout);
            }

            let woken = async {
                match interrupt.interrupt_notify() {
                    Some(notify) => notify.notified().await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                _ = woken => continue,
                event = events.recv() => {
                    match event {
                        Ok(event) if wire::matches_pattern(&event.as_value(), pattern) => return Ok(event),
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return Err(ColodError::Eof),
                    }
                }
                _ = tokio::time::sleep(remaining) => return Err(ColodError::Timeout),
            }
        }
    }

    /// Subscribes to the raw unsolicited event stream, independent of any in-flight
    /// `wait_event` call. Used by the raise-timeout task and the watchdog.
    pub fn subscribe_events(&self) -> broadcast::Receiver<HvEvent> {
        self.events_tx.subscribe()
    }

    /// Issues a yank on the auxiliary stream with its own short timeout.
    pub async fn yank(&self) -> Result<(), ColodError> {
        let mut line = serde_json::to_string(&HvCommand::new("yank"))
            .map_err(|err| ColodError::Protocol(err.to_string()))?;
        line.push('\n');

        let mut writer = self.yank_writer.lock().await;
        let write = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        };

        match tokio::time::timeout(YANK_TIMEOUT, write).await {
            Ok(Ok(())) => {
                self.yank_pending.store(true, Ordering::SeqCst);
                Ok(())
            }
            Ok(Err(err)) => Err(ColodError::Protocol(err.to_string())),
            Err(_) => Err(ColodError::Timeout),
        }
    }
}
