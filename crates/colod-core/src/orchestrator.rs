use std::sync::{Arc, Mutex};
use std::time::Duration;

use colod_group::{GroupAdapter, GroupEvent};
use colod_hv::{event_name_pattern, migration_status_pattern, run_raise_timeout, HvCommand, HypervisorChannel, InterruptSource};
use colod_link::YellowCommit;
use colod_queue::EventQueue;
use colod_types::{ColodError, Event, EventKind, OrchestratorState, PeerMessage, RuntimeFlags};
use event_bus::EventBus;
use serde_json::Value;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::OrchestratorSignal;
use crate::config::{CommandSlot, OrchestratorConfig};
use crate::handle::{Command, OrchestratorClient};
use crate::status::StatusReport;
use crate::watchdog;

/// Hypervisor commands named after their real QMP counterparts; kept as plain string
/// constants per the "structural match, not a typed schema" contract (`colod-hv::wire`).
mod hv_commands {
    pub const ENABLE_EVENTS: &str = "enable-events-capability";
    pub const ENABLE_PAUSE_BEFORE_SWITCHOVER: &str = "enable-pause-before-switchover-capability";
    pub const MIGRATE_CONTINUE: &str = "migrate-continue";
    pub const MIGRATE_CANCEL: &str = "migrate_cancel";
    pub const STOP: &str = "stop";
    pub const CONT: &str = "cont";
    pub const QUERY_STATUS: &str = "query-status";
    pub const QUERY_COLO_STATUS: &str = "query-colo-status";
}
use hv_commands::*;

/// Used for the "wait RESUME" suspensions the table describes without a numeric
/// deadline (`SecondaryWait`, the post-migration resume wait in `*ColoRunning`): these
/// waits are effectively indefinite, bounded only so a stuck hypervisor doesn't suspend
/// the task forever without at least periodically re-checking for an interrupt.
const INDEFINITE_WAIT: Duration = Duration::from_secs(3600);

/// The failure-aware HA orchestrator: owns the event queue, the runtime flags, and the
/// per-state transition logic described by the state table. Constructed once, run until
/// a terminal state, then dropped by the enclosing daemon.
pub struct Orchestrator {
    state: Mutex<OrchestratorState>,
    flags: Mutex<RuntimeFlags>,
    queue: Mutex<EventQueue>,
    wake: Notify,
    watchdog_refresh: Arc<Notify>,
    hv: Arc<HypervisorChannel>,
    group: Arc<GroupAdapter>,
    config: Mutex<OrchestratorConfig>,
    store: Mutex<Value>,
    yank_instances: Mutex<Vec<Value>>,
    cancellation: CancellationToken,
    event_bus: EventBus,
}

impl Orchestrator {
    /// Registers the orchestrator's event-bus channel on `event_bus` and constructs the
    /// orchestrator. Returns the orchestrator itself, the management-command receiver
    /// [`Orchestrator::run`] expects, and a ready-to-clone [`OrchestratorClient`] for
    /// whoever runs the management socket.
    pub fn new(
        config: OrchestratorConfig,
        hv: Arc<HypervisorChannel>,
        group: Arc<GroupAdapter>,
        mut event_bus: EventBus,
    ) -> (Arc<Self>, flume::Receiver<Command>, OrchestratorClient) {
        event_bus.register::<OrchestratorSignal>(None);

        let initial_state = if config.primary {
            OrchestratorState::PrimaryStartup
        } else {
            OrchestratorState::SecondaryStartup
        };
        let flags = RuntimeFlags::new(config.primary);
        hv.set_timeout(config.timeout_low_ms);

        let (commands_tx, commands_rx) = flume::unbounded();

        let this = Arc::new(Self {
            state: Mutex::new(initial_state),
            flags: Mutex::new(flags),
            queue: Mutex::new(EventQueue::new(colod_queue::DEFAULT_QUEUE_SIZE)),
            wake: Notify::new(),
            watchdog_refresh: Arc::new(Notify::new()),
            hv,
            group,
            config: Mutex::new(config),
            store: Mutex::new(Value::Null),
            yank_instances: Mutex::new(Vec::new()),
            cancellation: CancellationToken::new(),
            event_bus,
        });

        (this, commands_rx, OrchestratorClient::new(commands_tx))
    }

    /// Runs the state machine to completion. Spawns the background bridges (hypervisor
    /// events, hypervisor HUP, group delivery, watchdog) and the management-command
    /// loop, then drives the per-state handlers until a terminal state is reached.
    pub async fn run(self: Arc<Self>, commands: flume::Receiver<Command>) {
        self.group.send(PeerMessage::Hello).await;

        tokio::spawn(Self::hv_event_bridge(self.clone()));
        tokio::spawn(Self::hv_closed_bridge(self.clone()));
        tokio::spawn(Self::group_event_bridge(self.clone()));
        tokio::spawn(Self::command_loop(self.clone(), commands));

        let watchdog_interval_ms = self.config.lock().unwrap().watchdog_interval_ms;
        tokio::spawn(watchdog::run(
            watchdog_interval_ms,
            self.watchdog_refresh.clone(),
            self.cancellation.clone(),
            {
                let this = self.clone();
                move || {
                    let this = this.clone();
                    async move { this.check_health().await }
                }
            },
            {
                let this = self.clone();
                move |err| {
                    warn!(%err, "watchdog raising Failed after health check mismatch");
                    this.raise(EventKind::Failed, None);
                }
            },
        ));

        let mut state = *self.state.lock().unwrap();

        loop {
            info!(state = state.as_str(), "orchestrator entering state");
            let _ = self.event_bus.send(OrchestratorSignal::StateChanged(state)).await;

            state = match state {
                OrchestratorState::SecondaryStartup => self.run_secondary_startup().await,
                OrchestratorState::SecondaryWait => self.run_secondary_wait().await,
                OrchestratorState::SecondaryColoRunning => self.run_secondary_colo_running().await,
                OrchestratorState::PrimaryStartup => self.run_primary_startup().await,
                OrchestratorState::PrimaryWait => self.run_primary_wait().await,
                OrchestratorState::PrimaryStartMigration => self.run_primary_start_migration().await,
                OrchestratorState::PrimaryColoRunning => self.colo_running(true).await,
                OrchestratorState::FailoverSync => self.run_failover_sync().await,
                OrchestratorState::Failover => self.run_failover().await,
                OrchestratorState::FailedPeerFailover => self.run_failed_peer_failover().await,
                OrchestratorState::Failed => self.run_failed().await,
                OrchestratorState::AutoQuit => self.run_autoquit().await,
                OrchestratorState::Quit => {
                    *self.state.lock().unwrap() = OrchestratorState::Quit;
                    break;
                }
            };

            *self.state.lock().unwrap() = state;
        }

        info!("orchestrator reached terminal state, exiting main loop");
        let _ = self.event_bus.send(OrchestratorSignal::StateChanged(OrchestratorState::Quit)).await;
        self.cancellation.cancel();
    }

    // ---- per-state handlers -------------------------------------------------------

    async fn run_secondary_startup(self: &Arc<Self>) -> OrchestratorState {
        match self.exec(ENABLE_EVENTS).await {
            Ok(_) => OrchestratorState::SecondaryWait,
            Err(err) => {
                error!(%err, "secondary startup: enable-events-capability failed");
                OrchestratorState::Failed
            }
        }
    }

    async fn run_primary_startup(self: &Arc<Self>) -> OrchestratorState {
        match self.exec(ENABLE_EVENTS).await {
            Ok(_) => OrchestratorState::PrimaryWait,
            Err(err) => {
                error!(%err, "primary startup: enable-events-capability failed");
                OrchestratorState::Failed
            }
        }
    }

    async fn run_secondary_wait(self: &Arc<Self>) -> OrchestratorState {
        self.declare_interrupting([EventKind::FailoverSync, EventKind::FailoverWin, EventKind::Yellow, EventKind::Unyellow]);

        loop {
            match self.wait_for(&event_name_pattern("RESUME"), INDEFINITE_WAIT).await {
                Ok(_) => return OrchestratorState::SecondaryColoRunning,
                Err(ColodError::Interrupt) => {
                    let Some(event) = self.try_next_event() else { continue };
                    match event.kind {
                        k if k.is_always_interrupting() => return self.dispatch_interrupt(k),
                        EventKind::FailoverSync => self.set_flag(|f| f.peer_failed = false),
                        EventKind::Yellow => self.set_flag(|f| f.peer_yellow = true),
                        EventKind::Unyellow => self.set_flag(|f| f.peer_yellow = false),
                        _ => {}
                    }
                }
                Err(ColodError::Timeout) => continue,
                Err(err) => {
                    error!(%err, "secondary wait: hypervisor communication failed");
                    return OrchestratorState::Failed;
                }
            }
        }
    }

    async fn run_secondary_colo_running(self: &Arc<Self>) -> OrchestratorState {
        let (timeout_low_ms, timeout_high_ms) = {
            let config = self.config.lock().unwrap();
            (config.timeout_low_ms, config.timeout_high_ms)
        };
        let raise_timeout = tokio::spawn(run_raise_timeout(self.hv.clone(), timeout_low_ms, timeout_high_ms));
        let next = self.colo_running(false).await;
        raise_timeout.abort();
        next
    }

    /// Shared body for `SecondaryColoRunning` and `PrimaryColoRunning`: both declare
    /// `{FailoverSync}` as interrupting and loop on the queue watching for yellow
    /// imbalance and failover sync. Only the primary side additionally waits for the
    /// two post-migration `RESUME` events and the settle grace period on entry.
    async fn colo_running(self: &Arc<Self>, is_primary: bool) -> OrchestratorState {
        self.declare_interrupting([EventKind::FailoverSync]);
        self.set_flag(|f| f.replication = true);

        if is_primary {
            for _ in 0..2 {
                match self.wait_for(&event_name_pattern("RESUME"), INDEFINITE_WAIT).await {
                    Ok(_) => {}
                    Err(ColodError::Interrupt) => {
                        if let Some(event) = self.try_next_event() {
                            return self.dispatch_interrupt(event.kind);
                        }
                    }
                    Err(ColodError::Timeout) => continue,
                    Err(err) => {
                        error!(%err, "primary colo running: waiting for post-migration resume");
                        return OrchestratorState::Failed;
                    }
                }
            }

            let grace_ms = self.config.lock().unwrap().colo_running_grace_ms;
            tokio::time::sleep(Duration::from_millis(grace_ms)).await;

            let flags = self.flags_snapshot();
            if flags.yellow && !flags.peer_yellow {
                warn!("post-migration grace period ended with unresolved local yellow");
                return OrchestratorState::Failed;
            }
        }

        loop {
            let event = self.next_event().await;
            match event.kind {
                k if k.is_always_interrupting() => return self.dispatch_interrupt(k),
                EventKind::FailoverSync => return OrchestratorState::FailoverSync,
                EventKind::Yellow => {
                    self.set_flag(|f| f.yellow = true);
                    if is_primary {
                        let flags = self.flags_snapshot();
                        if flags.yellow && !flags.peer_yellow {
                            return OrchestratorState::Failed;
                        }
                    }
                }
                EventKind::Unyellow => self.set_flag(|f| f.yellow = false),
                _ => {}
            }
        }
    }

    async fn run_primary_wait(self: &Arc<Self>) -> OrchestratorState {
        self.set_flag(|f| {
            f.primary = true;
            f.replication = false;
        });

        loop {
            let event = self.next_event().await;
            match event.kind {
                EventKind::StartMigration => return OrchestratorState::PrimaryStartMigration,
                EventKind::PeerFailover => debug!("primary wait: dropping late peer-failover, we already won"),
                k if k.is_always_interrupting() => return self.dispatch_interrupt(k),
                _ => {}
            }
        }
    }

    async fn run_primary_start_migration(self: &Arc<Self>) -> OrchestratorState {
        self.declare_interrupting([EventKind::FailoverSync]);

        if let Some(next) = self.check_interrupt() {
            return next;
        }
        if let Err(err) = self.exec(ENABLE_EVENTS).await {
            warn!(%err, "primary start migration: enable-events-capability failed");
            return OrchestratorState::FailoverSync;
        }

        if let Some(next) = self.check_interrupt() {
            return next;
        }
        if let Err(err) = self.exec(ENABLE_PAUSE_BEFORE_SWITCHOVER).await {
            warn!(%err, "primary start migration: enable-pause-before-switchover failed");
            return OrchestratorState::FailoverSync;
        }

        if let Some(next) = self.check_interrupt() {
            return next;
        }
        let migration_start = self.config.lock().unwrap().migration_start.clone();
        if let Err(err) = self.exec_command_array(&migration_start, false).await {
            warn!(%err, "primary start migration: migration_start array failed");
            return OrchestratorState::FailoverSync;
        }

        if let Some(next) = self.check_interrupt() {
            return next;
        }
        let pre_switchover_wait = Duration::from_millis(self.config.lock().unwrap().pre_switchover_wait_ms);
        match self.wait_for(&migration_status_pattern("pre-switchover"), pre_switchover_wait).await {
            Ok(_) => {}
            Err(ColodError::Interrupt) => {
                self.cancel_migration().await;
                if let Some(event) = self.try_next_event() {
                    return self.dispatch_interrupt(event.kind);
                }
                return OrchestratorState::FailoverSync;
            }
            Err(err) => {
                warn!(%err, "primary start migration: pre-switchover wait failed");
                self.cancel_migration().await;
                return OrchestratorState::FailoverSync;
            }
        }

        if let Some(next) = self.check_interrupt() {
            self.cancel_migration().await;
            return next;
        }
        let migration_switchover = self.config.lock().unwrap().migration_switchover.clone();
        if let Err(err) = self.exec_command_array(&migration_switchover, false).await {
            warn!(%err, "primary start migration: migration_switchover array failed");
            return OrchestratorState::FailoverSync;
        }

        if let Some(next) = self.check_interrupt() {
            return next;
        }
        let (timeout_low_ms, timeout_high_ms) = {
            let config = self.config.lock().unwrap();
            (config.timeout_low_ms, config.timeout_high_ms)
        };
        let raise_timeout = tokio::spawn(run_raise_timeout(self.hv.clone(), timeout_low_ms, timeout_high_ms));

        if let Err(err) = self.exec_args(MIGRATE_CONTINUE, serde_json::json!({ "state": "pre-switchover" })).await {
            warn!(%err, "primary start migration: migrate-continue failed");
            raise_timeout.abort();
            self.cancel_migration().await;
            return OrchestratorState::FailoverSync;
        }

        let migration_colo_wait = Duration::from_millis(self.config.lock().unwrap().migration_colo_wait_ms);
        match self.wait_for(&migration_status_pattern("colo"), migration_colo_wait).await {
            Ok(_) => OrchestratorState::PrimaryColoRunning,
            Err(ColodError::Interrupt) => {
                self.cancel_migration().await;
                match self.try_next_event() {
                    Some(event) => self.dispatch_interrupt(event.kind),
                    None => OrchestratorState::FailoverSync,
                }
            }
            Err(err) => {
                warn!(%err, "primary start migration: colo wait failed");
                self.cancel_migration().await;
                OrchestratorState::FailoverSync
            }
        }
    }

    async fn run_failover_sync(self: &Arc<Self>) -> OrchestratorState {
        self.group.send(PeerMessage::Failover).await;

        loop {
            let event = self.next_event().await;
            match event.kind {
                EventKind::FailoverWin => return OrchestratorState::Failover,
                k if k.is_always_interrupting() => return self.dispatch_interrupt(k),
                _ => {}
            }
        }
    }

    async fn run_failover(self: &Arc<Self>) -> OrchestratorState {
        self.declare_interrupting([]);

        if let Err(err) = self.hv.yank().await {
            warn!(%err, "failover: yank failed (best-effort)");
        }

        let was_primary = self.flags_snapshot().primary;
        let commands = {
            let config = self.config.lock().unwrap();
            if was_primary {
                config.failover_primary.clone()
            } else {
                config.failover_secondary.clone()
            }
        };
        let _ = self.exec_command_array(&commands, true).await;

        self.set_flag(|f| {
            f.primary = true;
            f.peer = String::new();
            f.peer_failed = false;
            f.peer_failover = false;
        });

        OrchestratorState::PrimaryWait
    }

    async fn run_failed_peer_failover(self: &Arc<Self>) -> OrchestratorState {
        self.set_flag(|f| f.peer_failover = true);
        OrchestratorState::Failed
    }

    async fn run_failed(self: &Arc<Self>) -> OrchestratorState {
        self.set_flag(|f| f.failed = true);
        self.group.send(PeerMessage::Failed).await;

        let timeout_low_ms = self.config.lock().unwrap().timeout_low_ms;
        self.hv.set_timeout(timeout_low_ms);

        if let Err(err) = self.hv.execute_nocheck(HvCommand::new(STOP)).await {
            debug!(%err, "failed: best-effort stop did not complete");
        }

        self.declare_interrupting([]);

        loop {
            let event = self.next_event().await;
            match event.kind {
                EventKind::PeerFailover => self.set_flag(|f| f.peer_failover = true),
                EventKind::Quit => return OrchestratorState::Quit,
                EventKind::AutoQuit => {
                    if self.hv.is_connected() {
                        return OrchestratorState::AutoQuit;
                    }
                    return OrchestratorState::Quit;
                }
                _ => {}
            }
        }
    }

    async fn run_autoquit(self: &Arc<Self>) -> OrchestratorState {
        self.set_flag(|f| f.failed = true);
        self.group.send(PeerMessage::Failed).await;
        self.hv.closed().await;
        OrchestratorState::Quit
    }

    // ---- background bridges ---------------------------------------------------

    async fn hv_event_bridge(self: Arc<Self>) {
        let mut events = self.hv.subscribe_events();
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
            };
            self.refresh_watchdog();

            match event.name.as_str() {
                "COLO_EXIT" => {
                    warn!(reason = ?event.data.get("reason"), "hypervisor reported COLO_EXIT");
                    self.raise(EventKind::FailoverSync, Some(event.data));
                }
                "RESET" => {
                    error!("hypervisor reported an unexpected RESET");
                    self.raise(EventKind::Failed, None);
                }
                "QUORUM_REPORT_BAD" => self.handle_quorum_report_bad(event.data).await,
                _ => {}
            }
        }
    }

    async fn handle_quorum_report_bad(self: &Arc<Self>, data: Value) {
        let node_name = data.get("node-name").and_then(Value::as_str).unwrap_or("");
        let kind = data.get("type").and_then(Value::as_str).unwrap_or("read");
        if kind == "read" {
            return;
        }

        if node_name == "nbd0" {
            warn!("nbd write/flush failure reported by quorum, raising failover sync");
            self.raise(EventKind::FailoverSync, Some(data));
            return;
        }

        warn!(node_name, "local disk quorum failure, announcing yellow");
        self.set_flag(|f| f.yellow = true);
        self.group.send(PeerMessage::Yellow).await;
        self.raise(EventKind::Yellow, Some(data));
    }

    async fn hv_closed_bridge(self: Arc<Self>) {
        self.hv.closed().await;
        self.set_flag(|f| f.qemu_quit = true);
        self.raise(EventKind::Failed, None);
    }

    async fn group_event_bridge(self: Arc<Self>) {
        let mut events = self.group.events();
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
            };

            match event {
                GroupEvent::Delivered { msg: PeerMessage::Failover, from_self: true } => {
                    self.raise(EventKind::FailoverWin, None);
                }
                GroupEvent::Delivered { msg: PeerMessage::Failover, from_self: false } => {
                    self.raise(EventKind::PeerFailover, None);
                }
                GroupEvent::Delivered { msg: PeerMessage::Yellow, from_self: false } => {
                    self.set_flag(|f| f.peer_yellow = true);
                }
                GroupEvent::Delivered { msg: PeerMessage::Unyellow, from_self: false } => {
                    self.set_flag(|f| f.peer_yellow = false);
                }
                GroupEvent::Delivered { msg: PeerMessage::Failed, from_self: false } => {
                    self.set_flag(|f| f.peer_failed = true);
                }
                GroupEvent::Delivered { .. } => {}
                GroupEvent::PeerLeft => {
                    warn!("peer left the group without a coordinated shutdown");
                    self.set_flag(|f| f.peer_failed = true);
                    self.raise(EventKind::FailoverSync, None);
                }
            }
        }
    }

    /// Consumes committed link-state transitions from the yellow debouncer (owned by
    /// the daemon binary, alongside the link monitor) and turns them into queued
    /// events. Call once after constructing the debouncer's commit channel.
    pub fn spawn_link_bridge(self: &Arc<Self>, mut commits: tokio::sync::mpsc::UnboundedReceiver<YellowCommit>) {
        let this = self.clone();
        tokio::spawn(async move {
            while let Some(commit) = commits.recv().await {
                match commit {
                    YellowCommit::Yellow => {
                        this.set_flag(|f| f.yellow = true);
                        this.raise(EventKind::Yellow, None);
                    }
                    YellowCommit::Unyellow => {
                        this.set_flag(|f| f.yellow = false);
                        this.raise(EventKind::Unyellow, None);
                    }
                }
            }
        });
    }

    async fn command_loop(self: Arc<Self>, commands: flume::Receiver<Command>) {
        while let Ok(command) = commands.recv_async().await {
            match command {
                Command::QueryStatus(tx) => {
                    let report = StatusReport::new(*self.state.lock().unwrap(), self.flags_snapshot());
                    let _ = tx.send(report);
                }
                Command::QueryStore(tx) => {
                    let _ = tx.send(self.store.lock().unwrap().clone());
                }
                Command::SetStore(value, tx) => {
                    *self.store.lock().unwrap() = value;
                    let _ = tx.send(());
                }
                Command::Quit(tx) => {
                    self.raise(EventKind::Quit, None);
                    let _ = tx.send(());
                }
                Command::AutoQuit(tx) => {
                    self.raise(EventKind::AutoQuit, None);
                    let _ = tx.send(());
                }
                Command::StartMigration(tx) => {
                    self.raise(EventKind::StartMigration, None);
                    let _ = tx.send(());
                }
                Command::SetCommands(slot, commands, tx) => {
                    self.set_commands(slot, commands);
                    let _ = tx.send(());
                }
                Command::SetYank(instances, tx) => {
                    *self.yank_instances.lock().unwrap() = instances;
                    let _ = tx.send(());
                }
                Command::Yank(tx) => {
                    let _ = tx.send(self.hv.yank().await);
                }
                Command::Stop(tx) => {
                    let _ = tx.send(self.hv.execute(HvCommand::new(STOP)).await);
                }
                Command::Cont(tx) => {
                    let _ = tx.send(self.hv.execute(HvCommand::new(CONT)).await);
                }
                Command::SetPeer(peer, tx) => {
                    self.set_flag(|f| f.peer = peer);
                    let _ = tx.send(());
                }
                Command::QueryPeer(tx) => {
                    let _ = tx.send(self.flags_snapshot().peer);
                }
                Command::ClearPeer(tx) => {
                    self.set_flag(|f| f.peer = String::new());
                    let _ = tx.send(());
                }
                Command::Passthrough(command, tx) => {
                    let _ = tx.send(self.hv.execute(command).await);
                }
            }
        }
    }

    // ---- small helpers ----------------------------------------------------------

    fn raise(&self, kind: EventKind, payload: Option<Value>) {
        let mut queue = self.queue.lock().expect("event queue lock poisoned");
        if queue.add(kind, payload).is_err() {
            error!(?kind, "event queue full, event dropped");
        }
        drop(queue);
        self.wake.notify_one();
    }

    async fn next_event(&self) -> Event {
        loop {
            if let Some(event) = self.queue.lock().expect("event queue lock poisoned").remove() {
                return event;
            }
            self.wake.notified().await;
        }
    }

    fn try_next_event(&self) -> Option<Event> {
        self.queue.lock().expect("event queue lock poisoned").remove()
    }

    fn check_interrupt(&self) -> Option<OrchestratorState> {
        let pending = self.queue.lock().expect("event queue lock poisoned").pending_interrupt();
        if !pending {
            return None;
        }
        self.try_next_event().map(|event| self.dispatch_interrupt(event.kind))
    }

    fn declare_interrupting(&self, kinds: impl IntoIterator<Item = EventKind>) {
        self.queue.lock().expect("event queue lock poisoned").set_interrupting(kinds);
    }

    fn dispatch_interrupt(&self, kind: EventKind) -> OrchestratorState {
        match kind {
            EventKind::Failed => OrchestratorState::Failed,
            EventKind::PeerFailover => OrchestratorState::FailedPeerFailover,
            EventKind::Quit => OrchestratorState::Quit,
            EventKind::AutoQuit => OrchestratorState::AutoQuit,
            EventKind::FailoverSync => OrchestratorState::FailoverSync,
            other => panic!("event kind {other:?} surfaced as an interrupt but has no dispatch target"),
        }
    }

    fn flags_snapshot(&self) -> RuntimeFlags {
        self.flags.lock().expect("flags lock poisoned").clone()
    }

    fn set_flag(&self, mutate: impl FnOnce(&mut RuntimeFlags)) {
        mutate(&mut self.flags.lock().expect("flags lock poisoned"));
    }

    fn refresh_watchdog(&self) {
        self.watchdog_refresh.notify_one();
    }

    fn set_commands(&self, slot: CommandSlot, commands: Vec<Value>) {
        let mut config = self.config.lock().expect("config lock poisoned");
        match slot {
            CommandSlot::MigrationStart => config.migration_start = commands,
            CommandSlot::MigrationSwitchover => config.migration_switchover = commands,
            CommandSlot::PrimaryFailover => config.failover_primary = commands,
            CommandSlot::SecondaryFailover => config.failover_secondary = commands,
        }
    }

    async fn exec(&self, name: &str) -> Result<Value, ColodError> {
        let result = self.hv.execute(HvCommand::new(name)).await;
        if result.is_ok() {
            self.refresh_watchdog();
        }
        result
    }

    async fn exec_args(&self, name: &str, arguments: Value) -> Result<Value, ColodError> {
        let result = self.hv.execute(HvCommand::with_arguments(name, arguments)).await;
        if result.is_ok() {
            self.refresh_watchdog();
        }
        result
    }

    async fn wait_for(&self, pattern: &Value, timeout: Duration) -> Result<colod_hv::HvEvent, ColodError> {
        let result = self.hv.wait_event(pattern, timeout, self).await;
        if result.is_ok() {
            self.refresh_watchdog();
        }
        result
    }

    async fn cancel_migration(&self) {
        if let Err(err) = self.hv.execute_nocheck(HvCommand::new(MIGRATE_CANCEL)).await {
            debug!(%err, "migrate_cancel failed (best-effort)");
        }
    }

    /// Executes `commands` (as configured by `set-migration-start` and friends) in
    /// order. In best-effort mode -- the failover arrays -- a failing command is
    /// logged and execution continues; otherwise the first error aborts the array.
    async fn exec_command_array(&self, commands: &[Value], best_effort: bool) -> Result<(), ColodError> {
        for raw in commands {
            let command = Self::value_to_hv_command(raw)?;
            match self.hv.execute(command).await {
                Ok(_) => self.refresh_watchdog(),
                Err(err) if best_effort => warn!(%err, "best-effort configured command failed, continuing"),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn value_to_hv_command(raw: &Value) -> Result<HvCommand, ColodError> {
        let execute = raw
            .get("execute")
            .and_then(Value::as_str)
            .ok_or_else(|| ColodError::Protocol("configured command is missing 'execute'".into()))?;
        Ok(match raw.get("arguments") {
            Some(arguments) => HvCommand::with_arguments(execute, arguments.clone()),
            None => HvCommand::new(execute),
        })
    }

    /// `query-status` + `query-colo-status`, checked against the expected
    /// `(primary, replication)` pair. A divergence is reported as a [`ColodError`] for
    /// the watchdog to turn into a `Failed` event.
    async fn check_health(self: &Arc<Self>) -> Result<(), ColodError> {
        let status = self.hv.execute(HvCommand::new(QUERY_STATUS)).await?;
        let colo_status = self.hv.execute(HvCommand::new(QUERY_COLO_STATUS)).await?;
        self.refresh_watchdog();

        let flags = self.flags_snapshot();
        let colo_mode = colo_status.get("mode").and_then(Value::as_str).unwrap_or("none");
        let actual_replication = colo_mode != "none";

        if flags.replication != actual_replication {
            return Err(ColodError::Protocol(format!(
                "watchdog mismatch: expected replication={}, hypervisor colo mode={colo_mode}",
                flags.replication
            )));
        }

        let _ = status;
        Ok(())
    }
}

impl Orchestrator {
    /// Cancelled once [`Orchestrator::run`] reaches `Quit`. Lets the daemon binary wait
    /// for shutdown without polling `query-status`.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

impl InterruptSource for Orchestrator {
    fn pending_interrupt(&self) -> bool {
        self.queue.lock().expect("event queue lock poisoned").pending_interrupt()
    }

    fn interrupt_notify(&self) -> Option<&Notify> {
        Some(&self.wake)
    }
}
