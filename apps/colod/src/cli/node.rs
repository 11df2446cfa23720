use std::sync::Arc;
use std::time::Duration;

use colod_client::ServerConfig;
use colod_core::{Orchestrator, OrchestratorHandle, OrchestratorSignal};
use colod_group::{GroupAdapter, TcpTransport};
use colod_hv::HypervisorChannel;
use colod_link::{LinkSource, SysfsLinkSource, YellowDebouncer, DEFAULT_T1, DEFAULT_T2};
use event_bus::EventBus;
use eyre::{Context, Result};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use crate::config::NodeConfig;

/// Encapsulates one running colod instance: the orchestrator, the management socket,
/// and the background tasks bridging the link monitor into it. A struct owning a
/// `TaskTracker` and a `CancellationToken`, constructed once at startup and driven by
/// `run`/`shutdown`.
pub struct Node {
    client: colod_core::OrchestratorClient,
    cancellation: CancellationToken,
    pub(crate) task_tracker: TaskTracker,
}

impl Node {
    pub async fn new(config: NodeConfig) -> Result<Self> {
        let hv = Self::connect_hypervisor(&config).await?;

        let group_transport = Self::join_group(&config).await?;
        let group = GroupAdapter::new(Arc::new(group_transport));

        let mut event_bus = EventBus::default();
        event_bus.register::<OrchestratorSignal>(Some(64));

        let (orchestrator, commands, client) =
            Orchestrator::new(config.orchestrator.clone(), hv, group.clone(), event_bus.clone());

        let task_tracker = TaskTracker::new();
        let cancellation = orchestrator_cancellation(&orchestrator);

        task_tracker.spawn(orchestrator.clone().run(commands));
        task_tracker.spawn(log_state_changes(event_bus));

        if let Some(interface) = config.monitor_interface.clone() {
            let link: Arc<dyn LinkSource> = Arc::new(SysfsLinkSource::spawn(interface, Duration::from_millis(200)));
            let (commits_tx, commits_rx) = mpsc::unbounded_channel();
            orchestrator.spawn_link_bridge(commits_rx);
            task_tracker.spawn(YellowDebouncer::new(DEFAULT_T1, DEFAULT_T2).run(link, group.clone(), commits_tx));
        }

        task_tracker.spawn(colod_client::run_server(
            ServerConfig {
                socket_path: config.base_directory.join("colod.sock"),
            },
            client.clone(),
            cancellation.clone(),
        ));

        Ok(Self {
            client,
            cancellation,
            task_tracker,
        })
    }

    async fn connect_hypervisor(config: &NodeConfig) -> Result<Arc<HypervisorChannel>> {
        let main = UnixStream::connect(&config.qmp_path)
            .await
            .wrap_err_with(|| format!("failed to connect to hypervisor at {:?}", config.qmp_path))?;
        let (main_read, main_write) = main.into_split();

        let channel = match &config.qmp_yank_path {
            Some(yank_path) => {
                let yank = UnixStream::connect(yank_path)
                    .await
                    .wrap_err_with(|| format!("failed to connect to yank socket at {yank_path:?}"))?;
                let (_yank_read, yank_write) = yank.into_split();
                HypervisorChannel::connect(main_read, main_write, yank_write, config.orchestrator.timeout_low_ms)
            }
            None => HypervisorChannel::connect(main_read, main_write, tokio::io::sink(), config.orchestrator.timeout_low_ms),
        };

        Ok(channel)
    }

    async fn join_group(config: &NodeConfig) -> Result<TcpTransport> {
        if config.orchestrator.primary {
            TcpTransport::accept(config.group.listen).await.wrap_err("failed to accept peer group connection")
        } else {
            TcpTransport::connect(config.group.peer).await.wrap_err("failed to connect to peer group")
        }
    }

    /// Waits for the orchestrator to reach `Quit`.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    pub async fn shutdown(&self) {
        info!("shutting down, waiting for background tasks to finish");

        self.task_tracker.close();
        self.task_tracker.wait().await;
    }

    pub fn handle(&self) -> &impl OrchestratorHandle {
        &self.client
    }
}

fn orchestrator_cancellation(orchestrator: &Arc<Orchestrator>) -> CancellationToken {
    orchestrator.cancellation()
}

async fn log_state_changes(event_bus: EventBus) {
    let mut states = event_bus.subscribe::<OrchestratorSignal>();
    while let Ok(OrchestratorSignal::StateChanged(state)) = states.recv().await {
        info!(state = state.as_str(), "orchestrator state changed");
    }
}
