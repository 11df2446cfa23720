//! The orchestrator's external command surface. `colod-client` (the management socket
//! adapter) talks to the orchestrator exclusively through an [`OrchestratorHandle`],
//! never by touching orchestrator state directly -- mirrors the p2p crate's
//! `client::handle::Handle` split between a trait callers depend on and a channel-backed
//! implementation that forwards to the worker task.
use colod_hv::HvCommand;
use colod_types::ColodError;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::config::CommandSlot;
use crate::status::StatusReport;

#[derive(Error, Debug)]
pub enum Error {
    #[error("orchestrator command channel disconnected")]
    Disconnected,
    #[error(transparent)]
    Command(#[from] ColodError),
}

impl From<flume::RecvError> for Error {
    fn from(_: flume::RecvError) -> Self {
        Self::Disconnected
    }
}

impl From<oneshot::error::RecvError> for Error {
    fn from(_: oneshot::error::RecvError) -> Self {
        Self::Disconnected
    }
}

impl<T> From<flume::SendError<T>> for Error {
    fn from(_: flume::SendError<T>) -> Self {
        Self::Disconnected
    }
}

/// A command accepted by the orchestrator's worker loop, paired with the reply channel
/// the issuing [`OrchestratorHandle`] call is waiting on.
pub enum Command {
    QueryStatus(oneshot::Sender<StatusReport>),
    QueryStore(oneshot::Sender<Value>),
    SetStore(Value, oneshot::Sender<()>),
    Quit(oneshot::Sender<()>),
    AutoQuit(oneshot::Sender<()>),
    StartMigration(oneshot::Sender<()>),
    SetCommands(CommandSlot, Vec<Value>, oneshot::Sender<()>),
    SetYank(Vec<Value>, oneshot::Sender<()>),
    Yank(oneshot::Sender<Result<(), ColodError>>),
    Stop(oneshot::Sender<Result<Value, ColodError>>),
    Cont(oneshot::Sender<Result<Value, ColodError>>),
    SetPeer(String, oneshot::Sender<()>),
    QueryPeer(oneshot::Sender<String>),
    ClearPeer(oneshot::Sender<()>),
    /// A command not recognised by `exec-colod`, proxied verbatim to the hypervisor.
    Passthrough(HvCommand, oneshot::Sender<Result<Value, ColodError>>),
}

/// A handle for issuing management commands to a running orchestrator.
#[async_trait::async_trait]
pub trait OrchestratorHandle: Sized + Send + Sync + Clone {
    async fn query_status(&self) -> Result<StatusReport, Error>;
    async fn query_store(&self) -> Result<Value, Error>;
    async fn set_store(&self, store: Value) -> Result<(), Error>;
    async fn quit(&self) -> Result<(), Error>;
    async fn autoquit(&self) -> Result<(), Error>;
    async fn start_migration(&self) -> Result<(), Error>;
    async fn set_commands(&self, slot: CommandSlot, commands: Vec<Value>) -> Result<(), Error>;
    async fn set_yank(&self, instances: Vec<Value>) -> Result<(), Error>;
    async fn yank(&self) -> Result<(), Error>;
    async fn stop(&self) -> Result<Value, Error>;
    async fn cont(&self) -> Result<Value, Error>;
    async fn set_peer(&self, peer: String) -> Result<(), Error>;
    async fn query_peer(&self) -> Result<String, Error>;
    async fn clear_peer(&self) -> Result<(), Error>;
    async fn passthrough(&self, command: HvCommand) -> Result<Value, Error>;
}

/// The concrete [`OrchestratorHandle`], forwarding every call over a `flume` channel to
/// the orchestrator's own task.
#[derive(Clone)]
pub struct OrchestratorClient {
    commands: flume::Sender<Command>,
}

impl OrchestratorClient {
    pub fn new(commands: flume::Sender<Command>) -> Self {
        Self { commands }
    }
}

#[async_trait::async_trait]
impl OrchestratorHandle for OrchestratorClient {
    async fn query_status(&self) -> Result<StatusReport, Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::QueryStatus(tx)).await?;
        Ok(rx.await?)
    }

    async fn query_store(&self) -> Result<Value, Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::QueryStore(tx)).await?;
        Ok(rx.await?)
    }

    async fn set_store(&self, store: Value) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::SetStore(store, tx)).await?;
        Ok(rx.await?)
    }

    async fn quit(&self) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::Quit(tx)).await?;
        Ok(rx.await?)
    }

    async fn autoquit(&self) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::AutoQuit(tx)).await?;
        Ok(rx.await?)
    }

    async fn start_migration(&self) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::StartMigration(tx)).await?;
        Ok(rx.await?)
    }

    async fn set_commands(&self, slot: CommandSlot, commands: Vec<Value>) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::SetCommands(slot, commands, tx)).await?;
        Ok(rx.await?)
    }

    async fn set_yank(&self, instances: Vec<Value>) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::SetYank(instances, tx)).await?;
        Ok(rx.await?)
    }

    async fn yank(&self) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::Yank(tx)).await?;
        Ok(rx.await??)
    }

    async fn stop(&self) -> Result<Value, Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::Stop(tx)).await?;
        Ok(rx.await??)
    }

    async fn cont(&self) -> Result<Value, Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::Cont(tx)).await?;
        Ok(rx.await??)
    }

    async fn set_peer(&self, peer: String) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::SetPeer(peer, tx)).await?;
        Ok(rx.await?)
    }

    async fn query_peer(&self) -> Result<String, Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::QueryPeer(tx)).await?;
        Ok(rx.await?)
    }

    async fn clear_peer(&self) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::ClearPeer(tx)).await?;
        Ok(rx.await?)
    }

    async fn passthrough(&self, command: HvCommand) -> Result<Value, Error> {
        let (tx, rx) = oneshot::channel();
        self.commands.send_async(Command::Passthrough(command, tx)).await?;
        Ok(rx.await??)
    }
}

#[cfg(any(test, feature = "mocks"))]
mockall::mock! {
    pub Handle {}

    impl Clone for Handle {
        fn clone(&self) -> Self;
    }

    #[async_trait::async_trait]
    impl OrchestratorHandle for Handle {
        async fn query_status(&self) -> Result<StatusReport, Error>;
        async fn query_store(&self) -> Result<Value, Error>;
        async fn set_store(&self, store: Value) -> Result<(), Error>;
        async fn quit(&self) -> Result<(), Error>;
        async fn autoquit(&self) -> Result<(), Error>;
        async fn start_migration(&self) -> Result<(), Error>;
        async fn set_commands(&self, slot: CommandSlot, commands: Vec<Value>) -> Result<(), Error>;
        async fn set_yank(&self, instances: Vec<Value>) -> Result<(), Error>;
        async fn yank(&self) -> Result<(), Error>;
        async fn stop(&self) -> Result<Value, Error>;
        async fn cont(&self) -> Result<Value, Error>;
        async fn set_peer(&self, peer: String) -> Result<(), Error>;
        async fn query_peer(&self) -> Result<String, Error>;
        async fn clear_peer(&self) -> Result<(), Error>;
        async fn passthrough(&self, command: HvCommand) -> Result<Value, Error>;
    }
}
