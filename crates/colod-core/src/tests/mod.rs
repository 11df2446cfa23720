use std::sync::Arc;
use std::time::Duration;

use colod_group::{GroupAdapter, LoopbackTransport};
use colod_hv::HypervisorChannel;
use event_bus::EventBus;
use serde_json::json;
use tokio::io::{split, AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::{CommandSlot, Orchestrator, OrchestratorConfig, OrchestratorHandle};

fn test_config(primary: bool) -> OrchestratorConfig {
    OrchestratorConfig {
        instance_name: "colotest".into(),
        node_name: if primary { "primary".into() } else { "secondary".into() },
        primary,
        watchdog_interval_ms: 0,
        pre_switchover_wait_ms: 2_000,
        migration_colo_wait_ms: 2_000,
        colo_running_grace_ms: 10,
        ..OrchestratorConfig::default()
    }
}

/// Sets up a hypervisor channel whose main stream is driven by a fake hypervisor end
/// the test can read commands from and write replies/events to directly. Mirrors
/// `colod-hv`'s own test harness.
async fn fake_hypervisor() -> (
    Arc<HypervisorChannel>,
    BufReader<tokio::io::ReadHalf<tokio::io::DuplexStream>>,
    tokio::io::WriteHalf<tokio::io::DuplexStream>,
) {
    let (local, remote) = tokio::io::duplex(8192);
    let (local_read, local_write) = split(local);
    let (remote_read, remote_write) = split(remote);

    let channel = HypervisorChannel::connect(local_read, local_write, tokio::io::sink(), 1_000);

    (channel, BufReader::new(remote_read), remote_write)
}

async fn expect_command(remote_read: &mut BufReader<tokio::io::ReadHalf<tokio::io::DuplexStream>>, execute: &str) {
    let mut line = String::new();
    remote_read.read_line(&mut line).await.unwrap();
    assert!(line.contains(execute), "expected a {execute} command, got: {line}");
}

async fn reply_ok(remote_write: &mut tokio::io::WriteHalf<tokio::io::DuplexStream>) {
    remote_write.write_all(b"{\"return\": {}}\n").await.unwrap();
}

#[tokio::test]
async fn secondary_startup_failure_goes_to_failed() {
    let (hv, mut remote_read, mut remote_write) = fake_hypervisor().await;
    let (transport, _peer) = LoopbackTransport::pair();
    let group = GroupAdapter::new(Arc::new(transport));

    let (orchestrator, commands, client) = Orchestrator::new(test_config(false), hv, group, EventBus::default());
    tokio::spawn(orchestrator.run(commands));

    expect_command(&mut remote_read, "enable-events-capability").await;
    remote_write
        .write_all(b"{\"error\": {\"class\": \"GenericError\", \"desc\": \"capability unsupported\"}}\n")
        .await
        .unwrap();

    let status = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let status = client.query_status().await.unwrap();
            if status.state == "failed" {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("orchestrator should reach Failed");

    assert!(status.flags.failed);

    client.quit().await.unwrap();
}

#[tokio::test]
async fn secondary_wins_failover_after_peer_leaves_and_becomes_primary() {
    let (hv, mut remote_read, mut remote_write) = fake_hypervisor().await;
    let (transport, peer_transport) = LoopbackTransport::pair();
    let group = GroupAdapter::new(Arc::new(transport));

    let (orchestrator, commands, client) = Orchestrator::new(test_config(false), hv, group, EventBus::default());
    tokio::spawn(orchestrator.run(commands));

    // SecondaryStartup.
    expect_command(&mut remote_read, "enable-events-capability").await;
    reply_ok(&mut remote_write).await;

    // SecondaryWait waits for RESUME to move into SecondaryColoRunning.
    remote_write
        .write_all(b"{\"event\": \"RESUME\", \"data\": {}, \"timestamp\": {}}\n")
        .await
        .unwrap();

    wait_for_state(&client, "secondary-colo-running").await;

    // The peer vanishes without a coordinated shutdown: treated as FailoverSync.
    peer_transport.leave();

    // The loopback group self-delivers our own Failover broadcast, winning the race
    // uncontested (the peer is gone and never answers).
    wait_for_state(&client, "failover").await;

    // Failover executes a best-effort yank and the (empty, by default) configured
    // failover_secondary array, then always lands in PrimaryWait as the new primary.
    let status = wait_for_state(&client, "primary-wait").await;
    assert!(status.flags.primary);
    assert!(!status.flags.peer_failed);

    // The management surface keeps working once we're primary.
    client.set_store(json!({"epoch": 1})).await.unwrap();
    assert_eq!(client.query_store().await.unwrap(), json!({"epoch": 1}));

    client.quit().await.unwrap();
    wait_for_state(&client, "quit").await;
}

async fn wait_for_state(client: &impl OrchestratorHandle, expected: &str) -> crate::StatusReport {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let status = client.query_status().await.unwrap();
            if status.state == expected {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("orchestrator never reached state {expected}"))
}

#[tokio::test]
async fn set_commands_replaces_the_targeted_array() {
    let (hv, mut remote_read, mut remote_write) = fake_hypervisor().await;
    let (transport, _peer) = LoopbackTransport::pair();
    let group = GroupAdapter::new(Arc::new(transport));

    let (orchestrator, commands, client) = Orchestrator::new(test_config(true), hv, group, EventBus::default());
    tokio::spawn(orchestrator.run(commands));

    expect_command(&mut remote_read, "enable-events-capability").await;
    reply_ok(&mut remote_write).await;
    wait_for_state(&client, "primary-wait").await;

    client
        .set_commands(CommandSlot::MigrationStart, vec![json!({"execute": "migrate-set-parameters"})])
        .await
        .unwrap();

    client.start_migration().await.unwrap();
    wait_for_state(&client, "primary-start-migration").await;

    expect_command(&mut remote_read, "enable-events-capability").await;
    reply_ok(&mut remote_write).await;
    expect_command(&mut remote_read, "enable-pause-before-switchover-capability").await;
    reply_ok(&mut remote_write).await;
    expect_command(&mut remote_read, "migrate-set-parameters").await;
    reply_ok(&mut remote_write).await;

    client.quit().await.unwrap();
}
