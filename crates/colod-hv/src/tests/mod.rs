use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{split, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Notify;

use crate::channel::InterruptSource;
use crate::{HvCommand, HypervisorChannel};

struct NeverInterrupt;
impl InterruptSource for NeverInterrupt {
    fn pending_interrupt(&self) -> bool {
        false
    }
}

struct AlwaysInterrupt;
impl InterruptSource for AlwaysInterrupt {
    fn pending_interrupt(&self) -> bool {
        true
    }
}

/// An interrupt source that starts clear and is flipped by a background task poking
/// `notify`, mimicking how `Orchestrator::raise` pushes an event then wakes `wait_event`.
#[derive(Default)]
struct RaisedLater {
    flag: AtomicBool,
    notify: Notify,
}

impl RaisedLater {
    fn raise(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }
}

impl InterruptSource for RaisedLater {
    fn pending_interrupt(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn interrupt_notify(&self) -> Option<&Notify> {
        Some(&self.notify)
    }
}

/// Sets up a channel whose main stream is driven by a fake hypervisor end the test can
/// read lines from and write replies/events to directly.
async fn fake_hypervisor() -> (
    std::sync::Arc<HypervisorChannel>,
    BufReader<tokio::io::ReadHalf<tokio::io::DuplexStream>>,
    tokio::io::WriteHalf<tokio::io::DuplexStream>,
) {
    let (local, remote) = tokio::io::duplex(8192);
    let (local_read, local_write) = split(local);
    let (remote_read, remote_write) = split(remote);

    let channel = HypervisorChannel::connect(local_read, local_write, tokio::io::sink(), 1_000);

    (channel, BufReader::new(remote_read), remote_write)
}

#[tokio::test]
async fn test_execute_round_trip() {
    let (channel, mut remote_read, mut remote_write) = fake_hypervisor().await;

    let call = tokio::spawn({
        let channel = channel.clone();
        async move { channel.execute(HvCommand::new("query-status")).await }
    });

    let mut line = String::new();
    remote_read.read_line(&mut line).await.unwrap();
    assert!(line.contains("query-status"));

    remote_write
        .write_all(b"{\"return\": {\"running\": true}}\n")
        .await
        .unwrap();

    let result = call.await.unwrap().unwrap();
    assert_eq!(result["running"], true);
}

#[tokio::test]
async fn test_execute_lifts_error_reply() {
    let (channel, mut remote_read, mut remote_write) = fake_hypervisor().await;

    let call = tokio::spawn({
        let channel = channel.clone();
        async move { channel.execute(HvCommand::new("stop")).await }
    });

    let mut line = String::new();
    remote_read.read_line(&mut line).await.unwrap();

    remote_write
        .write_all(b"{\"error\": {\"class\": \"GenericError\", \"desc\": \"boom\"}}\n")
        .await
        .unwrap();

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, colod_types::ColodError::HypervisorCommand(_)));
}

#[tokio::test]
async fn test_execute_nocheck_surfaces_raw_error_reply() {
    let (channel, mut remote_read, mut remote_write) = fake_hypervisor().await;

    let call = tokio::spawn({
        let channel = channel.clone();
        async move { channel.execute_nocheck(HvCommand::new("stop")).await }
    });

    let mut line = String::new();
    remote_read.read_line(&mut line).await.unwrap();
    remote_write
        .write_all(b"{\"error\": {\"class\": \"GenericError\", \"desc\": \"boom\"}}\n")
        .await
        .unwrap();

    let reply = call.await.unwrap().unwrap();
    assert!(matches!(reply, crate::HvReply::Error(_)));
}

#[tokio::test]
async fn test_execute_times_out_with_no_reply() {
    let (channel, _remote_read, _remote_write) = fake_hypervisor().await;
    channel.set_timeout(20);

    let err = channel.execute(HvCommand::new("stop")).await.unwrap_err();
    assert!(matches!(err, colod_types::ColodError::Timeout));
}

#[tokio::test]
async fn test_wait_event_matches_pattern() {
    let (channel, _remote_read, mut remote_write) = fake_hypervisor().await;

    let waiter = tokio::spawn({
        let channel = channel.clone();
        async move {
            channel
                .wait_event(&crate::event_name_pattern("RESUME"), Duration::from_secs(1), &NeverInterrupt)
                .await
        }
    });

    remote_write
        .write_all(b"{\"event\": \"STOP\", \"data\": {}, \"timestamp\": {}}\n")
        .await
        .unwrap();
    remote_write
        .write_all(b"{\"event\": \"RESUME\", \"data\": {}, \"timestamp\": {}}\n")
        .await
        .unwrap();

    let event = waiter.await.unwrap().unwrap();
    assert_eq!(event.name, "RESUME");
}

#[tokio::test]
async fn test_wait_event_checks_interrupt_before_blocking() {
    let (channel, _remote_read, _remote_write) = fake_hypervisor().await;

    let err = channel
        .wait_event(&crate::event_name_pattern("RESUME"), Duration::from_secs(5), &AlwaysInterrupt)
        .await
        .unwrap_err();

    assert!(matches!(err, colod_types::ColodError::Interrupt));
}

#[tokio::test]
async fn test_wait_event_wakes_immediately_on_raised_interrupt() {
    let (channel, _remote_read, _remote_write) = fake_hypervisor().await;
    let interrupt = std::sync::Arc::new(RaisedLater::default());

    let waiter = tokio::spawn({
        let channel = channel.clone();
        let interrupt = interrupt.clone();
        async move {
            channel
                .wait_event(&crate::event_name_pattern("RESUME"), Duration::from_secs(3600), interrupt.as_ref())
                .await
        }
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    interrupt.raise();

    let err = tokio::time::timeout(Duration::from_millis(500), waiter)
        .await
        .expect("wait_event should wake well before the 3600s timeout")
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, colod_types::ColodError::Interrupt));
}

#[tokio::test]
async fn test_eof_closes_channel_and_fails_outstanding_execute() {
    let (channel, _remote_read, remote_write) = fake_hypervisor().await;

    let call = tokio::spawn({
        let channel = channel.clone();
        async move { channel.execute(HvCommand::new("stop")).await }
    });

    drop(remote_write);

    channel.closed().await;
    assert!(!channel.is_connected());

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, colod_types::ColodError::Eof));
}
