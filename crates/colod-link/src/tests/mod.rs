use std::sync::Arc;
use std::time::Duration;

use colod_group::{GroupAdapter, GroupEvent, LoopbackTransport};
use colod_types::PeerMessage;
use tokio::sync::mpsc;

use crate::{ManualLinkSource, YellowCommit, YellowDebouncer};

fn short_windows() -> YellowDebouncer {
    YellowDebouncer::new(Duration::from_millis(50), Duration::from_millis(50))
}

#[tokio::test]
async fn test_glitch_shorter_than_t1_does_not_announce() {
    let link = Arc::new(ManualLinkSource::new());
    let (transport, peer_transport) = LoopbackTransport::pair();
    let group = GroupAdapter::new(Arc::new(transport));
    let peer_group = GroupAdapter::new(Arc::new(peer_transport));
    let mut peer_events = peer_group.events();
    let (commit_tx, mut commit_rx) = mpsc::unbounded_channel();

    tokio::spawn(short_windows().run(link.clone(), group, commit_tx));

    link.push(false); // down
    tokio::time::sleep(Duration::from_millis(10)).await;
    link.push(true); // up again, well inside t1=50ms

    let no_commit = tokio::time::timeout(Duration::from_millis(200), commit_rx.recv()).await;
    assert!(no_commit.is_err(), "no commit expected for a sub-t1 flap");

    let no_announce = tokio::time::timeout(Duration::from_millis(50), peer_events.recv()).await;
    assert!(no_announce.is_err(), "no Yellow broadcast expected for a sub-t1 flap");
}

#[tokio::test]
async fn test_sustained_down_announces_then_commits() {
    let link = Arc::new(ManualLinkSource::new());
    let (transport, peer_transport) = LoopbackTransport::pair();
    let group = GroupAdapter::new(Arc::new(transport));
    let peer_group = GroupAdapter::new(Arc::new(peer_transport));
    let mut peer_events = peer_group.events();
    let (commit_tx, mut commit_rx) = mpsc::unbounded_channel();

    tokio::spawn(short_windows().run(link.clone(), group, commit_tx));

    link.push(false); // down, and stays down through t1 + t2

    let announced = tokio::time::timeout(Duration::from_millis(500), peer_events.recv())
        .await
        .expect("peer observes the Yellow announcement")
        .unwrap();
    assert!(matches!(
        announced,
        GroupEvent::Delivered {
            msg: PeerMessage::Yellow,
            ..
        }
    ));

    let committed = tokio::time::timeout(Duration::from_millis(500), commit_rx.recv())
        .await
        .expect("local commit observed")
        .unwrap();
    assert_eq!(committed, YellowCommit::Yellow);
}

#[tokio::test]
async fn test_recovery_inside_t2_reverts_announcement() {
    let link = Arc::new(ManualLinkSource::new());
    let (transport, peer_transport) = LoopbackTransport::pair();
    let group = GroupAdapter::new(Arc::new(transport));
    let peer_group = GroupAdapter::new(Arc::new(peer_transport));
    let mut peer_events = peer_group.events();
    let (commit_tx, mut commit_rx) = mpsc::unbounded_channel();

    tokio::spawn(short_windows().run(link.clone(), group, commit_tx));

    link.push(false); // down

    // Wait for the Yellow announcement (t1 elapsed), then flip back up before t2.
    loop {
        let event = peer_events.recv().await.unwrap();
        if let GroupEvent::Delivered { msg: PeerMessage::Yellow, .. } = event {
            break;
        }
    }
    link.push(true);

    let reverted = peer_events.recv().await.unwrap();
    assert!(matches!(
        reverted,
        GroupEvent::Delivered {
            msg: PeerMessage::Unyellow,
            ..
        }
    ));

    let no_commit = tokio::time::timeout(Duration::from_millis(150), commit_rx.recv()).await;
    assert!(no_commit.is_err(), "reverted transition must not commit");
}
