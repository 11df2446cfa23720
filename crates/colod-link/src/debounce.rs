use std::sync::Arc;
use std::time::Duration;

use colod_group::GroupAdapter;
use colod_types::PeerMessage;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::source::{LinkEvent, LinkSource};

/// Default hysteresis windows.
pub const DEFAULT_T1: Duration = Duration::from_millis(500);
pub const DEFAULT_T2: Duration = Duration::from_millis(1000);

/// The local commit the debouncer reports to the orchestrator once a transition has
/// survived both hysteresis windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YellowCommit {
    Yellow,
    Unyellow,
}

/// Two-stage hysteresis over link up/down transitions.
///
/// Waiting for a transition to target state `down` (or `up`): an event of the target
/// kind arms a `t1` timer; if the opposite kind arrives first, the wait restarts with
/// no announcement. On `t1` expiry the debouncer announces to the peer (`Yellow` or
/// `Unyellow`) and arms `t2`; if the opposite kind arrives before `t2`, the
/// announcement is reverted (the opposite message is sent) and the wait restarts. On
/// `t2` expiry the debouncer commits locally and flips its target to the opposite
/// kind.
///
/// This guarantees: no announcement for glitches shorter than `t1`; at most one
/// (announce, revert) pair per flap window; local state matches the announced state
/// within `t2`.
pub struct YellowDebouncer {
    t1: Duration,
    t2: Duration,
}

impl YellowDebouncer {
    pub fn new(t1: Duration, t2: Duration) -> Self {
        Self { t1, t2 }
    }

    /// Runs the debouncer loop against `link`, announcing through `group`, and
    /// delivering committed transitions on `commits`. Runs until the link source's
    /// broadcast channel closes.
    pub async fn run(
        self,
        link: Arc<dyn LinkSource>,
        group: Arc<GroupAdapter>,
        commits: mpsc::UnboundedSender<YellowCommit>,
    ) {
        let mut events = link.subscribe();
        // Initially waiting for a transition to "down" (Yellow).
        let mut target_down = true;

        loop {
            let Some(initial) = wait_for_target(&mut events, target_down).await else {
                return;
            };
            let _ = initial;

            match self.debounce_one(&mut events, target_down, &group).await {
                Some(true) => {
                    commits.send(if target_down { YellowCommit::Yellow } else { YellowCommit::Unyellow }).ok();
                    target_down = !target_down;
                }
                Some(false) => {
                    // Reverted inside t2; keep waiting for the same target.
                }
                None => return,
            }
        }
    }

    /// Runs steps 2-5 for a single candidate transition. Returns `Some(true)` if the
    /// transition committed, `Some(false)` if it was reverted during `t2`, or `None` if
    /// the link source closed.
    async fn debounce_one(
        &self,
        events: &mut broadcast::Receiver<LinkEvent>,
        target_down: bool,
        group: &Arc<GroupAdapter>,
    ) -> Option<bool> {
        // Step 2: arm t1; any event of the opposite kind before it expires aborts.
        tokio::select! {
            biased;
            event = wait_for_target(events, !target_down) => {
                event?;
                debug!(target_down, "link flap shorter than t1, no announcement");
                return Some(false);
            }
            _ = tokio::time::sleep(self.t1) => {}
        }

        // Step 3: announce.
        let announced = if target_down { PeerMessage::Yellow } else { PeerMessage::Unyellow };
        let reverted = if target_down { PeerMessage::Unyellow } else { PeerMessage::Yellow };
        group.send(announced).await;

        // Step 4: arm t2; an opposite-kind event reverts the announcement.
        tokio::select! {
            biased;
            event = wait_for_target(events, !target_down) => {
                event?;
                debug!(target_down, "link recovered inside t2, reverting announcement");
                group.send(reverted).await;
                return Some(false);
            }
            _ = tokio::time::sleep(self.t2) => {}
        }

        // Step 5: commit locally.
        Some(true)
    }
}

/// Waits for the next event whose `up` state matches `want_down == !event.up`.
async fn wait_for_target(events: &mut broadcast::Receiver<LinkEvent>, want_down: bool) -> Option<LinkEvent> {
    loop {
        match events.recv().await {
            Ok(event) if event.up == !want_down => return Some(event),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
