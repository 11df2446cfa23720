use std::sync::Arc;

use tokio::sync::broadcast;

use crate::channel::HypervisorChannel;
use crate::wire::{self, HvEvent};

/// Temporarily widens the channel's command timeout across a stop/resume window.
///
/// Raises `current_timeout_ms` to `timeout_high` immediately, waits for a `STOP` async
/// event and then a `RESUME`, then restores `timeout_low`. If either wait fails (the
/// channel closed, most likely), the task exits without restoring -- the surrounding
/// orchestrator state is tearing down anyway.
pub async fn run(channel: Arc<HypervisorChannel>, timeout_low_ms: u64, timeout_high_ms: u64) {
    channel.set_timeout(timeout_high_ms);

    let mut events = channel.subscribe_events();

    if wait_for(&mut events, "STOP").await.is_err() {
        return;
    }
    if wait_for(&mut events, "RESUME").await.is_err() {
        return;
    }

    channel.set_timeout(timeout_low_ms);
}

async fn wait_for(events: &mut broadcast::Receiver<HvEvent>, name: &str) -> Result<(), ()> {
    let pattern = wire::event_name_pattern(name);
    loop {
        match events.recv().await {
            Ok(event) if wire::matches_pattern(&event.as_value(), &pattern) => return Ok(()),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return Err(()),
        }
    }
}
