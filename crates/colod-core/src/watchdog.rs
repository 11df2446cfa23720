use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use colod_types::ColodError;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Periodic hypervisor health probe. Runs with period `interval_ms` (0 disables it
/// entirely); each tick invokes `check_health`. Any successful async event or command
/// reply observed elsewhere refreshes the timer by calling `Notify::notify_one` on the
/// `refresh` handle this function was given, which resets the tick interval instead of
/// letting a stale check fire right after real traffic proved the channel live.
pub async fn run<Check, Fut, OnFail>(
    interval_ms: u64,
    refresh: Arc<Notify>,
    cancellation: CancellationToken,
    mut check_health: Check,
    on_failure: OnFail,
) where
    Check: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ColodError>>,
    OnFail: Fn(ColodError),
{
    if interval_ms == 0 {
        return;
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    ticker.tick().await; // first tick is immediate; consume it before the real loop

    loop {
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => return,
            _ = refresh.notified() => {
                ticker.reset();
            }
            _ = ticker.tick() => {
                if let Err(err) = check_health().await {
                    warn!(%err, "watchdog health check failed");
                    on_failure(err);
                }
            }
        }
    }
}
