use tokio::sync::broadcast;

/// A change in the monitored interface's link-carrier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEvent {
    pub up: bool,
}

/// Abstracts the kernel link-state subscription. The production backend polls
/// `/sys/class/net/<iface>/operstate`; tests drive a [`ManualLinkSource`] directly.
pub trait LinkSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<LinkEvent>;
}

const EVENTS_CAPACITY: usize = 64;

/// Polls sysfs for carrier state changes on `iface`. `/sys/class/net/<iface>/operstate`
/// reads `"up"` when the carrier is present and link negotiation succeeded; anything
/// else (`"down"`, `"unknown"`, file missing because the interface was unplugged) is
/// treated as down.
pub struct SysfsLinkSource {
    events_tx: broadcast::Sender<LinkEvent>,
}

impl SysfsLinkSource {
    pub fn spawn(iface: impl Into<String>, poll_interval: std::time::Duration) -> Self {
        let (events_tx, _) = broadcast::channel(EVENTS_CAPACITY);
        let iface = iface.into();
        let tx = events_tx.clone();

        tokio::spawn(async move {
            let path = format!("/sys/class/net/{iface}/operstate");
            let mut last_up: Option<bool> = None;
            let mut interval = tokio::time::interval(poll_interval);

            loop {
                interval.tick().await;

                let up = tokio::fs::read_to_string(&path)
                    .await
                    .map(|state| state.trim() == "up")
                    .unwrap_or(false);

                if last_up != Some(up) {
                    last_up = Some(up);
                    let _ = tx.send(LinkEvent { up });
                }
            }
        });

        Self { events_tx }
    }
}

impl LinkSource for SysfsLinkSource {
    fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events_tx.subscribe()
    }
}

/// A link source driven explicitly by tests.
pub struct ManualLinkSource {
    events_tx: broadcast::Sender<LinkEvent>,
}

impl ManualLinkSource {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(EVENTS_CAPACITY);
        Self { events_tx }
    }

    pub fn push(&self, up: bool) {
        let _ = self.events_tx.send(LinkEvent { up });
    }
}

impl Default for ManualLinkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkSource for ManualLinkSource {
    fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events_tx.subscribe()
    }
}
