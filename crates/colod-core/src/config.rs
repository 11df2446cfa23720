use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_TIMEOUT_LOW_MS: u64 = 600;
pub const DEFAULT_TIMEOUT_HIGH_MS: u64 = 10_000;
pub const DEFAULT_WATCHDOG_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_COLO_RUNNING_GRACE_MS: u64 = 10_000;
pub const DEFAULT_PRE_SWITCHOVER_WAIT_MS: u64 = 300_000;
pub const DEFAULT_MIGRATION_COLO_WAIT_MS: u64 = 10_000;

/// Static orchestrator configuration, loaded once at startup from the daemon's config
/// file and CLI flags. The mutable command arrays (`migration_start` and friends) start
/// from here but are replaced wholesale at runtime by the management socket's
/// `set-migration-start`/`set-migration-switchover`/`set-*-failover` commands -- see
/// [`crate::orchestrator::Orchestrator::set_commands`].
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    pub instance_name: String,
    pub node_name: String,
    #[serde(default)]
    pub primary: bool,

    /// Steady-state hypervisor command timeout.
    #[serde(default = "default_timeout_low_ms")]
    pub timeout_low_ms: u64,
    /// Widened timeout held across a stop/resume window (see `colod-hv::run_raise_timeout`).
    #[serde(default = "default_timeout_high_ms")]
    pub timeout_high_ms: u64,
    /// Watchdog tick period; 0 disables the watchdog entirely.
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,
    /// How long `PrimaryColoRunning` waits after the second post-migration `RESUME`
    /// before checking `yellow && !peer_yellow`. A heuristic grace period for
    /// transient yellows to settle; kept configurable per the open question in the
    /// orchestrator's design notes.
    #[serde(default = "default_colo_running_grace_ms")]
    pub colo_running_grace_ms: u64,
    /// Deadline for the `MIGRATION pre-switchover` event during `PrimaryStartMigration`.
    #[serde(default = "default_pre_switchover_wait_ms")]
    pub pre_switchover_wait_ms: u64,
    /// Deadline for the `MIGRATION colo` event once migration has switched over.
    #[serde(default = "default_migration_colo_wait_ms")]
    pub migration_colo_wait_ms: u64,

    /// Commands executed, in order, when entering `PrimaryStartMigration` before the
    /// switchover wait.
    #[serde(default)]
    pub migration_start: Vec<Value>,
    /// Commands executed, in order, once `MIGRATION pre-switchover` is observed.
    #[serde(default)]
    pub migration_switchover: Vec<Value>,
    /// Commands executed, best-effort, when this side becomes primary via failover.
    #[serde(default)]
    pub failover_primary: Vec<Value>,
    /// Commands executed, best-effort, when this side becomes secondary via failover.
    #[serde(default)]
    pub failover_secondary: Vec<Value>,
}

fn default_timeout_low_ms() -> u64 {
    DEFAULT_TIMEOUT_LOW_MS
}

fn default_timeout_high_ms() -> u64 {
    DEFAULT_TIMEOUT_HIGH_MS
}

fn default_watchdog_interval_ms() -> u64 {
    DEFAULT_WATCHDOG_INTERVAL_MS
}

fn default_colo_running_grace_ms() -> u64 {
    DEFAULT_COLO_RUNNING_GRACE_MS
}

fn default_pre_switchover_wait_ms() -> u64 {
    DEFAULT_PRE_SWITCHOVER_WAIT_MS
}

fn default_migration_colo_wait_ms() -> u64 {
    DEFAULT_MIGRATION_COLO_WAIT_MS
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            instance_name: String::new(),
            node_name: String::new(),
            primary: false,
            timeout_low_ms: default_timeout_low_ms(),
            timeout_high_ms: default_timeout_high_ms(),
            watchdog_interval_ms: default_watchdog_interval_ms(),
            colo_running_grace_ms: default_colo_running_grace_ms(),
            pre_switchover_wait_ms: default_pre_switchover_wait_ms(),
            migration_colo_wait_ms: default_migration_colo_wait_ms(),
            migration_start: Vec::new(),
            migration_switchover: Vec::new(),
            failover_primary: Vec::new(),
            failover_secondary: Vec::new(),
        }
    }
}

/// Which mutable command array a `set-*` management command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSlot {
    MigrationStart,
    MigrationSwitchover,
    PrimaryFailover,
    SecondaryFailover,
}
