use std::path::PathBuf;

use clap::Args;

/// Flags accepted by `colod run`. `instance_name`, `node_name`, `base_directory` and
/// `qmp_path` have no defaults and must be supplied; everything else falls back to the
/// orchestrator's own defaults (see `colod_core::config`).
#[derive(Args, Debug, Clone)]
pub struct Run {
    /// Fork into the background once startup succeeds.
    #[clap(long)]
    pub daemonize: bool,

    /// Send log output to syslog instead of `<base_directory>/colod.log`.
    #[clap(long)]
    pub syslog: bool,

    /// Group name this instance and its peer join for failover handshaking.
    #[clap(long)]
    pub instance_name: String,

    /// This node's own name, used for watchdog/quorum attribution.
    #[clap(long)]
    pub node_name: String,

    /// Directory holding the pid file, logs, and management socket.
    #[clap(long)]
    pub base_directory: PathBuf,

    /// Path of the hypervisor's main QMP control socket.
    #[clap(long)]
    pub qmp_path: PathBuf,

    /// Path of the hypervisor's auxiliary QMP socket used for `yank`.
    #[clap(long)]
    pub qmp_yank_path: Option<PathBuf>,

    /// Steady-state hypervisor command timeout, in milliseconds.
    #[clap(long)]
    pub timeout_low: Option<u64>,

    /// Widened hypervisor command timeout held across a stop/resume window, in milliseconds.
    #[clap(long)]
    pub timeout_high: Option<u64>,

    /// Watchdog tick period, in milliseconds. `0` disables the watchdog.
    #[clap(long)]
    pub watchdog_interval: Option<u64>,

    /// Start as the primary instance rather than the secondary.
    #[clap(long)]
    pub primary: bool,

    /// Additionally log to `<base_directory>/trace.log` at trace verbosity.
    #[clap(long)]
    pub trace: bool,

    /// Network interface whose link-carrier state feeds the yellow debouncer.
    #[clap(long)]
    pub monitor_interface: Option<String>,
}
