use std::path::PathBuf;

use colod_core::OrchestratorConfig;

mod group;
mod logger;

pub use group::GroupConfig;
pub use logger::LoggerConfig;

use crate::cli::arguments::Run;

/// Everything `colod run` needs, assembled from CLI flags plus the one file-backed
/// setting ([`GroupConfig`]) that has no CLI equivalent.
pub struct NodeConfig {
    pub orchestrator: OrchestratorConfig,
    pub group: GroupConfig,
    pub logger: LoggerConfig,
    pub daemonize: bool,
    pub syslog: bool,
    pub trace: bool,
    pub base_directory: PathBuf,
    pub qmp_path: PathBuf,
    pub qmp_yank_path: Option<PathBuf>,
    pub monitor_interface: Option<String>,
}

impl NodeConfig {
    pub fn from_args(args: Run) -> eyre::Result<Self> {
        let group = GroupConfig::from_path(&args.base_directory.join("group.toml"))?;

        let mut orchestrator = OrchestratorConfig {
            instance_name: args.instance_name,
            node_name: args.node_name,
            primary: args.primary,
            ..OrchestratorConfig::default()
        };
        if let Some(timeout_low) = args.timeout_low {
            orchestrator.timeout_low_ms = timeout_low;
        }
        if let Some(timeout_high) = args.timeout_high {
            orchestrator.timeout_high_ms = timeout_high;
        }
        if let Some(watchdog_interval) = args.watchdog_interval {
            orchestrator.watchdog_interval_ms = watchdog_interval;
        }

        Ok(Self {
            orchestrator,
            group,
            logger: LoggerConfig {
                level: if args.trace { tracing::Level::TRACE } else { tracing::Level::INFO },
            },
            daemonize: args.daemonize,
            syslog: args.syslog,
            trace: args.trace,
            base_directory: args.base_directory,
            qmp_path: args.qmp_path,
            qmp_yank_path: args.qmp_yank_path,
            monitor_interface: args.monitor_interface,
        })
    }
}
