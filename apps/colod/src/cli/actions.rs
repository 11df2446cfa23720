use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use tokio::select;
use tokio::signal::unix::{self, SignalKind};
use tracing::{level_filters::LevelFilter, Event, Level, Subscriber};
use tracing_subscriber::{
    filter::Targets,
    fmt::format::{DefaultVisitor, Writer},
    layer::{Context, Layer},
    prelude::*,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{
    cli::{arguments, node::Node},
    config::NodeConfig,
};

/// Forks into the background and writes `<base_directory>/colod.pid`. Must run before any
/// Tokio runtime has spawned worker threads.
pub fn daemonize(base_directory: &Path) -> eyre::Result<()> {
    fs::create_dir_all(base_directory)?;

    daemonize::Daemonize::new()
        .pid_file(base_directory.join("colod.pid"))
        .working_directory(base_directory)
        .start()
        .map_err(|err| eyre::eyre!("failed to daemonize: {err}"))
}

pub async fn run(args: arguments::Run) -> eyre::Result<()> {
    let config = NodeConfig::from_args(args)?;

    if !config.daemonize {
        fs::write(config.base_directory.join("colod.pid"), std::process::id().to_string())?;
    }

    init_tracing(&config)?;

    let node = Node::new(config).await?;

    let mut sigterm = unix::signal(SignalKind::terminate())?;
    let mut sigint = unix::signal(SignalKind::interrupt())?;

    select! {
        _ = node.cancelled() => {
            tracing::info!("orchestrator reached quit, shutting down");
        }
        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("received SIGINT");
        }
    }

    node.shutdown().await;

    Ok(())
}

fn init_tracing(config: &NodeConfig) -> eyre::Result<()> {
    let level_filter = config.logger.level;

    let filter = Targets::new()
        .with_target("colod_core", level_filter)
        .with_target("colod_hv", level_filter)
        .with_target("colod_group", level_filter)
        .with_target("colod_link", level_filter)
        .with_target("colod_client", level_filter)
        .with_default(level_filter);

    let env_filter = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env()?;

    if config.syslog {
        let logger = SyslogTracer::new()?;
        tracing_subscriber::registry().with(logger.with_filter(filter)).with(env_filter).try_init()?;
        return Ok(());
    }

    let main_log = fs::OpenOptions::new().create(true).append(true).open(config.base_directory.join("colod.log"))?;
    let main_tracer = FileTracer::new(Box::new(main_log)).with_filter(filter.clone());

    if config.trace {
        let trace_log = fs::OpenOptions::new().create(true).append(true).open(config.base_directory.join("trace.log"))?;
        let trace_tracer = FileTracer::new(Box::new(trace_log)).with_filter(Targets::new().with_default(Level::TRACE));
        tracing_subscriber::registry().with(main_tracer).with(trace_tracer).with(env_filter).try_init()?;
    } else {
        tracing_subscriber::registry().with(main_tracer).with(env_filter).try_init()?;
    }

    Ok(())
}

/// Formats events the same way the orchestrator's upstream lineage does -- a timestamped,
/// single-line `[time] LEVEL target: message` -- but against an arbitrary writer instead of
/// stdout, so the same layer backs both `colod.log` and `trace.log`.
struct FileTracer {
    writer: Mutex<Box<dyn std::io::Write + Send>>,
}

impl FileTracer {
    fn new(writer: Box<dyn std::io::Write + Send>) -> Self {
        Self { writer: Mutex::new(writer) }
    }
}

impl<S> Layer<S> for FileTracer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let target = match event.metadata().level() {
            &Level::INFO | &Level::WARN | &Level::ERROR => event.metadata().target().split("::").last().unwrap_or_default(),
            _ => event.metadata().target(),
        };

        let mut message = String::new();
        event.record(&mut DefaultVisitor::new(Writer::new(&mut message), true));

        let line = format!(
            "[{}] {} {}: {}\n",
            chrono::offset::Local::now().format("%Y-%m-%d %H:%M:%S"),
            event.metadata().level(),
            target,
            message
        );

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.write_all(line.as_bytes());
            let _ = writer.flush();
        }
    }
}

/// Bridges events into syslog via the `daemon` facility, picking the syslog severity from
/// the tracing level. `syslog::Logger`'s write methods take `&mut self`, hence the mutex.
struct SyslogTracer {
    logger: Mutex<syslog::Logger<syslog::LoggerBackend, syslog::Formatter3164>>,
}

impl SyslogTracer {
    fn new() -> eyre::Result<Self> {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_DAEMON,
            hostname: None,
            process: "colod".into(),
            pid: std::process::id(),
        };

        let logger = syslog::unix(formatter).map_err(|err| eyre::eyre!("failed to open syslog: {err}"))?;
        Ok(Self { logger: Mutex::new(logger) })
    }
}

impl<S> Layer<S> for SyslogTracer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut DefaultVisitor::new(Writer::new(&mut message), true));

        let Ok(mut logger) = self.logger.lock() else { return };

        let result = match *event.metadata().level() {
            Level::ERROR => logger.err(message),
            Level::WARN => logger.warning(message),
            Level::INFO => logger.info(message),
            Level::DEBUG | Level::TRACE => logger.debug(message),
        };

        if let Err(err) = result {
            eprintln!("failed to write to syslog: {err}");
        }
    }
}
