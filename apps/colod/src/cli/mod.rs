mod actions;
pub(crate) mod arguments;
mod node;

use clap::Parser;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub enum Cli {
    /// Run the COLO orchestrator daemon, see `run --help` for flags.
    Run(arguments::Run),
}

/// Parses arguments and, if `--daemonize` was passed, forks into the background before any
/// Tokio runtime exists -- forking after the runtime has spawned worker threads would only
/// carry the forking thread into the child, so this has to happen first.
pub fn run() -> eyre::Result<()> {
    let Cli::Run(args) = Cli::parse();

    if args.daemonize {
        actions::daemonize(&args.base_directory)?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(actions::run(args))
}
