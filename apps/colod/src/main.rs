use eyre::Result;

mod cli;
pub(crate) mod config;

fn main() -> Result<()> {
    cli::run()
}
