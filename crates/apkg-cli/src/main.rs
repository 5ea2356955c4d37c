//! apkg - declarative package reconciler CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use apkg_cli::Cli;
use apkg_cli::cmd;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cmd::run(cli).await
}
