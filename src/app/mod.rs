//! Ambient application layer: configuration, the engine's own tracing
//! setup and the `stride-diag` command line.

pub mod cli;
pub mod config;
pub mod tracing;

pub use cli::Cli;
pub use config::{BatchSettings, ConfigError, LoggerConfig};

use clap::Parser;

/// Entry point of the `stride-diag` binary.
pub async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    self::tracing::init_tracing(cli.tracing_level());
    cli::run(cli).await
}
