use anyhow::Result;
use clap::Parser;

use trawl::commands::{self, Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides; without it the long-running agg command logs at
    // info while the one-shot commands stay quiet
    let default_level = match cli.command {
        Command::Agg { .. } => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    commands::run(cli).await
}
