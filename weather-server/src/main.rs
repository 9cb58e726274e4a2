//! Binary for the `weather-server` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup
//! - Serving the HTTP API or printing single lookups

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weather_server::cli::Cli;

const DEFAULT_LOG_FILTER: &str = "weather_server=debug,weather_core=debug,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cmd = Cli::parse();
    cmd.run().await
}
