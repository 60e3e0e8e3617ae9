//! Shipcheck CLI
//!
//! Runs the end-to-end scenarios and inspects builds of the cloud build
//! service.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shipcheck")]
#[command(about = "End-to-end checks for the Terraform deployment example", long_about = None)]
struct Cli {
    /// Base URL of the cloud build API
    #[arg(
        long,
        env = "SHIPCHECK_BUILD_API_URL",
        default_value = shipcheck_client::DEFAULT_BASE_URL
    )]
    build_api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "shipcheck=info,shipcheck_harness=info,shipcheck_client=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config {
        build_api_url: cli.build_api_url,
    };

    handle_command(cli.command, &config).await
}
