//! Stitch command-line client
//!
//! Thin binary over `stitch-client`:
//! 1. Loads the client configuration (TOML + environment overrides)
//! 2. Restores any stored session
//! 3. Runs one command (login, call, whoami, logout)
//! 4. Prints the result as JSON on stdout; logs go to stderr

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use stitch_client::{ClientConfig, StitchClient};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr with LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = cli::Cli::parse();

    let config_path = ClientConfig::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = ClientConfig::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let client = StitchClient::from_config(&config).context("failed to create client")?;
    let output = commands::run(&client, cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
