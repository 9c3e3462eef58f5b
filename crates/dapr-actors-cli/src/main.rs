use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use dapr_actors::logging::setup_global_logging;
use dapr_actors_cli::{config::Config, run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config, using defaults: {}", e);
        Config::default()
    });

    // Initialize logging
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        config.log_level()
    };
    setup_global_logging(
        config.logging.file.as_deref(),
        &log_level,
        config.output.colors,
    )?;

    // Setup graceful shutdown handling
    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        signal_token.cancel();
    });

    run(cli, config, shutdown_token).await
}
