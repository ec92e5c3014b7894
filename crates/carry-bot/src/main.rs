//! Carry funding-rate arbitrage executor - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Delta-neutral funding-rate arbitrage executor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via CARRY_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    carry_telemetry::init_logging()?;

    info!("Starting carry-bot v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = carry_bot::AppConfig::load(args.config.as_deref())?;
    info!(?config.mode, symbol = %config.executor.symbol, "Configuration loaded");

    // Assemble and run
    let app = carry_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
