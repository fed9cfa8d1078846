//! Bond feed client - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Live bond transaction feed client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via BONDFEED_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Print one REST snapshot of market stats and transactions, then exit
    #[arg(long)]
    snapshot_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    bondfeed_telemetry::init_logging()?;

    info!("Starting bondfeed v{}", env!("CARGO_PKG_VERSION"));

    let config = bondfeed_app::AppConfig::load(args.config)?;
    info!(
        feed_url = %config.feed.url,
        api_url = %config.api.base_url,
        max_transactions = config.feed.max_transactions,
        "Configuration loaded"
    );

    let app = bondfeed_app::Application::new(config)?;

    if args.snapshot_only {
        app.print_snapshot().await?;
        return Ok(());
    }

    app.run().await?;

    Ok(())
}
