use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wallet_explorer::{
    api,
    classifier::GeminiClassifier,
    config,
    explorer::ExplorerClient,
    fetcher::Paging,
    price::CoinMarketCapClient,
    report::WalletAnalyzer,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Wallet Explorer starting...");

    let cfg = config::load()?;
    info!("  Explorer: {}", cfg.explorer_url);
    info!("  Page size: {} (cap {} pages)", cfg.page_size, cfg.max_pages);
    info!("  Pacing: {}ms per host", cfg.pace.as_millis());
    info!("  Port: {}", cfg.port);

    let analyzer = Arc::new(WalletAnalyzer::new(
        ExplorerClient::new(&cfg)?,
        CoinMarketCapClient::new(&cfg)?,
        GeminiClassifier::new(&cfg)?,
        Paging {
            page_size: cfg.page_size,
            max_pages: cfg.max_pages,
        },
    ));

    let api_handle = tokio::spawn({
        let cfg = cfg.clone();
        async move { api::serve(&cfg, analyzer).await }
    });

    tokio::select! {
        res = api_handle => match res {
            Ok(Ok(_)) => info!("API exited cleanly"),
            Ok(Err(e)) => error!("API error: {:?}", e),
            Err(e) => error!("API task panicked: {:?}", e),
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping...");
        }
    }

    info!("Wallet Explorer stopped.");
    Ok(())
}
