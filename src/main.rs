mod aggregator;
mod api;
mod cache;
mod config;
mod explorer;
mod labels;
mod models;
mod oracle;
mod parser;
mod pool;
mod retry;
mod rpc;
mod wallet;

#[cfg(test)]
mod testutil;

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::aggregator::VolumeAggregator;
use crate::api::AppState;
use crate::explorer::{ExplorerClient, TransferSource};
use crate::oracle::TwapPriceResolver;
use crate::rpc::{AlloyChain, ChainReader};
use crate::wallet::WalletClassifier;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Wallet volume service starting...");

    // Missing credentials or a bad wallet stop us here
    let cfg = config::load()?;
    info!("  RPC URL: {}", cfg.rpc_http_url);
    info!("  Explorer: {}", cfg.explorer_api_url);
    info!("  Master wallet: {}", cfg.master_wallet);
    info!("  Simulated pricing: {}", cfg.pricing.simulate);
    info!("  Fee tiers: {:?}", cfg.pricing.fee_tiers);

    let chain: Arc<dyn ChainReader> = Arc::new(AlloyChain::connect(&cfg.rpc_http_url, cfg.rpc_timeout)?);
    let source: Arc<dyn TransferSource> = Arc::new(ExplorerClient::new(
        &cfg.explorer_api_url,
        &cfg.explorer_api_key,
        cfg.rpc_timeout * 3,
    )?);

    let resolver = TwapPriceResolver::new(Arc::clone(&chain), cfg.pricing.clone());
    let state = Arc::new(AppState {
        source: Arc::clone(&source),
        aggregator: VolumeAggregator::new(resolver, cfg.master_wallet, cfg.concurrency),
        classifier: WalletClassifier::new(source, chain, cfg.pricing.retry, cfg.concurrency),
    });

    let api_handle = tokio::spawn({
        let cfg = cfg.clone();
        async move { api::serve(state, cfg.port, &cfg.cors_origins).await }
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

    info!("Wallet volume service stopped.");
    Ok(())
}
