// src/wallet.rs
use crate::explorer::TransferSource;
use crate::labels;
use crate::models::{CounterpartySummary, CounterpartyType, RawTransfer, TransferKind};
use crate::retry::RetryPolicy;
use crate::rpc::ChainReader;
use alloy::primitives::Address;
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const TOP_COUNTERPARTIES: usize = 10;

#[derive(Debug, Clone)]
struct Tally {
    address: Address,
    count: u64,
    /// Latest parsable timestamp seen, if any
    last_interaction: Option<i64>,
    last_tx_hash: String,
}

/// Ranks the addresses a wallet deals with most
pub struct WalletClassifier {
    source: Arc<dyn TransferSource>,
    chain: Arc<dyn ChainReader>,
    retry: RetryPolicy,
    concurrency: usize,
}

impl WalletClassifier {
    pub fn new(
        source: Arc<dyn TransferSource>,
        chain: Arc<dyn ChainReader>,
        retry: RetryPolicy,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            chain,
            retry,
            concurrency: concurrency.max(1),
        }
    }

    /// Top counterparties of `wallet` by number of transactions
    pub async fn analyze(&self, wallet: Address) -> Vec<CounterpartySummary> {
        let wallet_str = wallet.to_string();
        let native = self.source.fetch_transfers(TransferKind::Native, &wallet_str).await;
        let tokens = self.source.fetch_transfers(TransferKind::Token, &wallet_str).await;
        info!(
            "Analyzing {}: {} transactions ({} native, {} token)",
            wallet,
            native.len() + tokens.len(),
            native.len(),
            tokens.len()
        );

        let tallies = tally_counterparties(wallet, native.iter().chain(tokens.iter()));
        info!("Found {} unique counterparties", tallies.len());

        let mut results: Vec<CounterpartySummary> = stream::iter(tallies)
            .map(|t| async move {
                match self.retry.run(|| self.chain.is_contract(t.address)).await {
                    Ok(is_contract) => Some(summarize(t, is_contract)),
                    Err(e) => {
                        warn!("Error classifying {}: {}", t.address, e);
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .filter_map(|s| async move { s })
            .collect()
            .await;

        // stable: ties keep first-seen order
        results.sort_by(|a, b| b.tx_count.cmp(&a.tx_count));
        results.truncate(TOP_COUNTERPARTIES);
        info!("Returning top {} counterparties", results.len());
        results
    }
}

fn parse_party(s: &str) -> Option<Address> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse().ok()
}

/// Count rows per counterparty in first-seen order
fn tally_counterparties<'a>(
    wallet: Address,
    rows: impl Iterator<Item = &'a RawTransfer>,
) -> Vec<Tally> {
    let mut order: Vec<Tally> = Vec::new();
    let mut index: HashMap<Address, usize> = HashMap::new();

    for row in rows {
        let outgoing = parse_party(&row.from) == Some(wallet);
        let other = if outgoing { &row.to } else { &row.from };
        let Some(counterparty) = parse_party(other) else {
            debug!("Skipping transaction without counterparty: {}", row.hash);
            continue;
        };
        let ts = row.time_stamp.trim().parse::<i64>().ok();
        if ts.is_none() {
            debug!("Unparsable timestamp {:?} in {}", row.time_stamp, row.hash);
        }

        let slot = *index.entry(counterparty).or_insert_with(|| {
            order.push(Tally {
                address: counterparty,
                count: 0,
                last_interaction: None,
                last_tx_hash: row.hash.clone(),
            });
            order.len() - 1
        });

        let tally = &mut order[slot];
        tally.count += 1;
        if let Some(ts) = ts {
            if tally.last_interaction.map_or(true, |last| ts >= last) {
                tally.last_interaction = Some(ts);
                tally.last_tx_hash = row.hash.clone();
            }
        }
    }

    order
}

fn summarize(t: Tally, is_contract: bool) -> CounterpartySummary {
    CounterpartySummary {
        address: format!("{:#x}", t.address),
        tx_count: t.count,
        label: labels::label_for(&t.address).to_string(),
        kind: if is_contract {
            CounterpartyType::Contract
        } else {
            CounterpartyType::Wallet
        },
        last_interaction: t.last_interaction,
        last_tx_hash: t.last_tx_hash,
    }
}
