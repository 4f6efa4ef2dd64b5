// src/explorer.rs
use crate::models::{RawTransfer, TransferKind};
use async_trait::async_trait;
use eyre::{eyre, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

/// Source of a wallet's transfer history
#[async_trait]
pub trait TransferSource: Send + Sync {
    /// All rows of `kind` touching `wallet`; empty on any fetch error
    async fn fetch_transfers(&self, kind: TransferKind, wallet: &str) -> Vec<RawTransfer>;
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: serde_json::Value,
}

/// Etherscan-style account API (BaseScan by default)
#[derive(Clone)]
pub struct ExplorerClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ExplorerClient {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn fetch(&self, kind: TransferKind, wallet: &str) -> Result<Vec<RawTransfer>> {
        info!("📡 Fetching {} for {}", kind.action(), wallet);

        let resp: ExplorerResponse = self
            .client
            .get(&self.api_url)
            .query(&[
                ("module", "account"),
                ("action", kind.action()),
                ("address", wallet),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("sort", "asc"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        decode_rows(kind, resp)
    }
}

fn decode_rows(kind: TransferKind, resp: ExplorerResponse) -> Result<Vec<RawTransfer>> {
    if resp.status != "1" {
        // "No transactions found" also comes back as status 0
        return Err(eyre!("explorer status {}: {} ({})", resp.status, resp.message, resp.result));
    }

    let mut rows: Vec<RawTransfer> = serde_json::from_value(resp.result)?;
    for row in &mut rows {
        row.kind = kind;
    }
    Ok(rows)
}

#[async_trait]
impl TransferSource for ExplorerClient {
    async fn fetch_transfers(&self, kind: TransferKind, wallet: &str) -> Vec<RawTransfer> {
        match self.fetch(kind, wallet).await {
            Ok(rows) => {
                info!("Fetched {} {} rows for {}", rows.len(), kind.action(), wallet);
                rows
            }
            Err(e) => {
                warn!("Explorer {} failed for {}: {}", kind.action(), wallet, e);
                Vec::new()
            }
        }
    }
}
