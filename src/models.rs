// src/models.rs
use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which explorer listing a row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferKind {
    /// ERC20 transfer events (`tokentx`)
    Token,
    /// Plain value transfers of the chain's base currency (`txlist`)
    #[default]
    Native,
}

impl TransferKind {
    /// Explorer `action` parameter for this listing
    pub fn action(self) -> &'static str {
        match self {
            TransferKind::Token => "tokentx",
            TransferKind::Native => "txlist",
        }
    }
}

/// One explorer row, exactly as the API returns it (every field is a string)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransfer {
    #[serde(skip)]
    pub kind: TransferKind,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub token_decimal: Option<String>,
    #[serde(default)]
    pub block_number: String,
    #[serde(default)]
    pub time_stamp: String,
    #[serde(default)]
    pub is_error: Option<String>,
}

/// Token a transfer moved: the base currency or an ERC20 contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenId {
    Native,
    Contract(Address),
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenId::Native => write!(f, "native"),
            TokenId::Contract(addr) => write!(f, "{addr}"),
        }
    }
}

/// A parsed on-chain transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    pub token: TokenId,
    pub raw_amount: U256,
    pub decimals: u8,
    pub block_number: u64,
    pub timestamp: i64,
    pub tx_hash: String,
}

/// Whether a price came from a pool or from the static table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Observed,
    Simulated,
}

/// USD price of a token as of a block
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPrice {
    pub token: Address,
    pub block_number: u64,
    pub usd: Decimal,
    pub provenance: Provenance,
}

/// Total USD volume for one day / week / month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketTotal {
    pub key: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub usd: Decimal,
}

/// How many rows made it into the report and how they were priced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationStats {
    pub considered: usize,
    pub contributed: usize,
    pub skipped: usize,
    pub observed_prices: usize,
    pub simulated_prices: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumeReport {
    pub daily: Vec<BucketTotal>,
    pub weekly: Vec<BucketTotal>,
    pub monthly: Vec<BucketTotal>,
    pub stats: AggregationStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterpartyType {
    Contract,
    Wallet,
}

/// One counterparty of an analysed wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterpartySummary {
    pub address: String,
    pub tx_count: u64,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: CounterpartyType,
    /// Unix seconds of the latest row, `null` if no row had a usable timestamp
    pub last_interaction: Option<i64>,
    pub last_tx_hash: String,
}
