// src/aggregator.rs
use crate::cache::{PriceCache, PriceCacheKey};
use crate::explorer::TransferSource;
use crate::models::{
    AggregationStats, BucketTotal, Provenance, RawTransfer, TokenId, TransferKind, TransferRecord,
    VolumeReport,
};
use crate::oracle::TwapPriceResolver;
use crate::parser::{self, RecordError};
use alloy::primitives::Address;
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::stream::{self, StreamExt};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid date {0:?}, expected YYYY-MM-DD or RFC 3339")]
    BadDate(String),
    #[error("from date {from} is after to date {to}")]
    Inverted { from: DateTime<Utc>, to: DateTime<Utc> },
}

/// Inclusive time window; a missing side is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn parse_bound(s: &str) -> Result<DateTime<Utc>, RangeError> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RangeError::BadDate(s.to_string()))
}

impl DateRange {
    /// Dates are taken as midnight UTC
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, RangeError> {
        let from = from.filter(|s| !s.trim().is_empty()).map(parse_bound).transpose()?;
        let to = to.filter(|s| !s.trim().is_empty()).map(parse_bound).transpose()?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(RangeError::Inverted { from, to });
            }
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }
}

/// Bucket keys for one instant: (`YYYY-MM-DD`, `YYYY-Www`, `YYYY-MM`).
/// Weeks start on Sunday; days before the year's first Sunday are week 00.
pub fn bucket_keys(ts: DateTime<Utc>) -> (String, String, String) {
    (
        ts.format("%Y-%m-%d").to_string(),
        ts.format("%Y-W%U").to_string(),
        ts.format("%Y-%m").to_string(),
    )
}

/// Day, week and month totals filled from the same contributions
#[derive(Debug, Default)]
struct Buckets {
    daily: BTreeMap<String, Decimal>,
    weekly: BTreeMap<String, Decimal>,
    monthly: BTreeMap<String, Decimal>,
}

impl Buckets {
    /// Adds `usd` to all three views, or to none of them if any total would overflow
    fn add(&mut self, ts: DateTime<Utc>, usd: Decimal) -> Option<()> {
        let (day, week, month) = bucket_keys(ts);
        let sum = |map: &BTreeMap<String, Decimal>, key: &String| {
            map.get(key).copied().unwrap_or_default().checked_add(usd)
        };
        let daily = sum(&self.daily, &day)?;
        let weekly = sum(&self.weekly, &week)?;
        let monthly = sum(&self.monthly, &month)?;

        self.daily.insert(day, daily);
        self.weekly.insert(week, weekly);
        self.monthly.insert(month, monthly);
        Some(())
    }

    fn rounded(map: BTreeMap<String, Decimal>) -> Vec<BucketTotal> {
        map.into_iter()
            .map(|(key, usd)| BucketTotal {
                key,
                usd: usd.round_dp(2),
            })
            .collect()
    }
}

/// One incoming transfer ready to be priced
struct Pending {
    record: TransferRecord,
    amount: Decimal,
    price_token: Address,
    at: DateTime<Utc>,
}

/// Turns a wallet's incoming transfers into USD volume per day, week and month
pub struct VolumeAggregator {
    resolver: TwapPriceResolver,
    target_wallet: Address,
    concurrency: usize,
}

impl VolumeAggregator {
    pub fn new(resolver: TwapPriceResolver, target_wallet: Address, concurrency: usize) -> Self {
        Self {
            resolver,
            target_wallet,
            concurrency: concurrency.max(1),
        }
    }

    pub fn target_wallet(&self) -> Address {
        self.target_wallet
    }

    /// Fetch token and native transfers of the target wallet, then aggregate them
    pub async fn aggregate_wallet(&self, source: &dyn TransferSource, range: DateRange) -> VolumeReport {
        let wallet = self.target_wallet.to_string();
        let mut rows = source.fetch_transfers(TransferKind::Token, &wallet).await;
        let native = source.fetch_transfers(TransferKind::Native, &wallet).await;
        info!("Fetched {} token and {} native rows", rows.len(), native.len());
        rows.extend(native);

        self.aggregate(&rows, range).await
    }

    /// Price every row sent to the target wallet and bucket the USD values.
    /// Malformed rows are skipped and counted; pricing never fails.
    pub async fn aggregate(&self, rows: &[RawTransfer], range: DateRange) -> VolumeReport {
        let mut stats = AggregationStats::default();
        let mut pending = Vec::new();

        for raw in rows {
            if !self.is_incoming(raw) {
                continue;
            }
            if parser::is_failed(raw) {
                debug!("Skipping failed tx {}", raw.hash);
                continue;
            }
            stats.considered += 1;

            match self.prepare(raw) {
                // out-of-range rows are never priced
                Ok(p) if !range.contains(p.at) => {}
                Ok(p) => pending.push(p),
                Err(e) => {
                    stats.skipped += 1;
                    warn!("[{}] Skipped tx {}: {}", raw.kind.action(), raw.hash, e);
                }
            }
        }

        let cache = PriceCache::new();
        let priced: Vec<_> = stream::iter(pending)
            .map(|p| {
                let cache = &cache;
                async move {
                    let key = PriceCacheKey {
                        token: p.price_token,
                        block_number: p.record.block_number,
                    };
                    let price = cache
                        .get_or_resolve(key, || self.resolver.resolve(key.token, key.block_number))
                        .await;
                    (p, price)
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut buckets = Buckets::default();
        for (p, price) in priced {
            match price.provenance {
                Provenance::Observed => stats.observed_prices += 1,
                Provenance::Simulated => stats.simulated_prices += 1,
            }

            let Some(usd) = p.amount.checked_mul(price.usd) else {
                stats.skipped += 1;
                warn!(
                    "Skipped tx {}: {}",
                    p.record.tx_hash,
                    RecordError::AmountOverflow(p.record.raw_amount)
                );
                continue;
            };

            debug!(
                "Block {}: {} of {} from {} → ${} on {}",
                p.record.block_number,
                p.amount,
                p.record.token,
                p.record.from,
                usd.round_dp(2),
                p.at.date_naive()
            );

            if buckets.add(p.at, usd).is_none() {
                stats.skipped += 1;
                warn!(
                    "Skipped tx {}: ${} overflows the totals for {}",
                    p.record.tx_hash,
                    usd,
                    p.at.date_naive()
                );
                continue;
            }
            stats.contributed += 1;
        }

        info!(
            "Aggregated {} of {} incoming transfers ({} skipped, {} cached prices)",
            stats.contributed,
            stats.considered,
            stats.skipped,
            cache.len()
        );

        VolumeReport {
            daily: Buckets::rounded(buckets.daily),
            weekly: Buckets::rounded(buckets.weekly),
            monthly: Buckets::rounded(buckets.monthly),
            stats,
        }
    }

    fn is_incoming(&self, raw: &RawTransfer) -> bool {
        raw.to
            .trim()
            .parse::<Address>()
            .map_or(false, |to| to == self.target_wallet)
    }

    fn prepare(&self, raw: &RawTransfer) -> Result<Pending, RecordError> {
        let record = parser::parse_transfer(raw)?;
        let amount = record.amount()?;

        let at = DateTime::from_timestamp(record.timestamp, 0).ok_or_else(|| RecordError::BadInteger {
            field: "timeStamp",
            value: raw.time_stamp.clone(),
        })?;
        let price_token = match record.token {
            TokenId::Native => self.resolver.settings().native_token,
            TokenId::Contract(token) => token,
        };

        Ok(Pending {
            record,
            amount,
            price_token,
            at,
        })
    }
}
