// src/oracle.rs
use crate::models::{Provenance, ResolvedPrice};
use crate::pool::PoolLocator;
use crate::retry::RetryPolicy;
use crate::rpc::{ChainError, ChainReader};
use alloy::primitives::{address, Address};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// wENA on Base
const WENA: Address = address!("5263fc91c134c7d19fdbf8804a1218e1bc9729e1");

/// Everything price resolution needs to know about the chain
#[derive(Debug, Clone)]
pub struct PricingSettings {
    /// Skip on-chain work and answer from the static table
    pub simulate: bool,
    pub quote_token: Address,
    /// Token the base currency is priced as
    pub native_token: Address,
    pub factory: Address,
    pub fee_tiers: Vec<u32>,
    pub twap_window_secs: u32,
    pub retry: RetryPolicy,
    pub simulated_prices: HashMap<Address, Decimal>,
}

impl PricingSettings {
    /// Static prices used when nothing can be observed
    pub fn default_simulated_prices(native_token: Address, quote_token: Address) -> HashMap<Address, Decimal> {
        HashMap::from([
            (native_token, Decimal::from(3000)),
            (quote_token, Decimal::ONE),
            (WENA, Decimal::new(25, 2)),
        ])
    }
}

/// Why an observed price could not be produced
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("no pool found for {0}")]
    NoPool(Address),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("malformed observation: {0}")]
    Malformed(String),
}

/// Average tick over the window, rounded towards negative infinity
pub fn tick_average(past: i64, now: i64, window_secs: u32) -> Result<i32, PriceError> {
    if window_secs == 0 {
        return Err(PriceError::Malformed("zero TWAP window".into()));
    }
    let delta = now
        .checked_sub(past)
        .ok_or_else(|| PriceError::Malformed("tick cumulative overflow".into()))?;
    let avg = delta.div_euclid(i64::from(window_secs));
    i32::try_from(avg).map_err(|_| PriceError::Malformed(format!("tick {} out of range", avg)))
}

/// price = 1.0001 ^ tick
pub fn tick_to_price(tick: i32) -> f64 {
    1.0001f64.powi(tick)
}

/// Historical USD prices from pool TWAPs, with a static fallback table
#[derive(Clone)]
pub struct TwapPriceResolver {
    chain: Arc<dyn ChainReader>,
    locator: PoolLocator,
    settings: PricingSettings,
}

impl TwapPriceResolver {
    pub fn new(chain: Arc<dyn ChainReader>, settings: PricingSettings) -> Self {
        let locator = PoolLocator::new(chain.clone(), settings.factory, settings.fee_tiers.clone());
        Self {
            chain,
            locator,
            settings,
        }
    }

    pub fn settings(&self) -> &PricingSettings {
        &self.settings
    }

    pub async fn resolve(&self, token: Address, block_number: u64) -> ResolvedPrice {
        self.resolve_with_window(token, block_number, self.settings.twap_window_secs)
            .await
    }

    /// Never fails: anything that goes wrong on-chain degrades to the simulated price.
    pub async fn resolve_with_window(
        &self,
        token: Address,
        block_number: u64,
        window_secs: u32,
    ) -> ResolvedPrice {
        if self.settings.simulate {
            return self.simulated(token, block_number);
        }

        match self.observed_price(token, block_number, window_secs).await {
            Ok(usd) => {
                info!("[PRICE] Observed price for {} at block {}: ${}", token, block_number, usd);
                ResolvedPrice {
                    token,
                    block_number,
                    usd,
                    provenance: Provenance::Observed,
                }
            }
            Err(e) => {
                let fallback = self.simulated(token, block_number);
                warn!(
                    "[PRICE] Simulated price for {} at block {}: ${} ({})",
                    token, block_number, fallback.usd, e
                );
                fallback
            }
        }
    }

    /// Static table lookup, 1.0 for unknown tokens
    pub fn simulated(&self, token: Address, block_number: u64) -> ResolvedPrice {
        let usd = self
            .settings
            .simulated_prices
            .get(&token)
            .copied()
            .unwrap_or(Decimal::ONE);
        ResolvedPrice {
            token,
            block_number,
            usd,
            provenance: Provenance::Simulated,
        }
    }

    async fn observed_price(
        &self,
        token: Address,
        block_number: u64,
        window_secs: u32,
    ) -> Result<Decimal, PriceError> {
        let pool = self.locator.locate(token, self.settings.quote_token).await;
        if pool.is_zero() {
            return Err(PriceError::NoPool(token));
        }

        let observation = self
            .settings
            .retry
            .run(|| self.chain.observe(pool, vec![window_secs, 0], block_number))
            .await?;

        debug!(
            "observe on {} at block {}: ticks {:?}, seconds/liquidity {:?}",
            pool, block_number, observation.tick_cumulatives, observation.seconds_per_liquidity
        );

        let [past, now] = observation.tick_cumulatives[..] else {
            return Err(PriceError::Malformed(format!(
                "expected 2 tick cumulatives, got {}",
                observation.tick_cumulatives.len()
            )));
        };

        let tick = tick_average(past, now, window_secs)?;
        let price = tick_to_price(tick);
        Decimal::from_f64(price)
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| PriceError::Malformed(format!("tick {} gives unusable price {}", tick, price)))
    }
}
