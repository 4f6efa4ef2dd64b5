// src/pool.rs
use crate::rpc::ChainReader;
use alloy::primitives::Address;
use std::sync::Arc;
use tracing::{debug, warn};

/// Finds the liquidity pool pairing a token with the quote currency
#[derive(Clone)]
pub struct PoolLocator {
    chain: Arc<dyn ChainReader>,
    factory: Address,
    fee_tiers: Vec<u32>,
}

impl PoolLocator {
    pub fn new(chain: Arc<dyn ChainReader>, factory: Address, fee_tiers: Vec<u32>) -> Self {
        let fee_tiers = if fee_tiers.is_empty() { vec![500] } else { fee_tiers };
        Self {
            chain,
            factory,
            fee_tiers,
        }
    }

    /// First non-zero pool across the fee tiers, or `Address::ZERO` when none exists.
    /// A failing tier is logged and the next one is tried.
    pub async fn locate(&self, token: Address, quote: Address) -> Address {
        let (token_a, token_b) = ordered_pair(token, quote);

        for &fee in &self.fee_tiers {
            match self.chain.get_pool(self.factory, token_a, token_b, fee).await {
                Ok(pool) if !pool.is_zero() => {
                    debug!("Pool for {} at fee {}: {}", token, fee, pool);
                    return pool;
                }
                Ok(_) => debug!("No pool for {} at fee {}", token, fee),
                Err(e) => warn!("[POOL] getPool failed for {} at fee {}: {}", token, fee, e),
            }
        }

        warn!("[POOL] No pool found for {} against {}", token, quote);
        Address::ZERO
    }
}

/// Orders a pair by address bytes so lookups are commutative
pub fn ordered_pair(a: Address, b: Address) -> (Address, Address) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::ChainError;
    use crate::testutil::{addr, MockChain};

    #[test]
    fn pair_order_is_commutative() {
        let low = addr(0x11);
        let high = addr(0xee);
        assert_eq!(ordered_pair(low, high), (low, high));
        assert_eq!(ordered_pair(high, low), (low, high));
    }

    #[tokio::test]
    async fn returns_first_tier_with_a_pool() {
        let token = addr(0xaa);
        let quote = addr(0x01);
        let chain = MockChain::default()
            .with_pool(quote, token, 3000, addr(0x33))
            .with_pool(quote, token, 10000, addr(0x44));
        let locator = PoolLocator::new(Arc::new(chain), addr(0xf0), vec![500, 3000, 10000]);

        assert_eq!(locator.locate(token, quote).await, addr(0x33));
    }

    #[tokio::test]
    async fn failing_tier_falls_through_to_next() {
        let token = addr(0xaa);
        let quote = addr(0x01);
        let chain = MockChain::default()
            .with_pool_error(500, ChainError::Network("timeout".into()))
            .with_pool(quote, token, 3000, addr(0x33));
        let chain = Arc::new(chain);
        let locator = PoolLocator::new(chain.clone(), addr(0xf0), vec![500, 3000]);

        assert_eq!(locator.locate(token, quote).await, addr(0x33));
        assert_eq!(chain.get_pool_calls(), 2);
    }

    #[tokio::test]
    async fn exhausted_tiers_yield_zero_address() {
        let locator = PoolLocator::new(Arc::new(MockChain::default()), addr(0xf0), vec![500]);
        assert!(locator.locate(addr(0xaa), addr(0x01)).await.is_zero());
    }
}
