// src/testutil.rs
//! In-memory collaborators for unit tests.

use crate::explorer::TransferSource;
use crate::models::{RawTransfer, TransferKind};
use crate::pool::ordered_pair;
use crate::rpc::{ChainError, ChainReader, Observation};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

/// Scripted `ChainReader` with call counters
#[derive(Default)]
pub struct MockChain {
    pools: HashMap<(Address, Address, u32), Address>,
    pool_errors: HashMap<u32, ChainError>,
    observations: HashMap<Address, Result<Observation, ChainError>>,
    flaky_observes: Mutex<u32>,
    contracts: HashSet<Address>,
    code_errors: HashSet<Address>,
    get_pool_calls: AtomicUsize,
    observe_calls: AtomicUsize,
    code_calls: AtomicUsize,
}

impl MockChain {
    pub fn with_pool(mut self, a: Address, b: Address, fee: u32, pool: Address) -> Self {
        let (a, b) = ordered_pair(a, b);
        self.pools.insert((a, b, fee), pool);
        self
    }

    pub fn with_pool_error(mut self, fee: u32, err: ChainError) -> Self {
        self.pool_errors.insert(fee, err);
        self
    }

    /// `observe([window, 0])` on `pool` answers `[past, now]`
    pub fn with_ticks(mut self, pool: Address, past: i64, now: i64) -> Self {
        self.observations.insert(
            pool,
            Ok(Observation {
                tick_cumulatives: vec![past, now],
                seconds_per_liquidity: vec![U256::ZERO, U256::ZERO],
            }),
        );
        self
    }

    pub fn with_observation(mut self, pool: Address, obs: Observation) -> Self {
        self.observations.insert(pool, Ok(obs));
        self
    }

    pub fn with_observe_error(mut self, pool: Address, err: ChainError) -> Self {
        self.observations.insert(pool, Err(err));
        self
    }

    /// The next `n` observe calls fail with a network error
    pub fn with_flaky_observes(self, n: u32) -> Self {
        *self.flaky_observes.lock().unwrap() = n;
        self
    }

    pub fn with_contract(mut self, address: Address) -> Self {
        self.contracts.insert(address);
        self
    }

    pub fn with_code_error(mut self, address: Address) -> Self {
        self.code_errors.insert(address);
        self
    }

    pub fn get_pool_calls(&self) -> usize {
        self.get_pool_calls.load(Ordering::SeqCst)
    }

    pub fn observe_calls(&self) -> usize {
        self.observe_calls.load(Ordering::SeqCst)
    }

    pub fn code_calls(&self) -> usize {
        self.code_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn get_pool(
        &self,
        _factory: Address,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Address, ChainError> {
        self.get_pool_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.pool_errors.get(&fee) {
            return Err(err.clone());
        }
        Ok(self
            .pools
            .get(&(token_a, token_b, fee))
            .copied()
            .unwrap_or(Address::ZERO))
    }

    async fn observe(
        &self,
        pool: Address,
        _seconds_agos: Vec<u32>,
        _block_number: u64,
    ) -> Result<Observation, ChainError> {
        self.observe_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut flaky = self.flaky_observes.lock().unwrap();
            if *flaky > 0 {
                *flaky -= 1;
                return Err(ChainError::Network("connection reset".into()));
            }
        }
        self.observations
            .get(&pool)
            .cloned()
            .unwrap_or_else(|| Err(ChainError::Revert("no observations".into())))
    }

    async fn is_contract(&self, address: Address) -> Result<bool, ChainError> {
        self.code_calls.fetch_add(1, Ordering::SeqCst);
        if self.code_errors.contains(&address) {
            return Err(ChainError::Network("eth_getCode failed".into()));
        }
        Ok(self.contracts.contains(&address))
    }
}

/// Explorer stand-in that serves fixed rows per listing
#[derive(Default)]
pub struct StaticSource {
    pub token_rows: Vec<RawTransfer>,
    pub native_rows: Vec<RawTransfer>,
}

#[async_trait]
impl TransferSource for StaticSource {
    async fn fetch_transfers(&self, kind: TransferKind, _wallet: &str) -> Vec<RawTransfer> {
        match kind {
            TransferKind::Token => self.token_rows.clone(),
            TransferKind::Native => self.native_rows.clone(),
        }
    }
}

/// ERC20 row as the explorer would return it
pub fn token_row(
    to: Address,
    token: Address,
    value: &str,
    decimals: u8,
    block: u64,
    timestamp: i64,
) -> RawTransfer {
    RawTransfer {
        kind: TransferKind::Token,
        hash: format!("0x{:064x}", block),
        from: addr(0x99).to_string(),
        to: to.to_string(),
        value: value.to_string(),
        contract_address: Some(token.to_string()),
        token_decimal: Some(decimals.to_string()),
        block_number: block.to_string(),
        time_stamp: timestamp.to_string(),
        is_error: None,
    }
}

/// Native-currency row as the explorer would return it
pub fn native_row(from: Address, to: Address, wei: &str, block: u64, timestamp: i64) -> RawTransfer {
    RawTransfer {
        kind: TransferKind::Native,
        hash: format!("0x{:064x}", block),
        from: from.to_string(),
        to: to.to_string(),
        value: wei.to_string(),
        contract_address: Some(String::new()),
        token_decimal: None,
        block_number: block.to_string(),
        time_stamp: timestamp.to_string(),
        is_error: Some("0".to_string()),
    }
}
