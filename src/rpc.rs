// src/rpc.rs
use alloy::{
    eips::BlockId,
    primitives::{aliases::U24, Address, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    sol,
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use eyre::Result;
use std::{future::Future, time::Duration};
use thiserror::Error;
use tracing::debug;

sol! {
    #[sol(rpc)]
    interface IPoolFactory {
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool);
    }
}

sol! {
    #[sol(rpc)]
    interface IPoolOracle {
        function observe(uint32[] secondsAgos) external view returns (
            int56[] tickCumulatives,
            uint160[] secondsPerLiquidityCumulativeX128s
        );
    }
}

/// Failure of a single on-chain read
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("network error: {0}")]
    Network(String),
    #[error("call reverted: {0}")]
    Revert(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ChainError {
    /// Network failures and reverts are worth another attempt; nothing else is.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Network(_) | ChainError::Revert(_))
    }
}

/// Result of `observe([past, now])` on a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub tick_cumulatives: Vec<i64>,
    pub seconds_per_liquidity: Vec<U256>,
}

/// Read-only on-chain calls the pricing and classification code depends on
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn get_pool(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Address, ChainError>;

    /// Cumulative observations as of `block_number`
    async fn observe(
        &self,
        pool: Address,
        seconds_agos: Vec<u32>,
        block_number: u64,
    ) -> Result<Observation, ChainError>;

    async fn is_contract(&self, address: Address) -> Result<bool, ChainError>;
}

/// `ChainReader` over an HTTP JSON-RPC endpoint
#[derive(Clone)]
pub struct AlloyChain {
    provider: DynProvider,
    call_timeout: Duration,
}

impl AlloyChain {
    pub fn connect(rpc_url: &str, call_timeout: Duration) -> Result<Self> {
        let url: Url = rpc_url.parse()?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self {
            provider,
            call_timeout,
        })
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, ChainError>
    where
        F: Future<Output = Result<T, ChainError>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(ChainError::Network(format!(
                "{} timed out after {:?}",
                what, self.call_timeout
            ))),
        }
    }
}

fn classify_transport(err: alloy::transports::TransportError) -> ChainError {
    match err.as_error_resp() {
        Some(payload) => ChainError::Revert(payload.message.to_string()),
        None => ChainError::Network(err.to_string()),
    }
}

fn classify_contract(err: alloy::contract::Error) -> ChainError {
    match err {
        alloy::contract::Error::TransportError(e) => classify_transport(e),
        other => ChainError::Malformed(other.to_string()),
    }
}

#[async_trait]
impl ChainReader for AlloyChain {
    async fn get_pool(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
        fee: u32,
    ) -> Result<Address, ChainError> {
        debug!("📡 getPool({}, {}, {}) on {}", token_a, token_b, fee, factory);
        let contract = IPoolFactory::new(factory, self.provider.clone());
        self.bounded("getPool", async {
            contract
                .getPool(token_a, token_b, U24::from(fee))
                .call()
                .await
                .map_err(classify_contract)
        })
        .await
    }

    async fn observe(
        &self,
        pool: Address,
        seconds_agos: Vec<u32>,
        block_number: u64,
    ) -> Result<Observation, ChainError> {
        debug!("📡 observe({:?}) on {} at block {}", seconds_agos, pool, block_number);
        let contract = IPoolOracle::new(pool, self.provider.clone());
        let ret = self
            .bounded("observe", async {
                contract
                    .observe(seconds_agos)
                    .block(BlockId::number(block_number))
                    .call()
                    .await
                    .map_err(classify_contract)
            })
            .await?;

        Ok(Observation {
            tick_cumulatives: ret.tickCumulatives.iter().map(|t| t.as_i64()).collect(),
            seconds_per_liquidity: ret
                .secondsPerLiquidityCumulativeX128s
                .iter()
                .map(|v| U256::from(*v))
                .collect(),
        })
    }

    async fn is_contract(&self, address: Address) -> Result<bool, ChainError> {
        let code = self
            .bounded("getCode", async {
                self.provider
                    .get_code_at(address)
                    .await
                    .map_err(classify_transport)
            })
            .await?;
        Ok(!code.is_empty())
    }
}
