use crate::oracle::PricingSettings;
use crate::retry::RetryPolicy;
use alloy::primitives::{address, Address};
use dotenvy::dotenv;
use eyre::Result;
use rust_decimal::Decimal;
use std::{env, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::{info, warn};

/// USDC on Base
const DEFAULT_QUOTE_TOKEN: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
/// WETH on Base
const DEFAULT_NATIVE_TOKEN: Address = address!("4200000000000000000000000000000000000006");
/// Aerodrome concentrated-liquidity pool factory
const DEFAULT_POOL_FACTORY: Address = address!("5e7BB104d84c7CB9B682AaC2F3d509f5F406809A");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_http_url: String,
    pub rpc_timeout: Duration,
    pub explorer_api_url: String,
    pub explorer_api_key: String,
    pub master_wallet: Address,
    pub pricing: PricingSettings,
    pub concurrency: usize,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    var(name).ok_or(ConfigError::Missing(name))
}

/// Parse `name`, falling back to `default` when unset
fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match var(name).map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "false" | "0" | "no") => Ok(false),
        Some(value) => Err(ConfigError::Invalid { name, value }),
    }
}

fn parse_list<T: FromStr>(name: &'static str, raw: &str) -> Result<Vec<T>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::Invalid {
                name,
                value: s.to_string(),
            })
        })
        .collect()
}

/// `addr=price,addr=price`
fn parse_price_table(raw: &str) -> Result<Vec<(Address, Decimal)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let invalid = || ConfigError::Invalid {
                name: "SIMULATED_PRICES",
                value: pair.to_string(),
            };
            let (addr, price) = pair.split_once('=').ok_or_else(invalid)?;
            let addr = addr.trim().parse::<Address>().map_err(|_| invalid())?;
            let price = Decimal::from_str(price.trim()).map_err(|_| invalid())?;
            Ok((addr, price))
        })
        .collect()
}

pub fn load() -> Result<Config> {
    dotenv().ok();

    let rpc_http_url = var("RPC_HTTP_URL")
        .or_else(|| var("BASE_RPC"))
        .unwrap_or_else(|| "https://mainnet.base.org".to_string());

    let explorer_api_url =
        var("EXPLORER_API_URL").unwrap_or_else(|| "https://api.basescan.org/api".to_string());
    let explorer_api_key = required("BASESCAN_API_KEY")?;

    let wallet = required("MASTER_WALLET")?;
    let master_wallet = wallet.parse::<Address>().map_err(|_| ConfigError::Invalid {
        name: "MASTER_WALLET",
        value: wallet.clone(),
    })?;

    let quote_token = parsed("QUOTE_TOKEN", DEFAULT_QUOTE_TOKEN)?;
    let native_token = parsed("NATIVE_TOKEN", DEFAULT_NATIVE_TOKEN)?;

    let mut simulated_prices = PricingSettings::default_simulated_prices(native_token, quote_token);
    if let Some(raw) = var("SIMULATED_PRICES") {
        simulated_prices.extend(parse_price_table(&raw)?);
    }

    let fee_tiers = match var("FEE_TIERS") {
        Some(raw) => parse_list("FEE_TIERS", &raw)?,
        None => vec![500],
    };
    if fee_tiers.is_empty() {
        warn!("FEE_TIERS is empty, using 500");
    }

    let pricing = PricingSettings {
        simulate: parse_flag("SIMULATE_PRICES", true)?,
        quote_token,
        native_token,
        factory: parsed("POOL_FACTORY", DEFAULT_POOL_FACTORY)?,
        fee_tiers,
        twap_window_secs: parsed("TWAP_WINDOW_SECS", 3600)?,
        retry: RetryPolicy::new(
            parsed("RETRY_MAX", 3)?,
            Duration::from_millis(parsed("RETRY_DELAY_MS", 1000)?),
        ),
        simulated_prices,
    };

    let cfg = Config {
        rpc_http_url,
        rpc_timeout: Duration::from_secs(parsed("RPC_TIMEOUT_SECS", 10)?),
        explorer_api_url,
        explorer_api_key,
        master_wallet,
        pricing,
        concurrency: parsed("PRICE_CONCURRENCY", 4)?,
        port: parsed("PORT", 8080)?,
        cors_origins: var("CORS_ORIGINS")
            .map(|raw| parse_list("CORS_ORIGINS", &raw))
            .transpose()?
            .unwrap_or_default(),
    };

    info!(
        "Loaded config: rpc={}, explorer={}, wallet={}, simulate={}, port={}",
        cfg.rpc_http_url, cfg.explorer_api_url, cfg.master_wallet, cfg.pricing.simulate, cfg.port
    );

    Ok(cfg)
}
