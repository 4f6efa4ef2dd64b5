// src/parser.rs
use crate::models::{RawTransfer, TokenId, TransferKind, TransferRecord};
use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use thiserror::Error;

/// Decimal exponent of the chain's base currency
pub const NATIVE_DECIMALS: u8 = 18;

/// Largest scale a `Decimal` can carry
const MAX_SCALE: u8 = 28;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("invalid {field}: {value:?}")]
    BadInteger { field: &'static str, value: String },
    #[error("invalid {field} address: {value:?}")]
    BadAddress { field: &'static str, value: String },
    #[error("amount {0} does not fit a decimal")]
    AmountOverflow(U256),
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, RecordError> {
    value.trim().parse::<Address>().map_err(|_| RecordError::BadAddress {
        field,
        value: value.to_string(),
    })
}

fn parse_int<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, RecordError> {
    value.trim().parse::<T>().map_err(|_| RecordError::BadInteger {
        field,
        value: value.to_string(),
    })
}

/// True when the row reports a reverted transaction
pub fn is_failed(raw: &RawTransfer) -> bool {
    raw.is_error.as_deref().map(str::trim) == Some("1")
}

/// Turn one explorer row into a typed transfer
pub fn parse_transfer(raw: &RawTransfer) -> Result<TransferRecord, RecordError> {
    let (token, decimals) = match raw.kind {
        TransferKind::Native => (TokenId::Native, NATIVE_DECIMALS),
        TransferKind::Token => {
            let contract = raw.contract_address.as_deref().unwrap_or_default();
            let token = parse_address("contractAddress", contract)?;
            let decimals = parse_int("tokenDecimal", raw.token_decimal.as_deref().unwrap_or_default())?;
            (TokenId::Contract(token), decimals)
        }
    };

    let bad_value = || RecordError::BadInteger {
        field: "value",
        value: raw.value.clone(),
    };
    let value = raw.value.trim();
    if value.is_empty() {
        return Err(bad_value());
    }
    let raw_amount = U256::from_str_radix(value, 10).map_err(|_| bad_value())?;

    Ok(TransferRecord {
        from: parse_address("from", &raw.from)?,
        to: parse_address("to", &raw.to)?,
        token,
        raw_amount,
        decimals,
        block_number: parse_int("blockNumber", &raw.block_number)?,
        timestamp: parse_int("timeStamp", &raw.time_stamp)?,
        tx_hash: raw.hash.clone(),
    })
}

/// `raw / 10^decimals` without a round trip through floating point.
/// Digits beyond 28 decimal places are truncated.
pub fn scale_amount(raw: U256, decimals: u8) -> Result<Decimal, RecordError> {
    let ten = U256::from(10u8);
    let unit = ten
        .checked_pow(U256::from(decimals))
        .ok_or(RecordError::AmountOverflow(raw))?;
    let whole = raw / unit;
    let mut frac = raw % unit;

    let mut scale = decimals;
    if scale > MAX_SCALE {
        frac /= ten.pow(U256::from(scale - MAX_SCALE));
        scale = MAX_SCALE;
    }

    let overflow = || RecordError::AmountOverflow(raw);
    let whole = i128::try_from(whole).map_err(|_| overflow())?;
    let frac = i128::try_from(frac).map_err(|_| overflow())?;

    let whole = Decimal::try_from_i128_with_scale(whole, 0).map_err(|_| overflow())?;
    let frac = Decimal::try_from_i128_with_scale(frac, u32::from(scale)).map_err(|_| overflow())?;

    whole.checked_add(frac).ok_or_else(overflow)
}

impl TransferRecord {
    /// Amount in whole token units
    pub fn amount(&self) -> Result<Decimal, RecordError> {
        scale_amount(self.raw_amount, self.decimals)
    }
}
