// src/parser.rs
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{ExplorerError, Result};
use crate::models::{TokenInfo, Transfer};
use crate::units::{self, NATIVE_DECIMALS};

/// `txlist` record as the explorer sends it (all numbers are decimal strings)
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawNativeTx {
    pub hash: String,
    pub from: String,
    #[serde(default)]
    pub to: String, // empty for contract creation
    pub value: String,
    pub input: String,
    pub gas_price: String,
    pub gas_used: String,
    pub time_stamp: String,
}

/// `tokentx` record
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawTokenTx {
    pub hash: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub token_symbol: String,
    pub token_name: String,
    pub token_decimal: String,
    pub contract_address: String,
    pub value: String,
    pub gas_price: String,
    pub gas_used: String,
    pub time_stamp: String,
}

fn timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let secs: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ExplorerError::malformed(format!("timeStamp {raw:?}")))?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ExplorerError::malformed(format!("timeStamp out of range: {secs}")))
}

fn is_zero(raw: &str) -> bool {
    raw.trim().trim_start_matches('0').is_empty()
}

fn is_empty_call_data(input: &str) -> bool {
    matches!(input.trim(), "" | "0x")
}

/// Plain ETH transfers only: empty call data and non-zero value.
pub fn decode_native(raw: &RawNativeTx) -> Result<Option<Transfer>> {
    if !is_empty_call_data(&raw.input) || is_zero(&raw.value) {
        return Ok(None);
    }

    let timestamp = timestamp(&raw.time_stamp)?;
    Ok(Some(Transfer {
        hash: raw.hash.clone(),
        from: raw.from.to_lowercase(),
        to: raw.to.to_lowercase(),
        value: units::to_decimal(&raw.value, NATIVE_DECIMALS)?,
        fee: units::fee(&raw.gas_price, &raw.gas_used)?,
        timestamp,
        date: timestamp.date_naive(),
        token: None,
    }))
}

/// Token transfers with a non-zero value, scaled by the token's own decimals.
pub fn decode_token(raw: &RawTokenTx) -> Result<Option<Transfer>> {
    if is_zero(&raw.value) {
        return Ok(None);
    }

    let decimals: u32 = raw
        .token_decimal
        .trim()
        .parse()
        .map_err(|_| ExplorerError::malformed(format!("tokenDecimal {:?}", raw.token_decimal)))?;

    // more than 28 decimals can scale a small raw amount down to nothing
    let value = units::to_decimal(&raw.value, decimals)?;
    if value.is_zero() {
        warn!(
            "Skipping token transfer {}: {} base units at {} decimals rounds to zero",
            raw.hash, raw.value, decimals
        );
        return Ok(None);
    }

    let timestamp = timestamp(&raw.time_stamp)?;
    Ok(Some(Transfer {
        hash: raw.hash.clone(),
        from: raw.from.to_lowercase(),
        to: raw.to.to_lowercase(),
        value,
        fee: units::fee(&raw.gas_price, &raw.gas_used)?,
        timestamp,
        date: timestamp.date_naive(),
        token: Some(TokenInfo {
            symbol: raw.token_symbol.clone(),
            name: raw.token_name.clone(),
            decimals,
            contract_address: raw.contract_address.to_lowercase(),
        }),
    }))
}

/// Decode a page of raw records, skipping (and logging) the ones that don't parse.
pub fn decode_page<R, F>(records: Vec<Value>, decode: F) -> Vec<Transfer>
where
    R: for<'de> Deserialize<'de>,
    F: Fn(&R) -> Result<Option<Transfer>>,
{
    records
        .into_iter()
        .filter_map(|record| {
            let hash = record
                .get("hash")
                .and_then(Value::as_str)
                .unwrap_or("<no hash>")
                .to_string();

            let raw: R = match serde_json::from_value(record) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Skipping malformed record {}: {}", hash, e);
                    return None;
                }
            };

            match decode(&raw) {
                Ok(transfer) => transfer,
                Err(e) => {
                    warn!("Skipping record {}: {}", hash, e);
                    None
                }
            }
        })
        .collect()
}
