// src/explorer.rs
use std::future::Future;
use std::str::FromStr;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::error::{ExplorerError, Result};
use crate::http::{self, RetryPolicy};
use crate::pacing::Pacer;
use crate::units;

/// Read-only view of the block-explorer endpoints the wallet pipeline needs.
///
/// Transfer pages come back as raw JSON records so one malformed record can be
/// skipped without losing the page.
pub trait ExplorerApi: Send + Sync {
    /// `action=txlist`, ascending by time
    fn native_transfers_page(
        &self,
        address: &str,
        page: u32,
        offset: u32,
    ) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// `action=tokentx`, ascending by time
    fn token_transfers_page(
        &self,
        address: &str,
        page: u32,
        offset: u32,
    ) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Native balance in ETH
    fn balance(&self, address: &str) -> impl Future<Output = Result<Decimal>> + Send;

    /// Token balance scaled by `decimals`
    fn token_balance(
        &self,
        address: &str,
        contract: &str,
        decimals: u32,
    ) -> impl Future<Output = Result<Decimal>> + Send;

    /// Current ETH-USD spot rate
    fn eth_usd_price(&self) -> impl Future<Output = Result<Decimal>> + Send;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    result: Option<Value>,
}

impl Envelope {
    /// Unwrap `result`, turning NOTOK payloads into errors. "No transactions found" is an empty page.
    fn into_result(self, action: &str) -> Result<Value> {
        let result = self
            .result
            .ok_or_else(|| ExplorerError::malformed(format!("{action}: missing `result`")))?;

        if self.status == "0" && !self.message.starts_with("No transactions found") {
            return match result {
                Value::String(detail) => Err(ExplorerError::Upstream(format!(
                    "{action}: {} ({detail})",
                    self.message
                ))),
                Value::Array(rows) if rows.is_empty() => Ok(Value::Array(rows)),
                _ => Err(ExplorerError::Upstream(format!("{action}: {}", self.message))),
            };
        }
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
struct EthPrice {
    ethusd: String,
}

/// Decode a list endpoint's `result` into raw records
pub fn records_from(result: Value, action: &str) -> Result<Vec<Value>> {
    match result {
        Value::Array(rows) => Ok(rows),
        other => Err(ExplorerError::malformed(format!(
            "{action}: expected a list, got {other}"
        ))),
    }
}

fn string_result(result: Value, action: &str) -> Result<String> {
    match result {
        Value::String(s) => Ok(s),
        other => Err(ExplorerError::malformed(format!(
            "{action}: expected a string, got {other}"
        ))),
    }
}

/// Etherscan-compatible explorer client
#[derive(Debug)]
pub struct ExplorerClient {
    http: Client,
    base_url: String,
    api_key: String,
    pacer: Pacer,
    retry: RetryPolicy,
}

impl ExplorerClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        if cfg.explorer_api_key.trim().is_empty() {
            return Err(ExplorerError::MissingCredential("ETHERSCAN_API_KEY"));
        }
        Ok(Self {
            http: http::build_client(cfg.http_timeout)?,
            base_url: cfg.explorer_url.clone(),
            api_key: cfg.explorer_api_key.clone(),
            pacer: Pacer::new(cfg.pace),
            retry: cfg.retry,
        })
    }

    /// One paced, retried GET; returns the unwrapped `result` field.
    async fn call(&self, module: &str, action: &str, params: &[(&str, String)]) -> Result<Value> {
        http::with_retry(self.retry, action, move || async move {
            self.pacer.wait().await;
            info!("📡 Explorer {} {:?}", action, params);

            let resp = self
                .http
                .get(&self.base_url)
                .query(&[("module", module), ("action", action)])
                .query(params)
                .query(&[("apikey", self.api_key.as_str())])
                .send()
                .await?;

            let envelope: Envelope = http::read_json(resp).await?;
            envelope.into_result(action)
        })
        .await
    }

    async fn transfers_page(&self, action: &str, address: &str, page: u32, offset: u32) -> Result<Vec<Value>> {
        let result = self
            .call(
                "account",
                action,
                &[
                    ("address", address.to_string()),
                    ("startblock", "0".to_string()),
                    ("endblock", "99999999".to_string()),
                    ("page", page.to_string()),
                    ("offset", offset.to_string()),
                    ("sort", "asc".to_string()),
                ],
            )
            .await?;
        records_from(result, action)
    }
}

impl ExplorerApi for ExplorerClient {
    async fn native_transfers_page(&self, address: &str, page: u32, offset: u32) -> Result<Vec<Value>> {
        self.transfers_page("txlist", address, page, offset).await
    }

    async fn token_transfers_page(&self, address: &str, page: u32, offset: u32) -> Result<Vec<Value>> {
        self.transfers_page("tokentx", address, page, offset).await
    }

    async fn balance(&self, address: &str) -> Result<Decimal> {
        let result = self
            .call(
                "account",
                "balance",
                &[("address", address.to_string()), ("tag", "latest".to_string())],
            )
            .await?;
        units::to_decimal(&string_result(result, "balance")?, units::NATIVE_DECIMALS)
    }

    async fn token_balance(&self, address: &str, contract: &str, decimals: u32) -> Result<Decimal> {
        let result = self
            .call(
                "account",
                "tokenbalance",
                &[
                    ("contractaddress", contract.to_string()),
                    ("address", address.to_string()),
                    ("tag", "latest".to_string()),
                ],
            )
            .await?;
        units::to_decimal(&string_result(result, "tokenbalance")?, decimals)
    }

    async fn eth_usd_price(&self) -> Result<Decimal> {
        let result = self.call("stats", "ethprice", &[]).await?;
        let price: EthPrice = serde_json::from_value(result)
            .map_err(|e| ExplorerError::malformed(format!("ethprice: {e}")))?;
        Decimal::from_str(price.ethusd.trim())
            .map_err(|e| ExplorerError::malformed(format!("ethprice {:?}: {e}", price.ethusd)))
    }
}
