// src/price.rs
use std::collections::HashMap;
use std::future::Future;

use reqwest::{Client, StatusCode};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ExplorerError, Result};
use crate::explorer::ExplorerApi;
use crate::http::{self, RetryPolicy};
use crate::pacing::Pacer;

/// Resolves token-USD rates by symbol.
///
/// `Ok(None)` means "no usable rate": the caller leaves the token out of USD views.
pub trait TokenPriceSource: Send + Sync {
    fn token_usd_rate(&self, symbol: &str) -> impl Future<Output = Result<Option<Decimal>>> + Send;
}

/// ETH-USD spot rate, served by the explorer's stats endpoint
pub async fn native_usd_rate<E: ExplorerApi>(explorer: &E) -> Result<Decimal> {
    explorer.eth_usd_price().await
}

/// Symbols the quote API accepts: `^[A-Za-z0-9]+$`
pub fn is_quotable_symbol(symbol: &str) -> bool {
    !symbol.is_empty() && symbol.chars().all(|c| c.is_ascii_alphanumeric())
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    #[serde(default)]
    data: HashMap<String, QuoteEntry>,
}

#[derive(Debug, Deserialize)]
struct QuoteEntry {
    #[serde(default)]
    quote: HashMap<String, Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    price: Option<f64>,
}

impl QuotesResponse {
    fn usd_price(&self, symbol: &str) -> Option<Decimal> {
        let price = self.data.get(symbol)?.quote.get("USD")?.price?;
        Decimal::from_f64(price).map(|p| p.round_dp(6))
    }
}

/// CoinMarketCap `quotes/latest` client
#[derive(Debug)]
pub struct CoinMarketCapClient {
    http: Client,
    url: String,
    api_key: Option<String>,
    pacer: Pacer,
    retry: RetryPolicy,
}

impl CoinMarketCapClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            http: http::build_client(cfg.http_timeout)?,
            url: cfg.price_url.clone(),
            api_key: cfg.price_api_key.clone(),
            pacer: Pacer::new(cfg.pace),
            retry: cfg.retry,
        })
    }
}

impl TokenPriceSource for CoinMarketCapClient {
    async fn token_usd_rate(&self, symbol: &str) -> Result<Option<Decimal>> {
        if !is_quotable_symbol(symbol) {
            debug!("Skipping invalid token symbol: {:?}", symbol);
            return Ok(None);
        }
        let Some(api_key) = self.api_key.as_deref() else {
            debug!("No price API key, {} has no USD rate", symbol);
            return Ok(None);
        };

        let symbol = symbol.to_uppercase();
        let sym = symbol.as_str();
        let fetched: Result<QuotesResponse> = http::with_retry(self.retry, "quotes/latest", move || async move {
            self.pacer.wait().await;
            info!("📡 Price quote for {}", sym);
            let resp = self
                .http
                .get(&self.url)
                .header("Accepts", "application/json")
                .header("X-CMC_PRO_API_KEY", api_key)
                .query(&[("symbol", sym), ("convert", "USD")])
                .send()
                .await?;
            http::read_json(resp).await
        })
        .await;

        // the quote API answers 400 for symbols it doesn't list
        let quotes = match fetched {
            Err(ExplorerError::HttpStatus { status, .. }) if status == StatusCode::BAD_REQUEST => {
                warn!("Unknown token symbol {}", symbol);
                return Ok(None);
            }
            other => other?,
        };

        let rate = quotes.usd_price(&symbol);
        if rate.is_none() {
            warn!("No USD price in quote response for {}", symbol);
        }
        Ok(rate)
    }
}
