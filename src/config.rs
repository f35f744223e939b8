use dotenvy::dotenv;
use eyre::{eyre, Result};
use std::{env, str::FromStr, time::Duration};
use tracing::info;

use crate::http::RetryPolicy;

pub const DEFAULT_EXPLORER_URL: &str = "https://api.etherscan.io/api";
pub const DEFAULT_PRICE_URL: &str =
    "https://pro-api.coinmarketcap.com/v1/cryptocurrency/quotes/latest";
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone)]
pub struct Config {
    pub explorer_url: String,
    pub explorer_api_key: String,
    pub price_url: String,
    pub price_api_key: Option<String>,
    pub gemini_url: String,
    pub gemini_model: String,
    pub gemini_api_key: Option<String>,
    pub page_size: u32,
    pub max_pages: u32,
    pub pace: Duration, // minimum spacing between calls to one host
    pub retry: RetryPolicy,
    pub http_timeout: Duration,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            explorer_api_key: String::new(),
            price_url: DEFAULT_PRICE_URL.to_string(),
            price_api_key: None,
            gemini_url: DEFAULT_GEMINI_URL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_key: None,
            page_size: 10_000,
            max_pages: 100,
            pace: Duration::from_millis(250),
            retry: RetryPolicy::default(),
            http_timeout: Duration::from_secs(15),
            port: 8080,
        }
    }
}

// Keys stay out of logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("explorer_url", &self.explorer_url)
            .field("price_url", &self.price_url)
            .field("price_api_key", &self.price_api_key.as_ref().map(|_| "<set>"))
            .field("gemini_url", &self.gemini_url)
            .field("gemini_model", &self.gemini_model)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<set>"))
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("pace", &self.pace)
            .field("retry", &self.retry)
            .field("http_timeout", &self.http_timeout)
            .field("port", &self.port)
            .finish()
    }
}

pub fn load() -> Result<Config> {
    dotenv().ok(); // .env is optional

    from_lookup(|key| env::var(key).ok())
}

/// Build a config from any key lookup (the process env in `load`)
pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let defaults = Config::default();

    let explorer_api_key = get("ETHERSCAN_API_KEY")
        .or_else(|| get("Etherscan_API_Key")) // alias support
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| eyre!("ETHERSCAN_API_KEY is required"))?;

    let optional = |primary: &str, alias: &str| {
        get(primary)
            .or_else(|| get(alias))
            .filter(|k| !k.trim().is_empty())
    };

    let retry = RetryPolicy {
        attempts: parse_or(&get, "HTTP_RETRIES", defaults.retry.attempts),
        ..defaults.retry
    };

    let cfg = Config {
        explorer_url: get("EXPLORER_URL").unwrap_or(defaults.explorer_url),
        explorer_api_key,
        price_url: get("PRICE_API_URL").unwrap_or(defaults.price_url),
        price_api_key: optional("COINMARKETCAP_API_KEY", "CoinMarketCap_API_Key"),
        gemini_url: get("GEMINI_URL").unwrap_or(defaults.gemini_url),
        gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
        gemini_api_key: optional("GEMINI_API_KEY", "Gemini_API_Key"),
        page_size: parse_or(&get, "PAGE_SIZE", defaults.page_size).max(1),
        max_pages: parse_or(&get, "MAX_PAGES", defaults.max_pages).max(1),
        pace: Duration::from_millis(parse_or(&get, "PACE_MS", 250u64)),
        retry,
        http_timeout: Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", 15u64)),
        port: parse_or(&get, "PORT", defaults.port),
    };

    info!("Loaded config: {:?}", cfg);

    Ok(cfg)
}

fn parse_or<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
