// src/http.rs
use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{ExplorerError, Result};

/// Bounded retry with exponential backoff for transient upstream failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or attempts run out.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < attempts && e.is_retryable() => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {}ms",
                    label,
                    attempt,
                    attempts,
                    e,
                    delay.as_millis()
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Check the status and decode the body; the query string (API keys) never reaches errors.
pub async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    let mut url = resp.url().clone();
    url.set_query(None);

    if !status.is_success() {
        return Err(ExplorerError::HttpStatus {
            status,
            url: url.to_string(),
        });
    }

    let text = resp.text().await?;
    debug!("Raw response from {} ({} bytes)", url, text.len());
    serde_json::from_str(&text).map_err(|e| ExplorerError::malformed(format!("{url}: {e}")))
}
