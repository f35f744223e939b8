// src/fetcher.rs
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ExplorerError, Result};
use crate::explorer::ExplorerApi;
use crate::models::TransferSet;
use crate::parser::{self, RawNativeTx, RawTokenTx};

/// Page size and safety cap for paginated history fetches
#[derive(Debug, Clone, Copy)]
pub struct Paging {
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            page_size: 10_000,
            max_pages: 100,
        }
    }
}

/// Walk pages 1.. until a short/empty page (or the page cap), then normalize.
///
/// A failed page aborts the whole fetch; partial history is never returned.
async fn fetch_all<F, Fut>(label: &str, paging: Paging, mut fetch_page: F) -> Result<Vec<Value>>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<Value>>>,
{
    let mut records = Vec::new();
    let mut page = 1;

    loop {
        let batch = fetch_page(page).await?;
        let count = batch.len();
        records.extend(batch);
        info!("{} page {} → {} records", label, page, count);

        if count < paging.page_size as usize {
            break;
        }
        if page >= paging.max_pages {
            warn!(
                "{}: stopped at the {}-page cap with {} records, history may be truncated",
                label, paging.max_pages, records.len()
            );
            break;
        }
        page += 1;
    }

    Ok(records)
}

/// Plain ETH transfers of `address`, in chain order
pub async fn fetch_native_transfers<E: ExplorerApi>(
    explorer: &E,
    address: &str,
    paging: Paging,
) -> Result<TransferSet> {
    let records = fetch_all("txlist", paging, move |page| {
        explorer.native_transfers_page(address, page, paging.page_size)
    })
    .await?;
    let raw_count = records.len();
    let transfers = parser::decode_page::<RawNativeTx, _>(records, parser::decode_native);
    info!("Native transfers for {}: {} kept of {} records", address, transfers.len(), raw_count);
    Ok(transfers)
}

/// ERC-20 transfers of `address`, in chain order
pub async fn fetch_token_transfers<E: ExplorerApi>(
    explorer: &E,
    address: &str,
    paging: Paging,
) -> Result<TransferSet> {
    let records = fetch_all("tokentx", paging, move |page| {
        explorer.token_transfers_page(address, page, paging.page_size)
    })
    .await?;
    let raw_count = records.len();
    let transfers = parser::decode_page::<RawTokenTx, _>(records, parser::decode_token);
    info!("Token transfers for {}: {} kept of {} records", address, transfers.len(), raw_count);
    Ok(transfers)
}

/// Timestamp of the address's earliest transaction, if any
pub async fn first_activity<E: ExplorerApi>(explorer: &E, address: &str) -> Result<Option<DateTime<Utc>>> {
    let page = explorer.native_transfers_page(address, 1, 1).await?;
    let Some(first) = page.first() else {
        return Ok(None);
    };

    let ts = first
        .get("timeStamp")
        .and_then(Value::as_str)
        .and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0));

    ts.map(Some)
        .ok_or_else(|| ExplorerError::malformed("txlist: first record has no usable timeStamp"))
}

/// Whole days elapsed since the first transaction; 0 without history.
pub fn age_days(first: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u64 {
    first
        .map(|ts| (now - ts).num_days().max(0) as u64)
        .unwrap_or(0)
}

/// Wallet age in days, measured against the current clock
pub async fn age<E: ExplorerApi>(explorer: &E, address: &str) -> Result<u64> {
    let first = first_activity(explorer, address).await?;
    Ok(age_days(first, Utc::now()))
}
