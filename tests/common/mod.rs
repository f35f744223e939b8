#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use rust_decimal::Decimal;
use serde_json::{json, Value};
use wallet_explorer::error::{ExplorerError, Result};
use wallet_explorer::explorer::ExplorerApi;
use wallet_explorer::price::{is_quotable_symbol, TokenPriceSource};

pub const WALLET: &str = "0x1111111111111111111111111111111111111111";
pub const ALICE: &str = "0x2222222222222222222222222222222222222222";
pub const BOB: &str = "0x3333333333333333333333333333333333333333";
pub const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
pub const DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";

// 2024-01-02T00:00:00Z
pub const DAY_ONE: i64 = 1_704_153_600;

pub fn native_record(from: &str, to: &str, wei: &str, ts: i64) -> Value {
    json!({
        "hash": format!("0x{from}{ts}"),
        "from": from,
        "to": to,
        "value": wei,
        "input": "0x",
        "gasPrice": "20000000000",
        "gasUsed": "21000",
        "timeStamp": ts.to_string()
    })
}

pub fn token_record(from: &str, to: &str, raw: &str, symbol: &str, contract: &str, decimals: u32, ts: i64) -> Value {
    json!({
        "hash": format!("0x{from}{symbol}{ts}"),
        "from": from,
        "to": to,
        "tokenSymbol": symbol,
        "tokenName": format!("{symbol} Token"),
        "tokenDecimal": decimals.to_string(),
        "contractAddress": contract,
        "value": raw,
        "gasPrice": "10000000000",
        "gasUsed": "50000",
        "timeStamp": ts.to_string()
    })
}

pub fn eth(n: u64) -> String {
    format!("{n}000000000000000000")
}

/// In-memory explorer that records every call it serves
#[derive(Default)]
pub struct FakeExplorer {
    pub native_pages: Vec<Vec<Value>>,
    pub token_pages: Vec<Vec<Value>>,
    pub balance: Decimal,
    pub token_balances: HashMap<String, Decimal>,
    pub eth_price: Option<Decimal>,
    pub fail_on_page: Option<u32>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeExplorer {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn page(&self, pages: &[Vec<Value>], page: u32, offset: u32) -> Result<Vec<Value>> {
        if self.fail_on_page == Some(page) {
            return Err(ExplorerError::Upstream("page unavailable".into()));
        }
        let rows = pages.get(page as usize - 1).cloned().unwrap_or_default();
        Ok(rows.into_iter().take(offset as usize).collect())
    }
}

impl ExplorerApi for FakeExplorer {
    async fn native_transfers_page(&self, _address: &str, page: u32, offset: u32) -> Result<Vec<Value>> {
        self.record(format!("txlist:{page}:{offset}"));
        self.page(&self.native_pages, page, offset)
    }

    async fn token_transfers_page(&self, _address: &str, page: u32, offset: u32) -> Result<Vec<Value>> {
        self.record(format!("tokentx:{page}:{offset}"));
        self.page(&self.token_pages, page, offset)
    }

    async fn balance(&self, _address: &str) -> Result<Decimal> {
        self.record("balance".into());
        Ok(self.balance)
    }

    async fn token_balance(&self, _address: &str, contract: &str, _decimals: u32) -> Result<Decimal> {
        self.record(format!("tokenbalance:{contract}"));
        self.token_balances
            .get(contract)
            .copied()
            .ok_or_else(|| ExplorerError::Upstream(format!("no balance for {contract}")))
    }

    async fn eth_usd_price(&self) -> Result<Decimal> {
        self.record("ethprice".into());
        self.eth_price
            .ok_or_else(|| ExplorerError::malformed("ethprice: missing result"))
    }
}

/// Fixed symbol -> rate table with the same symbol check as the live client
#[derive(Default)]
pub struct FakePrices(pub HashMap<String, Decimal>);

impl TokenPriceSource for FakePrices {
    async fn token_usd_rate(&self, symbol: &str) -> Result<Option<Decimal>> {
        if !is_quotable_symbol(symbol) {
            return Ok(None);
        }
        Ok(self.0.get(&symbol.to_uppercase()).copied())
    }
}
