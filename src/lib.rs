//! Wallet behavior explorer: fetches an address's ETH and ERC-20 transfer history
//! from an Etherscan-style explorer and derives balances, daily net flow,
//! counterparty rankings and activity metrics, then classifies the wallet.

pub mod aggregator;
pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod explorer;
pub mod fetcher;
pub mod http;
pub mod models;
pub mod pacing;
pub mod parser;
pub mod price;
pub mod report;
pub mod units;
