// src/report.rs
use std::collections::BTreeMap;

use futures_util::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregator::{self, TOP_COUNTERPARTIES};
use crate::classifier::Classifier;
use crate::error::Result;
use crate::explorer::ExplorerApi;
use crate::fetcher::{self, Paging};
use crate::models::{
    ClassificationResult, CounterpartyTable, NetFlowSeries, TimelineRow, TokenHolding, WalletSummary,
};
use crate::price::{self, TokenPriceSource};

/// Everything the ETH charts need, native units plus the rate to convert them
#[derive(Debug, Serialize)]
pub struct NativeView {
    pub address: String,
    pub balance: Decimal,
    pub usd_rate: Option<Decimal>,
    pub timeline: Vec<TimelineRow>,
    pub net_flow: NetFlowSeries,
    pub counterparties: CounterpartyTable,
}

#[derive(Debug, Serialize)]
pub struct TokenView {
    pub address: String,
    pub holdings: Vec<TokenHolding>,
    /// Sum of holdings that have a USD rate; tokens without one are left out
    pub priced_total_usd: Decimal,
    pub net_flow: BTreeMap<String, NetFlowSeries>,
}

#[derive(Debug, Serialize)]
pub struct TokenCounterpartyView {
    pub address: String,
    pub symbol: String,
    pub usd_rate: Option<Decimal>,
    pub timeline: Vec<TimelineRow>,
    pub counterparties: CounterpartyTable,
}

#[derive(Debug, Serialize)]
pub struct SummaryView {
    pub address: String,
    pub summary: WalletSummary,
    pub classification: ClassificationResult,
}

/// One wallet-analysis request: fetch once, derive every view from that fetch.
#[derive(Debug)]
pub struct WalletAnalyzer<E, P, C> {
    explorer: E,
    prices: P,
    classifier: C,
    paging: Paging,
}

impl<E, P, C> WalletAnalyzer<E, P, C>
where
    E: ExplorerApi,
    P: TokenPriceSource,
    C: Classifier,
{
    pub fn new(explorer: E, prices: P, classifier: C, paging: Paging) -> Self {
        Self {
            explorer,
            prices,
            classifier,
            paging,
        }
    }

    pub fn explorer(&self) -> &E {
        &self.explorer
    }

    /// Balance, history, net flow and counterparties for native ETH
    pub async fn native_view(&self, address: &str) -> Result<NativeView> {
        let address = address.to_lowercase();
        let (transfers, balance, usd_rate) = tokio::try_join!(
            fetcher::fetch_native_transfers(&self.explorer, &address, self.paging),
            aggregator::balance(&self.explorer, &address),
            self.native_rate(),
        )?;

        info!("ETH view for {}: {} transfers, balance {}", address, transfers.len(), balance);
        Ok(NativeView {
            balance,
            usd_rate,
            timeline: aggregator::timeline(&transfers),
            net_flow: aggregator::net_flow(&transfers, &address),
            counterparties: aggregator::top_counterparties(&transfers, &address, TOP_COUNTERPARTIES),
            address,
        })
    }

    /// Holdings and per-token net flow across every token the wallet touched
    pub async fn token_view(&self, address: &str) -> Result<TokenView> {
        let address = address.to_lowercase();
        let transfers = fetcher::fetch_token_transfers(&self.explorer, &address, self.paging).await?;
        let catalog = aggregator::token_catalog(&transfers);

        let holdings = join_all(catalog.into_iter().map(|token| {
            let address = address.as_str();
            async move {
                let (balance, usd_rate) = tokio::join!(
                    self.explorer
                        .token_balance(address, &token.contract_address, token.decimals),
                    self.token_rate(&token.symbol),
                );
                match balance {
                    Ok(balance) => Some(TokenHolding { token, balance, usd_rate }),
                    Err(e) => {
                        warn!("Token balance for {} failed: {}", token.symbol, e);
                        None
                    }
                }
            }
        }))
        .await
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

        let priced_total_usd = holdings
            .iter()
            .filter_map(TokenHolding::usd_value)
            .fold(Decimal::ZERO, |acc, v| acc.saturating_add(v));

        info!("Token view for {}: {} holdings", address, holdings.len());
        Ok(TokenView {
            net_flow: aggregator::per_token_net_flow(&transfers, &address),
            holdings,
            priced_total_usd,
            address,
        })
    }

    /// Value timeline and counterparties for one token symbol
    pub async fn token_counterparties(&self, address: &str, symbol: &str) -> Result<TokenCounterpartyView> {
        let address = address.to_lowercase();
        let (transfers, usd_rate) = tokio::join!(
            fetcher::fetch_token_transfers(&self.explorer, &address, self.paging),
            self.token_rate(symbol),
        );
        let transfers = transfers?;

        Ok(TokenCounterpartyView {
            symbol: symbol.to_string(),
            usd_rate,
            timeline: aggregator::timeline(transfers.iter().filter(|t| t.token_symbol() == Some(symbol))),
            counterparties: aggregator::token_counterparties(&transfers, &address, symbol, TOP_COUNTERPARTIES),
            address,
        })
    }

    /// Age, activity and volume from a single native fetch, then classification
    pub async fn summary(&self, address: &str) -> Result<SummaryView> {
        let address = address.to_lowercase();
        let (transfers, age_days) = tokio::try_join!(
            fetcher::fetch_native_transfers(&self.explorer, &address, self.paging),
            fetcher::age(&self.explorer, &address),
        )?;

        let summary = aggregator::summarize(&transfers, age_days);
        info!(
            "Summary for {}: age {}d, {} tx/day, volume {}",
            address, summary.age_days, summary.tx_per_day, summary.total_volume
        );

        let classification = self.classifier.classify(&summary).await?;
        Ok(SummaryView {
            address,
            summary,
            classification,
        })
    }

    // A missing rate degrades the USD view, it never fails the request.
    async fn native_rate(&self) -> Result<Option<Decimal>> {
        match price::native_usd_rate(&self.explorer).await {
            Ok(rate) => Ok(Some(rate)),
            Err(e) => {
                warn!("ETH-USD rate unavailable: {}", e);
                Ok(None)
            }
        }
    }

    async fn token_rate(&self, symbol: &str) -> Option<Decimal> {
        match self.prices.token_usd_rate(symbol).await {
            Ok(rate) => rate,
            Err(e) => {
                warn!("USD rate for {} unavailable: {}", symbol, e);
                None
            }
        }
    }
}
