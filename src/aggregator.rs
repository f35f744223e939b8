use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::explorer::ExplorerApi;
use crate::models::{
    CounterpartyTable, CounterpartyTotals, NetFlowSeries, TimelineRow, TokenInfo, Transfer, WalletSummary,
};

/// Default number of counterparties kept per direction
pub const TOP_COUNTERPARTIES: usize = 10;

/// Authoritative on-chain balance straight from the explorer, not summed from history.
pub async fn balance<E: ExplorerApi>(explorer: &E, address: &str) -> Result<Decimal> {
    explorer.balance(&address.to_lowercase()).await
}

fn add(acc: &mut Decimal, value: Decimal) {
    *acc = acc.saturating_add(value);
}

/// Per-day `outflow - inflow` for `address` over `transfers`.
///
/// Days come from either side; a day with only inflow shows up negative.
pub fn net_flow<'a>(transfers: impl IntoIterator<Item = &'a Transfer>, address: &str) -> NetFlowSeries {
    let addr = address.to_lowercase();
    let mut out: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    let mut inc: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();

    for t in transfers {
        if t.from == addr {
            add(out.entry(t.date).or_default(), t.value);
        }
        if t.to == addr {
            add(inc.entry(t.date).or_default(), t.value);
        }
    }

    // aligned subtraction over the union of days
    let mut series = out;
    for (day, value) in inc {
        let entry = series.entry(day).or_default();
        *entry = entry.saturating_sub(value);
    }
    NetFlowSeries(series)
}

/// One net-flow series per token symbol.
pub fn per_token_net_flow(transfers: &[Transfer], address: &str) -> BTreeMap<String, NetFlowSeries> {
    let mut by_symbol: BTreeMap<String, Vec<&Transfer>> = BTreeMap::new();
    for t in transfers {
        if let Some(symbol) = t.token_symbol() {
            by_symbol.entry(symbol.to_string()).or_default().push(t);
        }
    }

    by_symbol
        .into_iter()
        .map(|(symbol, group)| (symbol, net_flow(group, address)))
        .filter(|(_, series)| !series.is_empty())
        .collect()
}

/// Largest `limit` counterparties in each direction, merged.
///
/// An address ranks in by incoming OR outgoing total; the other side defaults to 0.
pub fn top_counterparties<'a>(
    transfers: impl IntoIterator<Item = &'a Transfer>,
    address: &str,
    limit: usize,
) -> CounterpartyTable {
    let addr = address.to_lowercase();
    let mut sent_to: HashMap<&str, Decimal> = HashMap::new();
    let mut received_from: HashMap<&str, Decimal> = HashMap::new();

    for t in transfers {
        if t.from == addr {
            add(sent_to.entry(t.to.as_str()).or_default(), t.value);
        }
        if t.to == addr {
            add(received_from.entry(t.from.as_str()).or_default(), t.value);
        }
    }

    let mut table = BTreeMap::<String, CounterpartyTotals>::new();
    for (wallet, total) in largest(received_from, limit) {
        table.entry(wallet.to_string()).or_default().incoming_total = total;
    }
    for (wallet, total) in largest(sent_to, limit) {
        table.entry(wallet.to_string()).or_default().outgoing_total = total;
    }
    CounterpartyTable(table)
}

fn largest(totals: HashMap<&str, Decimal>, limit: usize) -> Vec<(&str, Decimal)> {
    let mut ranked: Vec<_> = totals.into_iter().filter(|(_, v)| !v.is_zero()).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(limit);
    ranked
}

/// Counterparties for a single token symbol
pub fn token_counterparties(transfers: &[Transfer], address: &str, symbol: &str, limit: usize) -> CounterpartyTable {
    top_counterparties(
        transfers.iter().filter(|t| t.token_symbol() == Some(symbol)),
        address,
        limit,
    )
}

/// Distinct tokens seen in `transfers`, first-seen order, keyed by contract
pub fn token_catalog(transfers: &[Transfer]) -> Vec<TokenInfo> {
    let mut seen = HashSet::new();
    transfers
        .iter()
        .filter_map(|t| t.token.as_ref())
        .filter(|info| seen.insert(info.contract_address.clone()))
        .cloned()
        .collect()
}

/// Value/fee rows in chain order, for the line charts
pub fn timeline<'a>(transfers: impl IntoIterator<Item = &'a Transfer>) -> Vec<TimelineRow> {
    transfers
        .into_iter()
        .map(|t| TimelineRow {
            date: t.date,
            value: t.value,
            fee: t.fee,
        })
        .collect()
}

/// Transfers per day of wallet age; 0 for a wallet younger than a day.
pub fn tx_per_day(transfer_count: usize, age_days: u64) -> Decimal {
    if age_days == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(transfer_count as u64) / Decimal::from(age_days)
}

pub fn volume(transfers: &[Transfer]) -> Decimal {
    transfers
        .iter()
        .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.value))
}

/// Scalars for classification, computed from one fetched transfer set
pub fn summarize(transfers: &[Transfer], age_days: u64) -> WalletSummary {
    WalletSummary {
        age_days,
        tx_per_day: tx_per_day(transfers.len(), age_days),
        total_volume: volume(transfers),
    }
}
