// src/models.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// ERC-20 metadata carried by every token transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
    pub contract_address: String, // lower-cased
}

/// A single native or token transfer, amounts already scaled to human units
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transfer {
    pub hash: String,
    pub from: String, // lower-cased
    pub to: String,   // lower-cased
    pub value: Decimal,
    pub fee: Decimal, // always native units
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenInfo>,
}

impl Transfer {
    pub fn token_symbol(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.symbol.as_str())
    }
}

/// Transfers in on-chain order, as returned by the paginated fetch
pub type TransferSet = Vec<Transfer>;

/// Per-day `outflow - inflow` for one asset. Only days with activity are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetFlowSeries(pub BTreeMap<NaiveDate, Decimal>);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetFlowPoint {
    pub date: NaiveDate,
    pub net: Decimal,
}

impl NetFlowSeries {
    pub fn get(&self, day: &NaiveDate) -> Option<Decimal> {
        self.0.get(day).copied()
    }

    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn points(&self) -> Vec<NetFlowPoint> {
        self.0
            .iter()
            .map(|(date, net)| NetFlowPoint { date: *date, net: *net })
            .collect()
    }
}

impl Serialize for NetFlowSeries {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.points())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterpartyTotals {
    pub incoming_total: Decimal,
    pub outgoing_total: Decimal,
}

/// Counterparty address (lower-cased) -> totals exchanged with the wallet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterpartyTable(pub BTreeMap<String, CounterpartyTotals>);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterpartyRow {
    pub wallet: String,
    pub incoming_total: Decimal,
    pub outgoing_total: Decimal,
}

impl CounterpartyTable {
    pub fn get(&self, address: &str) -> Option<&CounterpartyTotals> {
        self.0.get(&address.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rows sorted by incoming total, largest first, zero rows dropped (receivers chart)
    pub fn top_senders(&self, n: usize) -> Vec<CounterpartyRow> {
        self.ranked(n, |t| t.incoming_total)
    }

    /// Rows sorted by outgoing total, largest first, zero rows dropped
    pub fn top_receivers(&self, n: usize) -> Vec<CounterpartyRow> {
        self.ranked(n, |t| t.outgoing_total)
    }

    pub fn rows(&self) -> Vec<CounterpartyRow> {
        self.0
            .iter()
            .map(|(wallet, t)| CounterpartyRow {
                wallet: wallet.clone(),
                incoming_total: t.incoming_total,
                outgoing_total: t.outgoing_total,
            })
            .collect()
    }

    fn ranked(&self, n: usize, key: impl Fn(&CounterpartyTotals) -> Decimal) -> Vec<CounterpartyRow> {
        let mut entries: Vec<_> = self.0.iter().filter(|(_, t)| !key(t).is_zero()).collect();
        // BTreeMap iteration is address-ordered and the sort is stable, so ties stay deterministic
        entries.sort_by(|(_, a), (_, b)| key(b).cmp(&key(a)));
        entries
            .into_iter()
            .take(n)
            .map(|(wallet, t)| CounterpartyRow {
                wallet: wallet.clone(),
                incoming_total: t.incoming_total,
                outgoing_total: t.outgoing_total,
            })
            .collect()
    }
}

impl Serialize for CounterpartyTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}

/// Scalars fed to the behavior classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WalletSummary {
    pub age_days: u64,
    pub tx_per_day: Decimal,
    pub total_volume: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Archetype {
    #[serde(rename = "HODLer")]
    Hodler,
    Trader,
    Whale,
}

impl Archetype {
    /// Find the first archetype named in free text, case-insensitively.
    pub fn find_in(text: &str) -> Option<Archetype> {
        let lower = text.to_ascii_lowercase();
        [
            ("hodler", Archetype::Hodler),
            ("trader", Archetype::Trader),
            ("whale", Archetype::Whale),
        ]
        .into_iter()
        .filter_map(|(needle, kind)| lower.find(needle).map(|pos| (pos, kind)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, kind)| kind)
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Archetype::Hodler => "HODLer",
            Archetype::Trader => "Trader",
            Archetype::Whale => "Whale",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub archetype: Archetype,
    pub reputation_score: u8, // 0..=100
    pub narrative: String,
}

/// Current holding of one token, with its USD rate when one is known
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenHolding {
    pub token: TokenInfo,
    pub balance: Decimal,
    pub usd_rate: Option<Decimal>,
}

impl TokenHolding {
    pub fn usd_value(&self) -> Option<Decimal> {
        self.usd_rate.map(|rate| rate * self.balance)
    }
}

/// One row of the value/fee timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRow {
    pub date: NaiveDate,
    pub value: Decimal,
    pub fee: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archetype_is_found_by_first_mention() {
        assert_eq!(Archetype::find_in("This wallet is a Whale, not a trader"), Some(Archetype::Whale));
        assert_eq!(Archetype::find_in("type: hodler"), Some(Archetype::Hodler));
        assert_eq!(Archetype::find_in("no label"), None);
    }

    #[test]
    fn counterparty_ranking_drops_zero_side() {
        let mut table = CounterpartyTable::default();
        table.0.insert(
            "0xa".into(),
            CounterpartyTotals { incoming_total: Decimal::from(5), outgoing_total: Decimal::ZERO },
        );
        table.0.insert(
            "0xb".into(),
            CounterpartyTotals { incoming_total: Decimal::from(9), outgoing_total: Decimal::from(1) },
        );
        let senders = table.top_senders(10);
        assert_eq!(senders.len(), 2);
        assert_eq!(senders[0].wallet, "0xb");
        let receivers = table.top_receivers(10);
        assert_eq!(receivers.len(), 1);
        assert_eq!(receivers[0].wallet, "0xb");
    }

    #[test]
    fn series_serializes_as_points() {
        let mut series = NetFlowSeries::default();
        series.0.insert(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), Decimal::from(3));
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json, serde_json::json!([{ "date": "2024-01-02", "net": "3" }]));
    }
}
