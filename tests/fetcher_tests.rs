mod common;

use common::*;
use rust_decimal::Decimal;
use serde_json::json;
use wallet_explorer::error::ExplorerError;
use wallet_explorer::fetcher::{self, Paging};

const SMALL: Paging = Paging {
    page_size: 3,
    max_pages: 10,
};

fn full_page(ts: i64) -> Vec<serde_json::Value> {
    (0..3)
        .map(|i| native_record(WALLET, ALICE, &eth(1), ts + i))
        .collect()
}

#[tokio::test]
async fn full_page_then_empty_page_takes_two_requests() {
    let explorer = FakeExplorer {
        native_pages: vec![full_page(DAY_ONE), vec![]],
        ..Default::default()
    };

    let transfers = fetcher::fetch_native_transfers(&explorer, WALLET, SMALL).await.unwrap();

    assert_eq!(explorer.calls(), vec!["txlist:1:3", "txlist:2:3"]);
    assert_eq!(transfers.len(), 3);
}

#[tokio::test]
async fn pages_are_concatenated_in_order() {
    let explorer = FakeExplorer {
        native_pages: vec![
            full_page(DAY_ONE),
            vec![native_record(ALICE, WALLET, &eth(2), DAY_ONE + 86_400)],
        ],
        ..Default::default()
    };

    let transfers = fetcher::fetch_native_transfers(&explorer, WALLET, SMALL).await.unwrap();

    assert_eq!(explorer.count("txlist"), 2);
    assert_eq!(transfers.len(), 4);
    assert_eq!(transfers[3].value, Decimal::from(2));
    assert!(transfers.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn short_first_page_stops_immediately() {
    let explorer = FakeExplorer {
        native_pages: vec![vec![native_record(WALLET, ALICE, &eth(1), DAY_ONE)]],
        ..Default::default()
    };

    fetcher::fetch_native_transfers(&explorer, WALLET, SMALL).await.unwrap();
    assert_eq!(explorer.count("txlist"), 1);
}

#[tokio::test]
async fn page_cap_bounds_runaway_pagination() {
    let explorer = FakeExplorer {
        native_pages: (0..50).map(|p| full_page(DAY_ONE + p * 10)).collect(),
        ..Default::default()
    };
    let paging = Paging {
        page_size: 3,
        max_pages: 4,
    };

    let transfers = fetcher::fetch_native_transfers(&explorer, WALLET, paging).await.unwrap();
    assert_eq!(explorer.count("txlist"), 4);
    assert_eq!(transfers.len(), 12);
}

#[tokio::test]
async fn failed_page_aborts_without_partial_data() {
    let explorer = FakeExplorer {
        native_pages: vec![full_page(DAY_ONE), full_page(DAY_ONE + 100), vec![]],
        fail_on_page: Some(2),
        ..Default::default()
    };

    let err = fetcher::fetch_native_transfers(&explorer, WALLET, SMALL).await.unwrap_err();
    assert!(matches!(err, ExplorerError::Upstream(_)));
}

#[tokio::test]
async fn filtered_records_still_count_toward_page_size() {
    // three raw records, only one kept: the page is still full, so page 2 is requested
    let mut contract_call = native_record(WALLET, ALICE, &eth(1), DAY_ONE);
    contract_call["input"] = json!("0xa9059cbb");
    let zero_value = native_record(WALLET, ALICE, "0", DAY_ONE);
    let explorer = FakeExplorer {
        native_pages: vec![
            vec![contract_call, zero_value, native_record(WALLET, ALICE, &eth(3), DAY_ONE)],
            vec![],
        ],
        ..Default::default()
    };

    let transfers = fetcher::fetch_native_transfers(&explorer, WALLET, SMALL).await.unwrap();
    assert_eq!(explorer.count("txlist"), 2);
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].value, Decimal::from(3));
}

#[tokio::test]
async fn malformed_token_record_is_skipped() {
    let mut broken = token_record(ALICE, WALLET, "5000000", "USDC", USDC, 6, DAY_ONE);
    broken["tokenDecimal"] = json!("six");
    let explorer = FakeExplorer {
        token_pages: vec![vec![
            broken,
            token_record(ALICE, WALLET, "5000000", "USDC", USDC, 6, DAY_ONE),
        ]],
        ..Default::default()
    };

    let transfers = fetcher::fetch_token_transfers(&explorer, WALLET, SMALL).await.unwrap();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].value, Decimal::from(5));
    assert_eq!(transfers[0].token_symbol(), Some("USDC"));
}

#[tokio::test]
async fn age_uses_single_earliest_record() {
    let explorer = FakeExplorer {
        native_pages: vec![full_page(DAY_ONE)],
        ..Default::default()
    };
    let first = fetcher::first_activity(&explorer, WALLET).await.unwrap().unwrap();
    assert_eq!(first.timestamp(), DAY_ONE);
    assert_eq!(explorer.calls(), vec!["txlist:1:1"]);
    assert!(fetcher::age(&explorer, WALLET).await.unwrap() > 0);
}

#[tokio::test]
async fn age_is_zero_for_fresh_address() {
    let explorer = FakeExplorer::default();
    assert_eq!(fetcher::age(&explorer, WALLET).await.unwrap(), 0);
}
