//! HTTP contract tests for the CoinAPI price source

use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use coinvault::price_source::{CoinApiSource, PriceSource, PriceSourceError};

#[tokio::test]
async fn test_fetch_filters_to_priced_crypto_assets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/assets"))
        .and(header("X-CoinAPI-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "asset_id": "BTC", "name": "Bitcoin", "type_is_crypto": 1, "price_usd": 20253.00 },
            { "asset_id": "USD", "name": "US Dollar", "type_is_crypto": 0, "price_usd": 1.0 },
            { "asset_id": "DEAD", "name": "Delisted", "type_is_crypto": 1, "price_usd": 0.0 },
            { "asset_id": "ETH", "name": "Ethereum", "type_is_crypto": 1, "price_usd": 1500.0 },
            { "asset_id": "NOPRICE", "type_is_crypto": 1 }
        ])))
        .mount(&server)
        .await;

    let source = CoinApiSource::new(server.uri(), "test-key");
    let catalog = source.fetch().await.unwrap();

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.get("BTC").unwrap().price, dec!(20253.00));
    assert_eq!(catalog.get("ETH").unwrap().name, "Ethereum");
    assert!(catalog.get("USD").is_none());
    assert!(catalog.get("DEAD").is_none());
    assert!(catalog.get("NOPRICE").is_none());
    assert!(!catalog.is_stale());
}

#[tokio::test]
async fn test_fetch_caps_the_quote_count() {
    let records: Vec<_> = (0..120)
        .map(|i| {
            json!({
                "asset_id": format!("AST{i}"),
                "name": format!("Asset {i}"),
                "type_is_crypto": 1,
                "price_usd": 10.0 + i as f64
            })
        })
        .collect();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/assets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records))
        .mount(&server)
        .await;

    let source = CoinApiSource::new(server.uri(), "test-key");
    let catalog = source.fetch().await.unwrap();
    assert_eq!(catalog.len(), coinvault::price_source::MAX_QUOTES);
}

#[tokio::test]
async fn test_http_failures_map_to_typed_errors() {
    for (status, expected) in [
        (400, PriceSourceError::BadRequest),
        (401, PriceSourceError::Unauthorized),
        (429, PriceSourceError::RateLimited),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/assets"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let source = CoinApiSource::new(server.uri(), "test-key");
        assert_eq!(source.fetch().await.unwrap_err(), expected);
    }
}

#[tokio::test]
async fn test_unexpected_status_is_a_request_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/assets"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = CoinApiSource::new(server.uri(), "test-key");
    match source.fetch().await.unwrap_err() {
        PriceSourceError::Request(detail) => assert!(detail.contains("503")),
        other => panic!("unexpected error: {other:?}"),
    }
}
