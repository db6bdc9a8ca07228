//! External price source
//!
//! The wallet never talks HTTP directly; it consumes the [`PriceSource`]
//! trait and receives a whole [`PriceCatalog`] per fetch. The production
//! implementation is [`CoinApiSource`], backed by the CoinAPI assets
//! endpoint. There is no timeout and no retry policy: a failed fetch fails
//! the triggering request only, and the stale catalog stays in place.

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::{AssetQuote, PriceCatalog};

/// Cap on quotes kept from one fetch. The upstream asset list is thousands
/// of entries; the wallet only offers the first fifty tradeable ones.
pub const MAX_QUOTES: usize = 50;

const ASSETS_PATH: &str = "/v1/assets";
const API_KEY_HEADER: &str = "X-CoinAPI-Key";

#[derive(Debug, Error, PartialEq)]
pub enum PriceSourceError {
    #[error("There is a problem with the price request")]
    BadRequest,

    #[error("The price provider rejected the API key")]
    Unauthorized,

    #[error("Too many requests to the price provider, try again later")]
    RateLimited,

    /// Transport failure, unexpected status, or undecodable body.
    #[error("Price provider request failed: {0}")]
    Request(String),
}

/// Supplies the current set of asset quotes with a freshness timestamp.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self) -> Result<PriceCatalog, PriceSourceError>;
}

/// One record of the CoinAPI `/v1/assets` response. Fiat currencies carry
/// `type_is_crypto: 0`; many assets omit `price_usd` entirely.
#[derive(Debug, Deserialize)]
struct AssetRecord {
    asset_id: String,
    #[serde(default)]
    name: Option<String>,
    type_is_crypto: i64,
    #[serde(default)]
    price_usd: Option<Decimal>,
}

/// CoinAPI-backed price source.
pub struct CoinApiSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CoinApiSource {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl PriceSource for CoinApiSource {
    async fn fetch(&self) -> Result<PriceCatalog, PriceSourceError> {
        let url = format!("{}{}", self.base_url, ASSETS_PATH);
        tracing::debug!(%url, "fetching asset quotes");

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| PriceSourceError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::BAD_REQUEST => return Err(PriceSourceError::BadRequest),
            StatusCode::UNAUTHORIZED => return Err(PriceSourceError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => return Err(PriceSourceError::RateLimited),
            status => {
                return Err(PriceSourceError::Request(format!(
                    "unexpected status {status}"
                )));
            }
        }

        let records: Vec<AssetRecord> = response
            .json()
            .await
            .map_err(|e| PriceSourceError::Request(e.to_string()))?;

        let quotes: Vec<AssetQuote> = records
            .into_iter()
            .filter(|r| r.type_is_crypto == 1)
            .filter_map(|r| {
                let price = r.price_usd?;
                if price <= Decimal::ZERO {
                    return None;
                }
                Some(AssetQuote {
                    name: r.name.unwrap_or_else(|| r.asset_id.clone()),
                    asset_id: r.asset_id,
                    price,
                })
            })
            .take(MAX_QUOTES)
            .collect();

        tracing::info!(quotes = quotes.len(), "asset quotes fetched");
        Ok(PriceCatalog::new(quotes, chrono::Utc::now()))
    }
}
