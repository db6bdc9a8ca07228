//! Price catalog
//!
//! The last fetched set of asset quotes plus its snapshot timestamp. The
//! catalog is replaced wholesale on refresh, never mutated field-by-field.
//! A snapshot older than the freshness window is stale; staleness is checked
//! lazily by the dispatcher on any read that needs prices.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Maximum age of a price snapshot before the next price-reading command
/// attempts a refresh.
pub const FRESHNESS_WINDOW_MINUTES: i64 = 30;

/// One asset quote as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetQuote {
    pub asset_id: String,
    pub name: String,
    /// Unit price in USD, always > 0 (the source filters zero-priced assets).
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceCatalog {
    quotes: FxHashMap<String, AssetQuote>,
    snapshot_at: DateTime<Utc>,
}

impl PriceCatalog {
    pub fn new(quotes: impl IntoIterator<Item = AssetQuote>, snapshot_at: DateTime<Utc>) -> Self {
        Self {
            quotes: quotes
                .into_iter()
                .map(|q| (q.asset_id.clone(), q))
                .collect(),
            snapshot_at,
        }
    }

    /// An empty catalog stamped at the UNIX epoch, so the first command that
    /// needs prices always triggers a refresh attempt.
    pub fn empty() -> Self {
        Self {
            quotes: FxHashMap::default(),
            snapshot_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn get(&self, asset_id: &str) -> Option<&AssetQuote> {
        self.quotes.get(asset_id)
    }

    /// Iterate all quotes. No ordering guarantee.
    pub fn iter(&self) -> impl Iterator<Item = &AssetQuote> {
        self.quotes.values()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn snapshot_at(&self) -> DateTime<Utc> {
        self.snapshot_at
    }

    pub fn is_stale(&self) -> bool {
        Utc::now() - self.snapshot_at > Duration::minutes(FRESHNESS_WINDOW_MINUTES)
    }
}
