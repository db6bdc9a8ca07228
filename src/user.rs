//! User accounts and positions
//!
//! `User` is the single source of truth for one account's cash and
//! positions. Fields are private; every mutation goes through a validated
//! method and returns `Result` where it can fail, so invariants cannot be
//! bypassed from the outside.
//!
//! # Invariants (enforced by private fields)
//! - cash never goes negative: `buy` checks funds before debiting
//! - at most one open position per asset id: positions live in a map keyed
//!   by asset id, and a second buy merges by replacement (cost bases and
//!   quantities summed)
//! - a sale either fully succeeds or leaves the account untouched

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::AssetQuote;
use crate::error::WalletError;

/// An unrealized, currently held purchase of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub asset_id: String,
    pub name: String,
    /// Cash originally invested.
    pub cost_basis: Decimal,
    /// cost basis / unit price at purchase time, summed across merged buys.
    pub quantity: Decimal,
}

/// A completed sale; records realized profit permanently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub asset_id: String,
    pub name: String,
    pub proceeds: Decimal,
    /// proceeds − cost basis at sale time; negative on a loss.
    pub profit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    username: String,
    password_hash: String,
    cash: Decimal,
    open_positions: BTreeMap<String, OpenPosition>,
    closed_positions: Vec<ClosedPosition>,
}

impl User {
    /// New account with zero cash and no positions.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            cash: Decimal::ZERO,
            open_positions: BTreeMap::new(),
            closed_positions: Vec::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn open_positions(&self) -> &BTreeMap<String, OpenPosition> {
        &self.open_positions
    }

    pub fn closed_positions(&self) -> &[ClosedPosition] {
        &self.closed_positions
    }

    /// Add to cash. Positivity is validated at the dispatcher boundary.
    pub fn deposit(&mut self, amount: Decimal) {
        self.cash += amount;
    }

    /// Invest `invest` cash into the quoted asset.
    ///
    /// Quantity bought is `invest / unit price`. A second buy of the same
    /// asset replaces the held position with one carrying the summed cost
    /// basis and quantity, so there is never more than one open position
    /// per asset.
    pub fn buy(&mut self, quote: &AssetQuote, invest: Decimal) -> Result<(), WalletError> {
        if invest > self.cash {
            return Err(WalletError::InsufficientFunds);
        }

        self.cash -= invest;
        let quantity = invest / quote.price;

        let merged = match self.open_positions.get(&quote.asset_id) {
            Some(held) => OpenPosition {
                asset_id: quote.asset_id.clone(),
                name: quote.name.clone(),
                cost_basis: held.cost_basis + invest,
                quantity: held.quantity + quantity,
            },
            None => OpenPosition {
                asset_id: quote.asset_id.clone(),
                name: quote.name.clone(),
                cost_basis: invest,
                quantity,
            },
        };
        self.open_positions.insert(quote.asset_id.clone(), merged);
        Ok(())
    }

    /// Close the whole position in `asset_id` at `unit_price`.
    ///
    /// Fails with `InvalidSale` before any state is touched when no open
    /// position exists. On success the proceeds are credited to cash and a
    /// `ClosedPosition` recording the realized profit is appended.
    pub fn sell(&mut self, asset_id: &str, unit_price: Decimal) -> Result<ClosedPosition, WalletError> {
        let position = self
            .open_positions
            .remove(asset_id)
            .ok_or(WalletError::InvalidSale)?;

        let proceeds = position.quantity * unit_price;
        let profit = proceeds - position.cost_basis;
        self.cash += proceeds;

        let closed = ClosedPosition {
            asset_id: position.asset_id,
            name: position.name,
            proceeds,
            profit,
        };
        self.closed_positions.push(closed.clone());
        Ok(closed)
    }
}
