//! Wallet ledger
//!
//! The single-threaded authority over all registered users. Every wallet
//! operation (register, login, deposit, buy, sell, summaries, disconnect)
//! is one atomic state transition on the user map; the surrounding core
//! service serializes calls, so no locking discipline is needed here.
//!
//! The ledger resolves the caller's session itself: operations take the
//! session table and a connection id, and fail with `NotLoggedIn` when the
//! connection has no bound user. Registration and disconnect write the user
//! set through the [`Repository`] collaborator; a persistence failure is
//! logged and does not roll back the in-memory transition.

use std::sync::Arc;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::catalog::PriceCatalog;
use crate::core_types::ConnId;
use crate::error::WalletError;
use crate::repository::Repository;
use crate::session::SessionTable;
use crate::user::{ClosedPosition, User};

/// One open position marked to the current catalog price.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedPosition {
    pub asset_id: String,
    pub name: String,
    pub cost_basis: Decimal,
    /// current unit price × quantity
    pub market_value: Decimal,
    /// market value − cost basis
    pub profit: Decimal,
}

/// Result of `overall_summary`: open positions marked to market, closed
/// positions, and the grand total of unrealized plus realized profit.
#[derive(Debug, Clone, PartialEq)]
pub struct OverallSummary {
    pub open: Vec<MarkedPosition>,
    pub closed: Vec<ClosedPosition>,
    pub overall_profit: Decimal,
}

pub struct Ledger {
    users: FxHashMap<String, User>,
    repository: Arc<dyn Repository>,
}

impl Ledger {
    pub fn new(users: Vec<User>, repository: Arc<dyn Repository>) -> Self {
        let users = users
            .into_iter()
            .map(|u| (u.username().to_string(), u))
            .collect();
        Self { users, repository }
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Create a new user with zero cash and empty position sets, then
    /// persist the updated user set. Usernames are case-sensitive exact
    /// matches.
    pub fn register(&mut self, username: &str, password: &str) -> Result<(), WalletError> {
        if self.users.contains_key(username) {
            return Err(WalletError::DuplicateUser);
        }

        let user = User::new(username, hash_password(password));
        self.users.insert(username.to_string(), user);
        tracing::info!(username, "user registered");

        self.persist_users();
        Ok(())
    }

    /// Bind the session to the user on success. An unknown username and a
    /// wrong password fail identically.
    pub fn login(
        &self,
        sessions: &mut SessionTable,
        conn_id: ConnId,
        username: &str,
        password: &str,
    ) -> Result<(), WalletError> {
        let user = self
            .users
            .get(username)
            .ok_or(WalletError::AuthenticationFailure)?;
        if user.password_hash() != hash_password(password) {
            return Err(WalletError::AuthenticationFailure);
        }

        sessions.bind(conn_id, username);
        tracing::info!(conn_id, username, "user logged in");
        Ok(())
    }

    pub fn deposit(
        &mut self,
        sessions: &SessionTable,
        conn_id: ConnId,
        amount: Decimal,
    ) -> Result<(), WalletError> {
        let user = self.session_user_mut(sessions, conn_id)?;
        user.deposit(amount);
        Ok(())
    }

    /// Buy against the catalog as-is; staleness is the dispatcher's concern
    /// (and deliberately not checked for buys).
    pub fn buy(
        &mut self,
        sessions: &SessionTable,
        conn_id: ConnId,
        catalog: &PriceCatalog,
        asset_id: &str,
        invest: Decimal,
    ) -> Result<(), WalletError> {
        let username = sessions.resolve(conn_id).ok_or(WalletError::NotLoggedIn)?;
        let user = self
            .users
            .get_mut(username)
            .ok_or(WalletError::NotLoggedIn)?;
        if invest > user.cash() {
            return Err(WalletError::InsufficientFunds);
        }
        let quote = catalog.get(asset_id).ok_or(WalletError::UnknownAsset)?;

        user.buy(quote, invest)?;
        tracing::info!(conn_id, username, asset_id, %invest, "position bought");
        Ok(())
    }

    /// Close the caller's whole position in `asset_id` at the current
    /// catalog price. No state is mutated when the sale is invalid.
    pub fn sell(
        &mut self,
        sessions: &SessionTable,
        conn_id: ConnId,
        catalog: &PriceCatalog,
        asset_id: &str,
    ) -> Result<ClosedPosition, WalletError> {
        let username = sessions.resolve(conn_id).ok_or(WalletError::NotLoggedIn)?;
        let quote = catalog.get(asset_id).ok_or(WalletError::UnknownAsset)?;

        let user = self
            .users
            .get_mut(username)
            .ok_or(WalletError::NotLoggedIn)?;
        let closed = user.sell(asset_id, quote.price)?;
        tracing::info!(conn_id, username, asset_id, profit = %closed.profit, "position sold");
        Ok(closed)
    }

    /// Cash plus open positions. No price lookup, no mutation.
    pub fn summary(&self, sessions: &SessionTable, conn_id: ConnId) -> Result<&User, WalletError> {
        self.session_user(sessions, conn_id)
    }

    /// Open positions marked to market plus realized profit from closed
    /// positions. Positions whose asset is no longer quoted are skipped
    /// from the detail and excluded from the total.
    pub fn overall_summary(
        &self,
        sessions: &SessionTable,
        conn_id: ConnId,
        catalog: &PriceCatalog,
    ) -> Result<OverallSummary, WalletError> {
        let user = self.session_user(sessions, conn_id)?;

        let mut overall_profit = Decimal::ZERO;
        let mut open = Vec::new();
        for position in user.open_positions().values() {
            let Some(quote) = catalog.get(&position.asset_id) else {
                tracing::debug!(
                    asset_id = %position.asset_id,
                    "asset no longer quoted, skipped from summary"
                );
                continue;
            };
            let market_value = quote.price * position.quantity;
            let profit = market_value - position.cost_basis;
            overall_profit += profit;
            open.push(MarkedPosition {
                asset_id: position.asset_id.clone(),
                name: quote.name.clone(),
                cost_basis: position.cost_basis,
                market_value,
                profit,
            });
        }

        for closed in user.closed_positions() {
            overall_profit += closed.profit;
        }

        Ok(OverallSummary {
            open,
            closed: user.closed_positions().to_vec(),
            overall_profit,
        })
    }

    /// Unbind the session and persist the full user set. This is the only
    /// write-through point besides registration.
    pub fn disconnect(
        &mut self,
        sessions: &mut SessionTable,
        conn_id: ConnId,
    ) -> Result<(), WalletError> {
        if sessions.resolve(conn_id).is_none() {
            return Err(WalletError::NotLoggedIn);
        }
        let username = sessions.unbind(conn_id);
        tracing::info!(conn_id, username = username.as_deref(), "user disconnected");

        self.persist_users();
        Ok(())
    }

    /// Fails with `NotLoggedIn` when the connection has no bound user.
    /// Used by the dispatcher to order the login check before a refresh.
    pub fn ensure_session(
        &self,
        sessions: &SessionTable,
        conn_id: ConnId,
    ) -> Result<(), WalletError> {
        self.session_user(sessions, conn_id).map(|_| ())
    }

    /// Write the user set through the repository. Persistence failures are
    /// logged, not propagated: the in-memory ledger stays authoritative.
    pub fn persist_users(&self) {
        let mut users: Vec<User> = self.users.values().cloned().collect();
        users.sort_by(|a, b| a.username().cmp(b.username()));
        if let Err(error) = self.repository.save_users(&users) {
            tracing::warn!(%error, "failed to persist users");
        }
    }

    fn session_user(&self, sessions: &SessionTable, conn_id: ConnId) -> Result<&User, WalletError> {
        let username = sessions.resolve(conn_id).ok_or(WalletError::NotLoggedIn)?;
        self.users.get(username).ok_or(WalletError::NotLoggedIn)
    }

    fn session_user_mut(
        &mut self,
        sessions: &SessionTable,
        conn_id: ConnId,
    ) -> Result<&mut User, WalletError> {
        let username = sessions.resolve(conn_id).ok_or(WalletError::NotLoggedIn)?;
        self.users.get_mut(username).ok_or(WalletError::NotLoggedIn)
    }
}

/// MD5 hex digest. Deliberately simple: the password check is a plain hash
/// comparison, not a security mechanism.
fn hash_password(password: &str) -> String {
    format!("{:x}", md5::compute(password.as_bytes()))
}
