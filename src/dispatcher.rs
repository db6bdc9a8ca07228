//! Command dispatcher
//!
//! Validates argument count and shape per verb, invokes the ledger through
//! the caller's session, and renders every outcome as one response line.
//! Validation failures never reach the ledger; domain failures are rendered
//! from their error messages and keep the connection open.
//!
//! The dispatcher also owns the catalog refresh policy: `list_offerings`,
//! `sell` and `get_wallet_overall_summary` refresh a stale catalog before
//! reading prices; `buy` deliberately uses the catalog as-is.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::catalog::PriceCatalog;
use crate::command::{Command, CommandVerb};
use crate::core_types::ConnId;
use crate::error::WalletError;
use crate::ledger::{Ledger, OverallSummary};
use crate::price_source::PriceSource;
use crate::repository::Repository;
use crate::session::SessionTable;
use crate::user::User;

/// Literal both ends of the wire recognize: the server closes the socket
/// right after writing it, the client exits on reading it.
pub const DISCONNECT_SENTINEL: &str = "User saved and disconnected successfully";

const MSG_REGISTERED: &str = "User is registered successfully";
const MSG_LOGGED_IN: &str = "User logged in successfully";
const MSG_DEPOSITED: &str = "User's deposit was successful";

/// Separator between rendered tuples; the interactive client expands single
/// spaces to line breaks, so a double space marks a tuple boundary.
const TUPLE_SEP: &str = "  ";

pub struct Dispatcher {
    ledger: Ledger,
    sessions: SessionTable,
    catalog: PriceCatalog,
    price_source: Box<dyn PriceSource>,
    repository: Arc<dyn Repository>,
}

impl Dispatcher {
    pub fn new(
        ledger: Ledger,
        catalog: PriceCatalog,
        price_source: Box<dyn PriceSource>,
        repository: Arc<dyn Repository>,
    ) -> Self {
        Self {
            ledger,
            sessions: SessionTable::new(),
            catalog,
            price_source,
            repository,
        }
    }

    /// Execute one command line for one connection. Always produces a
    /// response line; failures render as their message.
    pub async fn execute(&mut self, conn_id: ConnId, line: &str) -> String {
        match self.dispatch(conn_id, line).await {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(conn_id, %error, "command failed");
                error.to_string()
            }
        }
    }

    /// The connection went away without a disconnect command: drop its
    /// session, nothing is persisted and no response is sent.
    pub fn hangup(&mut self, conn_id: ConnId) {
        if let Some(username) = self.sessions.unbind(conn_id) {
            tracing::info!(conn_id, username, "session dropped on hangup");
        }
    }

    /// Final write-through on shutdown.
    pub fn persist_users(&self) {
        self.ledger.persist_users();
    }

    async fn dispatch(&mut self, conn_id: ConnId, line: &str) -> Result<String, WalletError> {
        let command = Command::parse(line)?;
        match command.verb {
            CommandVerb::Register => {
                let [username, password] = expect_args::<2>(&command.args)?;
                self.ledger.register(username, password)?;
                Ok(MSG_REGISTERED.to_string())
            }
            CommandVerb::Login => {
                let [username, password] = expect_args::<2>(&command.args)?;
                self.ledger
                    .login(&mut self.sessions, conn_id, username, password)?;
                Ok(MSG_LOGGED_IN.to_string())
            }
            CommandVerb::DepositMoney => {
                let [raw_amount] = expect_args::<1>(&command.args)?;
                let amount = parse_amount(raw_amount)?;
                if amount <= Decimal::ZERO {
                    return Err(WalletError::NonPositiveDeposit);
                }
                self.ledger.deposit(&self.sessions, conn_id, amount)?;
                Ok(MSG_DEPOSITED.to_string())
            }
            CommandVerb::ListOfferings => {
                expect_args::<0>(&command.args)?;
                self.refresh_catalog_if_stale().await?;
                Ok(render_offerings(&self.catalog))
            }
            CommandVerb::Buy => {
                let [asset_id, raw_amount] = expect_args::<2>(&command.args)?;
                let invest = parse_amount(raw_amount)?;
                if invest <= Decimal::ZERO {
                    return Err(WalletError::InvalidInput);
                }
                // Buys take the catalog as-is, without a refresh.
                self.ledger
                    .buy(&self.sessions, conn_id, &self.catalog, asset_id, invest)?;
                Ok(format!("You successfully bought {asset_id}"))
            }
            CommandVerb::Sell => {
                let [asset_id] = expect_args::<1>(&command.args)?;
                // Login is checked before the refresh so an anonymous sell
                // never costs a price fetch.
                self.ledger.ensure_session(&self.sessions, conn_id)?;
                self.refresh_catalog_if_stale().await?;
                self.ledger
                    .sell(&self.sessions, conn_id, &self.catalog, asset_id)?;
                Ok(format!("You successfully sold {asset_id}"))
            }
            CommandVerb::WalletSummary => {
                expect_args::<0>(&command.args)?;
                let user = self.ledger.summary(&self.sessions, conn_id)?;
                Ok(render_summary(user))
            }
            CommandVerb::WalletOverallSummary => {
                expect_args::<0>(&command.args)?;
                self.ledger.ensure_session(&self.sessions, conn_id)?;
                self.refresh_catalog_if_stale().await?;
                let summary =
                    self.ledger
                        .overall_summary(&self.sessions, conn_id, &self.catalog)?;
                Ok(render_overall_summary(&summary))
            }
            CommandVerb::Disconnect => {
                expect_args::<0>(&command.args)?;
                self.ledger.disconnect(&mut self.sessions, conn_id)?;
                Ok(DISCONNECT_SENTINEL.to_string())
            }
        }
    }

    /// Lazy refresh: quotes older than the freshness window are not served
    /// without an attempted fetch. A failed fetch fails this request only
    /// and leaves the stale catalog in place.
    async fn refresh_catalog_if_stale(&mut self) -> Result<(), WalletError> {
        if !self.catalog.is_stale() {
            return Ok(());
        }
        tracing::info!("price catalog is stale, refreshing");
        let catalog = self.price_source.fetch().await?;
        if let Err(error) = self.repository.save_catalog(&catalog) {
            tracing::warn!(%error, "failed to persist catalog snapshot");
        }
        self.catalog = catalog;
        Ok(())
    }
}

/// Exactly `N` arguments, or `InvalidInput`.
fn expect_args<const N: usize>(args: &[String]) -> Result<&[String; N], WalletError> {
    <&[String; N]>::try_from(args).map_err(|_| WalletError::InvalidInput)
}

fn parse_amount(raw: &str) -> Result<Decimal, WalletError> {
    raw.parse::<Decimal>().map_err(|_| WalletError::InvalidInput)
}

fn render_offerings(catalog: &PriceCatalog) -> String {
    let entries: Vec<String> = catalog
        .iter()
        .map(|q| format!("ID:{} Name:{} Price:{}", q.asset_id, q.name, q.price))
        .collect();
    entries.join(TUPLE_SEP)
}

fn render_summary(user: &User) -> String {
    let mut parts = vec![format!("Money:{}", user.cash()), "ActiveInvestments:".to_string()];
    parts.extend(user.open_positions().values().map(|p| {
        format!(
            "ID:{} Name:{} boughtPrice:{} boughtCount:{}",
            p.asset_id, p.name, p.cost_basis, p.quantity
        )
    }));
    parts.join(TUPLE_SEP)
}

fn render_overall_summary(summary: &OverallSummary) -> String {
    let mut parts = vec!["ActiveInvestments:".to_string()];
    parts.extend(summary.open.iter().map(|p| {
        format!(
            "ID:{} Name:{} boughtPrice:{} currentValue:{} currentProfit:{}",
            p.asset_id, p.name, p.cost_basis, p.market_value, p.profit
        )
    }));
    parts.push("FinishedInvestments:".to_string());
    parts.extend(summary.closed.iter().map(|p| {
        format!("ID:{} Name:{} currentProfit:{}", p.asset_id, p.name, p.profit)
    }));
    parts.push(format!("overallProfit:{}", summary.overall_profit));
    parts.join(TUPLE_SEP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AssetQuote;
    use crate::price_source::PriceSourceError;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullRepository;

    impl Repository for NullRepository {
        fn load_users(&self) -> anyhow::Result<Vec<User>> {
            Ok(Vec::new())
        }
        fn save_users(&self, _users: &[User]) -> anyhow::Result<()> {
            Ok(())
        }
        fn load_catalog(&self) -> anyhow::Result<Option<PriceCatalog>> {
            Ok(None)
        }
        fn save_catalog(&self, _catalog: &PriceCatalog) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Counts fetches and serves a fixed quote set, stamped `age_minutes`
    /// in the past so tests can simulate an elapsing freshness window.
    struct CountingSource {
        calls: Arc<AtomicUsize>,
        age_minutes: i64,
    }

    #[async_trait]
    impl PriceSource for CountingSource {
        async fn fetch(&self) -> Result<PriceCatalog, PriceSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PriceCatalog::new(
                quotes(),
                Utc::now() - chrono::Duration::minutes(self.age_minutes),
            ))
        }
    }

    fn quotes() -> Vec<AssetQuote> {
        vec![
            AssetQuote {
                asset_id: "BTC".into(),
                name: "Bitcoin".into(),
                price: dec!(20253.00),
            },
            AssetQuote {
                asset_id: "ETH".into(),
                name: "Ethereum".into(),
                price: dec!(1500),
            },
        ]
    }

    fn dispatcher_with_source(source: Box<dyn PriceSource>, catalog: PriceCatalog) -> Dispatcher {
        let repository: Arc<dyn Repository> = Arc::new(NullRepository);
        let ledger = Ledger::new(Vec::new(), repository.clone());
        Dispatcher::new(ledger, catalog, source, repository)
    }

    fn fresh_dispatcher() -> Dispatcher {
        let source = CountingSource {
            calls: Arc::new(AtomicUsize::new(0)),
            age_minutes: 0,
        };
        dispatcher_with_source(Box::new(source), PriceCatalog::new(quotes(), Utc::now()))
    }

    async fn login(dispatcher: &mut Dispatcher, conn_id: ConnId) {
        assert_eq!(
            dispatcher.execute(conn_id, "register alice secret").await,
            MSG_REGISTERED
        );
        assert_eq!(
            dispatcher.execute(conn_id, "login alice secret").await,
            MSG_LOGGED_IN
        );
    }

    #[tokio::test]
    async fn test_unknown_verb_and_bad_arity_render_distinct_messages() {
        let mut dispatcher = fresh_dispatcher();
        assert_eq!(
            dispatcher.execute(1, "withdraw 50").await,
            WalletError::UnknownCommand.to_string()
        );
        assert_eq!(
            dispatcher.execute(1, "register alice").await,
            WalletError::InvalidInput.to_string()
        );
        assert_eq!(
            dispatcher.execute(1, "list_offerings now").await,
            WalletError::InvalidInput.to_string()
        );
    }

    #[tokio::test]
    async fn test_deposit_validation() {
        let mut dispatcher = fresh_dispatcher();
        login(&mut dispatcher, 1).await;

        assert_eq!(
            dispatcher.execute(1, "deposit_money -5").await,
            WalletError::NonPositiveDeposit.to_string()
        );
        assert_eq!(
            dispatcher.execute(1, "deposit_money 0").await,
            WalletError::NonPositiveDeposit.to_string()
        );
        assert_eq!(
            dispatcher.execute(1, "deposit_money ten").await,
            WalletError::InvalidInput.to_string()
        );
        assert_eq!(dispatcher.execute(1, "deposit_money 1500").await, MSG_DEPOSITED);
    }

    #[tokio::test]
    async fn test_full_buy_sell_flow() {
        let mut dispatcher = fresh_dispatcher();
        login(&mut dispatcher, 1).await;

        dispatcher.execute(1, "deposit_money 1500").await;
        assert_eq!(
            dispatcher.execute(1, "buy BTC 1250").await,
            "You successfully bought BTC"
        );

        let summary = dispatcher.execute(1, "get_wallet_summary").await;
        assert!(summary.starts_with("Money:250"));
        assert!(summary.contains("ID:BTC Name:Bitcoin boughtPrice:1250"));

        assert_eq!(
            dispatcher.execute(1, "sell BTC").await,
            "You successfully sold BTC"
        );
        let summary = dispatcher.execute(1, "get_wallet_summary").await;
        assert!(!summary.contains("ID:BTC"));

        let overall = dispatcher.execute(1, "get_wallet_overall_summary").await;
        assert!(overall.contains("FinishedInvestments:"));
        assert!(overall.contains("ID:BTC"));
        assert!(overall.contains("overallProfit:"));
    }

    #[tokio::test]
    async fn test_offerings_listing_is_a_set_of_quotes() {
        let mut dispatcher = fresh_dispatcher();
        let listing = dispatcher.execute(1, "list_offerings").await;
        // No ordering guarantee; both quotes must be present.
        assert!(listing.contains("ID:BTC Name:Bitcoin Price:20253.00"));
        assert!(listing.contains("ID:ETH Name:Ethereum Price:1500"));
    }

    #[tokio::test]
    async fn test_disconnect_returns_sentinel_and_unbinds() {
        let mut dispatcher = fresh_dispatcher();
        login(&mut dispatcher, 1).await;

        assert_eq!(dispatcher.execute(1, "disconnect").await, DISCONNECT_SENTINEL);
        assert_eq!(
            dispatcher.execute(1, "deposit_money 10").await,
            WalletError::NotLoggedIn.to_string()
        );
    }

    #[tokio::test]
    async fn test_refresh_happens_once_within_freshness_window() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            calls: calls.clone(),
            age_minutes: 0,
        };
        // Start stale: the first listing must fetch.
        let mut dispatcher = dispatcher_with_source(Box::new(source), PriceCatalog::empty());

        dispatcher.execute(1, "list_offerings").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Within the window: no second fetch.
        dispatcher.execute(1, "list_offerings").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_happens_again_after_window_elapses() {
        let calls = Arc::new(AtomicUsize::new(0));
        // Every fetched snapshot is already older than the window, which
        // simulates the window elapsing between commands.
        let source = CountingSource {
            calls: calls.clone(),
            age_minutes: 31,
        };
        let mut dispatcher = dispatcher_with_source(Box::new(source), PriceCatalog::empty());

        dispatcher.execute(1, "list_offerings").await;
        dispatcher.execute(1, "list_offerings").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_buy_does_not_refresh_a_stale_catalog() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            calls: calls.clone(),
            age_minutes: 0,
        };
        // Stale catalog that still carries a BTC quote.
        let stale = PriceCatalog::new(quotes(), Utc::now() - chrono::Duration::minutes(45));
        let mut dispatcher = dispatcher_with_source(Box::new(source), stale);
        login(&mut dispatcher, 1).await;
        dispatcher.execute(1, "deposit_money 1500").await;

        assert_eq!(
            dispatcher.execute(1, "buy BTC 1250").await,
            "You successfully bought BTC"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_anonymous_sell_does_not_trigger_refresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            calls: calls.clone(),
            age_minutes: 0,
        };
        let mut dispatcher = dispatcher_with_source(Box::new(source), PriceCatalog::empty());

        assert_eq!(
            dispatcher.execute(1, "sell BTC").await,
            WalletError::NotLoggedIn.to_string()
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_price_source_failure_fails_the_request_only() {
        struct FailingSource;

        #[async_trait]
        impl PriceSource for FailingSource {
            async fn fetch(&self) -> Result<PriceCatalog, PriceSourceError> {
                Err(PriceSourceError::RateLimited)
            }
        }

        let mut dispatcher =
            dispatcher_with_source(Box::new(FailingSource), PriceCatalog::empty());
        assert_eq!(
            dispatcher.execute(1, "list_offerings").await,
            PriceSourceError::RateLimited.to_string()
        );
        // The dispatcher keeps serving afterwards.
        assert_eq!(
            dispatcher.execute(1, "register alice secret").await,
            MSG_REGISTERED
        );
    }
}
