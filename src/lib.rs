//! coinvault - Simulated Cryptocurrency Wallet Server
//!
//! A plain-text TCP server: registered users deposit cash, buy and sell
//! simulated cryptocurrency positions against a price catalog, and query
//! profit/loss, one command per line.
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (ConnId)
//! - [`config`] - YAML application configuration
//! - [`error`] - Domain failure taxonomy
//! - [`command`] - Command line parsing (verb + arguments)
//! - [`catalog`] - Asset quotes and the staleness rule
//! - [`price_source`] - External quote provider (CoinAPI implementation)
//! - [`repository`] - Durable user/catalog storage (JSON files)
//! - [`user`] - Accounts, open and closed positions
//! - [`session`] - Connection → authenticated user bindings
//! - [`ledger`] - The wallet state machine (single-threaded authority)
//! - [`dispatcher`] - Per-verb validation, execution, response rendering
//! - [`messages`] - Connection ↔ core request/reply types
//! - [`wallet_core`] - The core service task serializing all mutations
//! - [`server`] - TCP accept loop and per-connection tasks

pub mod catalog;
pub mod command;
pub mod config;
pub mod core_types;
pub mod dispatcher;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod messages;
pub mod price_source;
pub mod repository;
pub mod server;
pub mod session;
pub mod user;
pub mod wallet_core;

// Convenient re-exports at crate root
pub use catalog::{AssetQuote, FRESHNESS_WINDOW_MINUTES, PriceCatalog};
pub use command::{Command, CommandVerb};
pub use core_types::ConnId;
pub use dispatcher::{DISCONNECT_SENTINEL, Dispatcher};
pub use error::WalletError;
pub use ledger::{Ledger, MarkedPosition, OverallSummary};
pub use messages::{WalletHandle, WalletRequest};
pub use price_source::{CoinApiSource, PriceSource, PriceSourceError};
pub use repository::{JsonFileRepository, Repository};
pub use session::SessionTable;
pub use user::{ClosedPosition, OpenPosition, User};
pub use wallet_core::WalletCore;
