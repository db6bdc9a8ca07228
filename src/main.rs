//! coinvault server entry point
//!
//! Wires the collaborators together: JSON file storage, the CoinAPI price
//! source, the wallet core task, and the TCP front-end. Architecture:
//!
//! ```text
//! ┌──────────┐    ┌────────────┐    ┌────────────┐    ┌──────────┐
//! │  Config  │───▶│ TCP server │───▶│ WalletCore │───▶│ Storage  │
//! │  (YAML)  │    │ (per-conn  │    │ (ledger +  │    │ (JSON)   │
//! │          │    │   tasks)   │    │  catalog)  │    │          │
//! └──────────┘    └────────────┘    └────────────┘    └──────────┘
//! ```
//!
//! The process runs until ctrl-c; shutdown is cooperative (stop flag, drain
//! queued commands, persist users) and never force-closes live connections.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;

use coinvault::catalog::PriceCatalog;
use coinvault::config::AppConfig;
use coinvault::dispatcher::Dispatcher;
use coinvault::ledger::Ledger;
use coinvault::price_source::{CoinApiSource, PriceSource};
use coinvault::repository::{JsonFileRepository, Repository};
use coinvault::server::run_server;
use coinvault::wallet_core::WalletCore;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env = get_env();
    let config = AppConfig::load(&env);
    let _log_guard = coinvault::logging::init_logging(&config);

    tracing::info!("Starting coinvault wallet server in {} mode", env);

    let repository: Arc<dyn Repository> =
        Arc::new(JsonFileRepository::new(&config.storage.data_dir));

    let api_key = std::env::var(&config.price_source.api_key_env).unwrap_or_default();
    if api_key.is_empty() {
        tracing::warn!(
            var = %config.price_source.api_key_env,
            "price source API key not set, quote refreshes will be rejected upstream"
        );
    }
    let price_source = CoinApiSource::new(config.price_source.base_url.clone(), api_key);

    let users = repository.load_users().context("load users")?;
    tracing::info!(users = users.len(), "user records loaded");

    // No stored snapshot: try one fetch up front, but a dead price source
    // must not keep the server from starting. An empty catalog is stale, so
    // the first price-reading command retries.
    let catalog = match repository.load_catalog().context("load catalog")? {
        Some(catalog) => catalog,
        None => match price_source.fetch().await {
            Ok(catalog) => {
                if let Err(error) = repository.save_catalog(&catalog) {
                    tracing::warn!(%error, "failed to persist catalog snapshot");
                }
                catalog
            }
            Err(error) => {
                tracing::warn!(%error, "initial quote fetch failed, starting with an empty catalog");
                PriceCatalog::empty()
            }
        },
    };
    tracing::info!(quotes = catalog.len(), "price catalog ready");

    let ledger = Ledger::new(users, repository.clone());
    let dispatcher = Dispatcher::new(ledger, catalog, Box::new(price_source), repository);
    let (handle, core) = WalletCore::new(dispatcher);

    let (stop_tx, stop_rx) = watch::channel(false);
    let core_task = tokio::spawn(core.run(stop_rx.clone()));

    let port = get_port_override().unwrap_or(config.server.port);
    let listener = TcpListener::bind((config.server.host.as_str(), port))
        .await
        .with_context(|| format!("bind {}:{}", config.server.host, port))?;
    tracing::info!(host = %config.server.host, port, "listening");

    let server_task = tokio::spawn(run_server(listener, handle, stop_rx));

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    tracing::info!("shutdown requested");
    let _ = stop_tx.send(true);

    server_task.await?;
    core_task.await?;
    Ok(())
}
