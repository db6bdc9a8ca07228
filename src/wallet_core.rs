//! Wallet core service
//!
//! The single-threaded core that handles ALL wallet state. One task owns
//! the ledger, the session table and the price catalog, and consumes
//! requests from an mpsc queue, so every read and mutation is naturally
//! serialized - no locks, no double-spend risk.
//!
//! An inline price refresh blocks the queue for the duration of the fetch;
//! this keeps the lazy-staleness contract (quotes older than the freshness
//! window are never served without an attempted refresh) at the cost of
//! head-of-line latency for queued commands.
//!
//! Shutdown is cooperative: when the stop flag flips, the core drains the
//! requests already queued, persists the user set, and exits without
//! severing open connections.

use tokio::sync::{mpsc, watch};

use crate::dispatcher::Dispatcher;
use crate::messages::{WalletHandle, WalletRequest};

/// Requests queued ahead of the core before connection tasks start waiting.
const REQUEST_QUEUE_SIZE: usize = 256;

pub struct WalletCore {
    dispatcher: Dispatcher,
    rx: mpsc::Receiver<WalletRequest>,
}

impl WalletCore {
    /// Build the core and the handle connection tasks use to reach it.
    pub fn new(dispatcher: Dispatcher) -> (WalletHandle, WalletCore) {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_SIZE);
        (WalletHandle::new(tx), WalletCore { dispatcher, rx })
    }

    /// Serve requests until the stop flag flips or every handle is gone.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        tracing::info!("wallet core started");
        loop {
            tokio::select! {
                request = self.rx.recv() => match request {
                    Some(request) => self.handle(request).await,
                    None => break,
                },
                changed = stop.changed() => {
                    // A dropped stop sender counts as a stop request.
                    if changed.is_err() || *stop.borrow() {
                        self.drain().await;
                        break;
                    }
                }
            }
        }
        self.dispatcher.persist_users();
        tracing::info!("wallet core stopped");
    }

    async fn handle(&mut self, request: WalletRequest) {
        match request {
            WalletRequest::Command {
                conn_id,
                line,
                reply,
            } => {
                tracing::debug!(conn_id, line = %line.trim_end(), "executing command");
                let response = self.dispatcher.execute(conn_id, &line).await;
                if reply.send(response).is_err() {
                    // Connection died while the command was queued; the
                    // session is cleaned up by its Hangup message.
                    tracing::debug!(conn_id, "reply receiver gone");
                }
            }
            WalletRequest::Hangup { conn_id } => {
                self.dispatcher.hangup(conn_id);
            }
        }
    }

    /// Serve whatever was already queued at shutdown, then stop accepting.
    async fn drain(&mut self) {
        while let Ok(request) = self.rx.try_recv() {
            self.handle(request).await;
        }
    }
}
