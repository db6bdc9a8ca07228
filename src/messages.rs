//! Messages - connection ↔ wallet core communication
//!
//! Connection tasks never touch wallet state; they send requests over a
//! bounded mpsc queue and await the rendered response on a oneshot channel.
//!
//! # Message Flow
//!
//! ```text
//! Connection task → WalletRequest::Command → WalletCore → response line
//! Connection task → WalletRequest::Hangup  → WalletCore (session dropped)
//! ```

use tokio::sync::{mpsc, oneshot};

use crate::core_types::ConnId;

/// One request into the wallet core.
#[derive(Debug)]
pub enum WalletRequest {
    /// One raw command line from a connection. The rendered response is
    /// sent back on `reply`; the receiver may be gone if the connection
    /// died while queued.
    Command {
        conn_id: ConnId,
        line: String,
        reply: oneshot::Sender<String>,
    },
    /// The peer closed the connection (or the read failed): drop the
    /// session, no response.
    Hangup { conn_id: ConnId },
}

/// Cloneable handle used by the server side to reach the wallet core.
#[derive(Clone)]
pub struct WalletHandle {
    tx: mpsc::Sender<WalletRequest>,
}

impl WalletHandle {
    pub(crate) fn new(tx: mpsc::Sender<WalletRequest>) -> Self {
        Self { tx }
    }

    /// Execute one command line; `None` when the core has shut down.
    pub async fn execute(&self, conn_id: ConnId, line: impl Into<String>) -> Option<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = WalletRequest::Command {
            conn_id,
            line: line.into(),
            reply: reply_tx,
        };
        self.tx.send(request).await.ok()?;
        reply_rx.await.ok()
    }

    /// Report a dead connection. Best-effort: ignored when the core has
    /// already shut down.
    pub async fn hangup(&self, conn_id: ConnId) {
        let _ = self.tx.send(WalletRequest::Hangup { conn_id }).await;
    }
}
