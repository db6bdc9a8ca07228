//! TCP front-end
//!
//! Accept loop plus one task per connection. Connection tasks buffer bytes
//! until a newline is seen, so a command split across reads (or several
//! commands pipelined) is handled correctly; each complete line is one
//! command.
//!
//! A read of zero bytes or a transport error means the peer is gone: the
//! connection task reports a hangup and ends, without taking the process or
//! any other connection with it. The listener stops accepting when the stop
//! flag flips; live connections are not forcibly severed.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::core_types::ConnId;
use crate::dispatcher::DISCONNECT_SENTINEL;
use crate::messages::WalletHandle;

/// Per-connection read bound. A line that exceeds this is a protocol
/// violation and closes the connection.
const MAX_LINE_BYTES: u64 = 8 * 1024;

/// Serve connections on an already-bound listener until the stop flag
/// flips. Binding is the caller's job so a bind failure can terminate the
/// process with a real error.
pub async fn run_server(
    listener: TcpListener,
    handle: WalletHandle,
    mut stop: watch::Receiver<bool>,
) {
    let mut next_conn_id: ConnId = 1;
    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    tracing::info!("stop requested, no longer accepting connections");
                    break;
                }
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let conn_id = next_conn_id;
                        next_conn_id += 1;
                        tracing::info!(conn_id, %peer, "client connected");
                        tokio::spawn(handle_connection(stream, conn_id, handle.clone()));
                    }
                    Err(error) => {
                        tracing::warn!(%error, "accept failed");
                    }
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, conn_id: ConnId, handle: WalletHandle) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        match (&mut reader).take(MAX_LINE_BYTES).read_line(&mut line).await {
            Ok(0) => {
                tracing::info!(conn_id, "client closed the connection");
                handle.hangup(conn_id).await;
                return;
            }
            Ok(_) if line.len() as u64 >= MAX_LINE_BYTES && !line.ends_with('\n') => {
                tracing::warn!(conn_id, "command line exceeds the read bound");
                handle.hangup(conn_id).await;
                return;
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(conn_id, %error, "read failed");
                handle.hangup(conn_id).await;
                return;
            }
        }

        let request = line.trim_end_matches(['\r', '\n']);
        let Some(mut response) = handle.execute(conn_id, request).await else {
            // Core shut down underneath us; nothing more to serve.
            tracing::info!(conn_id, "wallet core gone, closing connection");
            return;
        };

        let disconnect = response == DISCONNECT_SENTINEL;
        if !response.ends_with('\n') {
            response.push('\n');
        }
        if let Err(error) = write_half.write_all(response.as_bytes()).await {
            tracing::warn!(conn_id, %error, "write failed");
            handle.hangup(conn_id).await;
            return;
        }

        if disconnect {
            // Session already unbound and persisted by the core.
            tracing::info!(conn_id, "client disconnected");
            return;
        }
    }
}
