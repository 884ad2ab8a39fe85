// SPDX-License-Identifier: MIT

//! The WebSocket accept loop (spec §4.4, §6.1).
//!
//! Each peer gets its own spawned task that only moves bytes: inbound text
//! frames are forwarded to the orchestrator over `inbound_tx`, and frames
//! the orchestrator wants to send back arrive over a per-connection
//! channel. No tree/profiler/health state is touched here — that single-
//! writer discipline lives entirely in whoever drains `inbound_tx` (spec
//! §5), the same split the IPC listener uses for its own IO tasks.

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

pub type ConnectionId = u64;

/// Sent from a connection task to the orchestrator's inbound channel.
#[derive(Debug)]
pub enum BridgeInbound {
    Connected { id: ConnectionId, outbound: mpsc::UnboundedSender<Message> },
    Frame { id: ConnectionId, text: String },
    Disconnected { id: ConnectionId },
}

/// Accepts connections on `listener` until the process shuts down.
pub async fn serve(listener: TcpListener, inbound_tx: mpsc::Sender<BridgeInbound>) {
    let mut next_id: ConnectionId = 0;
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                next_id += 1;
                let id = next_id;
                let inbound_tx = inbound_tx.clone();
                debug!(%id, %addr, "bridge: peer connecting");
                tokio::spawn(async move {
                    handle_connection(id, stream, inbound_tx).await;
                });
            }
            Err(e) => warn!(error = %e, "bridge: accept error"),
        }
    }
}

async fn handle_connection(id: ConnectionId, stream: TcpStream, inbound_tx: mpsc::Sender<BridgeInbound>) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%id, error = %e, "bridge: websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

    if inbound_tx.send(BridgeInbound::Connected { id, outbound: out_tx }).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if inbound_tx.send(BridgeInbound::Frame { id, text: text.to_string() }).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(%id, error = %e, "bridge: read error");
                        break;
                    }
                    _ => {} // Ping/Pong/Binary — ignore
                }
            }
            outgoing = out_rx.recv() => {
                match outgoing {
                    Some(message) => {
                        if write.send(message).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    let _ = inbound_tx.send(BridgeInbound::Disconnected { id }).await;
}
