// SPDX-License-Identifier: MIT

//! Local IPC listener (spec §6.2): newline-delimited JSON over a Unix
//! socket. Mirrors the teacher's accept-and-spawn listener shape (one task
//! per connection, moving only bytes) but with line framing instead of the
//! teacher's 4-byte length-prefixed protocol, and a persistent
//! request/response loop per connection rather than one-shot.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// One IPC line handed to the orchestrator, with the channel its response
/// line is written back through.
#[derive(Debug)]
pub struct IpcInbound {
    pub line: String,
    pub respond: oneshot::Sender<String>,
}

pub async fn serve_ipc(listener: UnixListener, inbound_tx: mpsc::Sender<IpcInbound>) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let inbound_tx = inbound_tx.clone();
                tokio::spawn(async move {
                    handle_connection(stream, inbound_tx).await;
                });
            }
            Err(e) => warn!(error = %e, "ipc: accept error"),
        }
    }
}

async fn handle_connection(stream: tokio::net::UnixStream, inbound_tx: mpsc::Sender<IpcInbound>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) if !line.trim().is_empty() => line,
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "ipc: read error");
                break;
            }
        };

        let (respond, rx) = oneshot::channel();
        if inbound_tx.send(IpcInbound { line, respond }).await.is_err() {
            break;
        }
        let Ok(response_line) = rx.await else { break };
        if write_half.write_all(response_line.as_bytes()).await.is_err() {
            break;
        }
        if write_half.write_all(b"\n").await.is_err() {
            break;
        }
    }
}
