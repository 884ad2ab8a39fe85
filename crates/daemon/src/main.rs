// SPDX-License-Identifier: MIT

//! `rdtd`: the agent-react-devtools daemon binary.

use std::path::PathBuf;

use clap::Parser;
use rdt_bridge::serve as serve_bridge;
use rdt_daemon::{cleanup, env, recover_stale_state, serve_ipc, DaemonError, DaemonInfo, Orchestrator, StateDir};
use tokio::net::{TcpListener, UnixListener};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Bridges React DevTools "Wall" WebSocket runtimes to local IPC clients.
#[derive(Debug, Parser)]
#[command(name = "rdtd")]
struct Args {
    /// WebSocket listen port (spec §6.4).
    #[arg(long)]
    port: Option<u16>,
    /// State directory override (spec §6.3/§6.4).
    #[arg(long, value_name = "PATH")]
    state_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();
    let port = args.port.unwrap_or_else(env::port);
    let state_dir = StateDir::new(args.state_dir.unwrap_or_else(env::state_dir));

    if let Err(e) = state_dir.ensure_exists() {
        eprintln!("failed to create state directory: {e}");
        return std::process::ExitCode::FAILURE;
    }

    let _log_guard = init_logging(&state_dir);

    if let Err(e) = recover_stale_state(&state_dir) {
        error!(error = %e, "startup aborted");
        eprintln!("{e}");
        return std::process::ExitCode::FAILURE;
    }

    let tcp_listener = match TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|source| DaemonError::BindFailure { what: format!("websocket port {port}"), source })
    {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "startup aborted");
            return std::process::ExitCode::FAILURE;
        }
    };
    let socket_path = state_dir.socket_path();
    let unix_listener = match UnixListener::bind(&socket_path)
        .map_err(|source| DaemonError::BindFailure { what: format!("socket {}", socket_path.display()), source })
    {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "startup aborted");
            return std::process::ExitCode::FAILURE;
        }
    };

    let info = DaemonInfo {
        pid: std::process::id(),
        port,
        socket_path: socket_path.clone(),
        started_at: std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0),
    };
    if let Err(e) = info.write(&state_dir) {
        error!(error = %e, "failed to write daemon.json");
        return std::process::ExitCode::FAILURE;
    }

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let (bridge_tx, bridge_rx) = tokio::sync::mpsc::channel(256);
    let (ipc_tx, ipc_rx) = tokio::sync::mpsc::channel(256);
    let (internal_tx, internal_rx) = tokio::sync::mpsc::channel(64);

    tokio::spawn(serve_bridge(tcp_listener, bridge_tx));
    tokio::spawn(serve_ipc(unix_listener, ipc_tx));

    info!(port, state_dir = %state_dir.root().display(), "rdtd started");
    let orchestrator = Orchestrator::new(port, internal_tx);
    orchestrator.run(bridge_rx, ipc_rx, internal_rx, shutdown).await;

    cleanup(&state_dir);
    info!("rdtd stopped");
    std::process::ExitCode::SUCCESS
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        shutdown.cancel();
    });
}

fn init_logging(state_dir: &StateDir) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(state_dir.root(), "daemon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_writer(non_blocking).with_env_filter(filter).init();
    guard
}
