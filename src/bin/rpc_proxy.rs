// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use lending_bots::app::logging::setup_logging;
use lending_bots::domain::constants::{DEFAULT_WS_REQUEST_TIMEOUT_MS, HTTP_PROXY_TIMEOUT_MS};
use lending_bots::domain::error::AppError;
use lending_bots::services::proxy::http::HttpUpstream;
use lending_bots::services::proxy::ws::WsUpstream;
use lending_bots::services::proxy::{ProxyState, router};

#[derive(Parser, Debug)]
#[command(author, version, about = "JSON-RPC proxy for the lending UI")]
struct Cli {
    #[arg(long, env = "PROXY_BIND", default_value = "127.0.0.1:8645")]
    bind: SocketAddr,

    #[arg(long, env = "RPC_URL")]
    http_upstream: Option<String>,

    #[arg(long, env = "WS_RPC_URL")]
    ws_upstream: Option<String>,

    /// Per-request timeout for the WebSocket upstream; HTTP is fixed at 5s
    #[arg(long, env = "PROXY_REQUEST_TIMEOUT_MS", default_value_t = DEFAULT_WS_REQUEST_TIMEOUT_MS)]
    request_timeout_ms: u64,

    #[arg(long, env = "DEBUG", default_value_t = false)]
    debug: bool,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "proxy", error = %e, "Ctrl-C handler failed");
    }
    tracing::info!(target: "proxy", "Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = setup_logging(if cli.debug { "debug" } else { "info" }, false, None, "rpc-proxy");

    let http = match cli.http_upstream.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(url) => Some(HttpUpstream::new(url, Duration::from_millis(HTTP_PROXY_TIMEOUT_MS))?),
        None => None,
    };
    let ws = cli
        .ws_upstream
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|url| Arc::new(WsUpstream::new(url, Duration::from_millis(cli.request_timeout_ms))));
    if http.is_none() && ws.is_none() {
        return Err(AppError::Config(
            "set --http-upstream and/or --ws-upstream".to_string(),
        ));
    }
    if let Some(ws) = ws.as_ref()
        && let Err(e) = ws.open().await
    {
        // Not fatal: the first /api/rpc-ws request dials again.
        tracing::warn!(target: "proxy", url = %ws.url(), error = %e, detail = e.detail().unwrap_or(""), "WebSocket upstream not reachable yet");
    }

    let state = ProxyState {
        http,
        ws: ws.clone(),
    };
    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .map_err(|e| AppError::Initialization(format!("bind {}: {e}", cli.bind)))?;
    tracing::info!(
        target: "proxy",
        bind = %cli.bind,
        http_upstream = state.http.as_ref().map(|h| h.url().as_str()).unwrap_or("-"),
        ws_upstream = state.ws.as_ref().map(|w| w.url()).unwrap_or("-"),
        "RPC proxy listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Connection(format!("proxy server: {e}")))?;

    if let Some(ws) = ws {
        ws.close().await;
    }
    Ok(())
}
