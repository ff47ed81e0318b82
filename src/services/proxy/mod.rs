// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Browser-facing JSON-RPC proxy. `/api/rpc` forwards over HTTP,
//! `/api/rpc-ws` over the shared WebSocket upstream.

pub mod envelope;
pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use envelope::{UpstreamError, error_envelope, request_id};
use http::HttpUpstream;
use ws::WsUpstream;

pub use crate::domain::constants::{JSONRPC_PARSE_ERROR, JSONRPC_PROXY_ERROR};

#[derive(Clone, Default)]
pub struct ProxyState {
    pub http: Option<HttpUpstream>,
    pub ws: Option<Arc<WsUpstream>>,
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/rpc", post(rpc_http))
        .route("/api/rpc-ws", post(rpc_ws))
        .route("/health", get(health))
        .with_state(state)
}

fn parse_body(body: &Bytes) -> Result<Value, Value> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "proxy", error = %e, "Unparseable request body");
        error_envelope(Value::Null, JSONRPC_PARSE_ERROR, "Parse error")
    })
}

fn upstream_failure(route: &'static str, id: Value, err: UpstreamError) -> Json<Value> {
    match err.detail() {
        Some(detail) => {
            tracing::warn!(target: "proxy", route, error = %err, detail, "Upstream call failed")
        }
        None => tracing::warn!(target: "proxy", route, error = %err, "Upstream call failed"),
    }
    Json(error_envelope(id, JSONRPC_PROXY_ERROR, err.to_string()))
}

async fn rpc_http(State(state): State<ProxyState>, body: Bytes) -> Json<Value> {
    let request = match parse_body(&body) {
        Ok(v) => v,
        Err(envelope) => return Json(envelope),
    };
    let id = request_id(&request);
    let Some(upstream) = state.http.as_ref() else {
        return upstream_failure("http", id, UpstreamError::NotConfigured);
    };
    match upstream.forward(&request).await {
        Ok(reply) => Json(reply),
        Err(e) => upstream_failure("http", id, e),
    }
}

async fn rpc_ws(State(state): State<ProxyState>, body: Bytes) -> Json<Value> {
    let request = match parse_body(&body) {
        Ok(v) => v,
        Err(envelope) => return Json(envelope),
    };
    let id = request_id(&request);
    let Some(upstream) = state.ws.as_ref() else {
        return upstream_failure("ws", id, UpstreamError::NotConfigured);
    };
    match upstream.request(request).await {
        Ok(reply) => Json(reply),
        Err(e) => upstream_failure("ws", id, e),
    }
}

async fn health(State(state): State<ProxyState>) -> Json<Value> {
    let ws_connected = state.ws.as_ref().map(|ws| ws.is_connected());
    Json(json!({
        "status": "ok",
        "http_upstream": state.http.as_ref().map(|h| h.url().to_string()),
        "ws_upstream": state.ws.as_ref().map(|w| w.url().to_string()),
        "ws_connected": ws_connected,
    }))
}
