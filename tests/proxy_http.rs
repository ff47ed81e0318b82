use std::net::SocketAddr;
use std::time::Duration;

use axum::routing::post;
use axum::{Json, Router};
use lending_bots::services::proxy::http::HttpUpstream;
use lending_bots::services::proxy::{
    JSONRPC_PARSE_ERROR, JSONRPC_PROXY_ERROR, ProxyState, router,
};
use serde_json::{Value, json};

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

/// Node stand-in: answers every call with the chain id, `/slow` after 2s.
async fn fake_node() -> SocketAddr {
    async fn answer(Json(req): Json<Value>) -> Json<Value> {
        Json(json!({"jsonrpc": "2.0", "id": req["id"], "result": "0x7a69"}))
    }
    async fn slow(body: Json<Value>) -> Json<Value> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        answer(body).await
    }
    serve(Router::new().route("/", post(answer)).route("/slow", post(slow))).await
}

async fn proxy_for(upstream: &str) -> SocketAddr {
    let http = HttpUpstream::new(upstream, Duration::from_millis(300)).expect("upstream");
    serve(router(ProxyState {
        http: Some(http),
        ws: None,
    }))
    .await
}

async fn post_raw(proxy: SocketAddr, path: &str, body: impl Into<reqwest::Body>) -> Value {
    reqwest::Client::new()
        .post(format!("http://{proxy}{path}"))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("proxy request")
        .json()
        .await
        .expect("proxy response decode")
}

fn chain_id_call(id: Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "method": "eth_chainId", "params": []}).to_string()
}

#[tokio::test]
async fn forwards_and_returns_upstream_json_verbatim() {
    let node = fake_node().await;
    let proxy = proxy_for(&format!("http://{node}/")).await;
    let reply = post_raw(proxy, "/api/rpc", chain_id_call(json!(42))).await;
    assert_eq!(reply, json!({"jsonrpc": "2.0", "id": 42, "result": "0x7a69"}));
}

#[tokio::test]
async fn slow_upstream_yields_proxy_error_with_request_id() {
    let node = fake_node().await;
    let proxy = proxy_for(&format!("http://{node}/slow")).await;
    let reply = post_raw(proxy, "/api/rpc", chain_id_call(json!("abc"))).await;
    assert_eq!(reply["id"], json!("abc"));
    assert_eq!(reply["error"]["code"], JSONRPC_PROXY_ERROR);
    assert_eq!(reply["error"]["message"], "upstream request timed out");
}

#[tokio::test]
async fn unreachable_upstream_hides_transport_detail() {
    let dead = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local addr")
    };
    let proxy = proxy_for(&format!("http://{dead}/")).await;
    let reply = post_raw(proxy, "/api/rpc", chain_id_call(json!(7))).await;
    assert_eq!(reply["id"], 7);
    assert_eq!(reply["error"]["code"], JSONRPC_PROXY_ERROR);
    assert_eq!(reply["error"]["message"], "upstream unavailable");
}

#[tokio::test]
async fn unparseable_body_is_a_parse_error_with_null_id() {
    let node = fake_node().await;
    let proxy = proxy_for(&format!("http://{node}/")).await;
    let reply = post_raw(proxy, "/api/rpc", "{\"jsonrpc\": \"2.0\", \"id\": ").await;
    assert_eq!(reply["id"], Value::Null);
    assert_eq!(reply["error"]["code"], JSONRPC_PARSE_ERROR);
}

#[tokio::test]
async fn ws_route_without_upstream_is_a_proxy_error() {
    let node = fake_node().await;
    let proxy = proxy_for(&format!("http://{node}/")).await;
    let reply = post_raw(proxy, "/api/rpc-ws", chain_id_call(json!(3))).await;
    assert_eq!(reply["id"], 3);
    assert_eq!(reply["error"]["code"], JSONRPC_PROXY_ERROR);
}

#[tokio::test]
async fn health_reports_configured_upstreams() {
    let node = fake_node().await;
    let proxy = proxy_for(&format!("http://{node}/")).await;
    let health: Value = reqwest::get(format!("http://{proxy}/health"))
        .await
        .expect("health request")
        .json()
        .await
        .expect("health decode");
    assert_eq!(health["status"], "ok");
    assert_eq!(health["http_upstream"], format!("http://{node}/"));
    assert_eq!(health["ws_upstream"], Value::Null);
}
