use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use lending_bots::services::proxy::envelope::UpstreamError;
use lending_bots::services::proxy::ws::WsUpstream;
use lending_bots::services::proxy::{JSONRPC_PROXY_ERROR, ProxyState, router};
use serde_json::{Value, json};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Node stand-in. Replies with the method name as the result, except
/// `hang` (never answered) and `drop` (connection cut without reply).
async fn fake_ws_node() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    let Message::Text(text) = msg else { continue };
                    let req: Value = serde_json::from_str(text.as_str()).expect("request json");
                    match req["method"].as_str() {
                        Some("hang") => continue,
                        Some("drop") => return,
                        method => {
                            let reply = json!({"jsonrpc": "2.0", "id": req["id"], "result": method});
                            if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            });
        }
    });
    (addr, connections)
}

fn call(id: Value, method: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": []})
}

#[tokio::test]
async fn original_id_is_restored_on_reply() {
    let (node, _) = fake_ws_node().await;
    let ws = WsUpstream::new(format!("ws://{node}"), Duration::from_secs(2));
    ws.open().await.expect("open");

    let (a, b) = tokio::join!(
        ws.request(call(json!("same"), "eth_chainId")),
        ws.request(call(json!("same"), "eth_blockNumber")),
    );
    let (a, b) = (a.expect("a"), b.expect("b"));
    assert_eq!(a["id"], "same");
    assert_eq!(a["result"], "eth_chainId");
    assert_eq!(b["id"], "same");
    assert_eq!(b["result"], "eth_blockNumber");
}

#[tokio::test]
async fn timed_out_request_does_not_poison_the_connection() {
    let (node, connections) = fake_ws_node().await;
    let ws = WsUpstream::new(format!("ws://{node}"), Duration::from_millis(200));

    let err = ws.request(call(json!(1), "hang")).await.unwrap_err();
    assert_eq!(err, UpstreamError::Timeout);

    let ok = ws.request(call(json!(2), "eth_chainId")).await.expect("reply");
    assert_eq!(ok["id"], 2);
    assert_eq!(connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn upstream_drop_rejects_in_flight_and_next_request_reconnects() {
    let (node, connections) = fake_ws_node().await;
    let ws = Arc::new(WsUpstream::new(format!("ws://{node}"), Duration::from_secs(5)));
    ws.open().await.expect("open");

    let waiting = {
        let ws = ws.clone();
        tokio::spawn(async move { ws.request(call(json!(1), "hang")).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let dropped = ws.request(call(json!(2), "drop")).await;
    assert_eq!(dropped.unwrap_err(), UpstreamError::Closed);
    assert_eq!(
        waiting.await.expect("join").unwrap_err(),
        UpstreamError::Closed
    );

    let again = ws.request(call(json!(3), "eth_chainId")).await.expect("reconnected");
    assert_eq!(again["id"], 3);
    assert_eq!(connections.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn close_fails_pending_and_disconnects() {
    let (node, _) = fake_ws_node().await;
    let ws = Arc::new(WsUpstream::new(format!("ws://{node}"), Duration::from_secs(5)));
    ws.open().await.expect("open");
    assert!(ws.is_connected());

    let waiting = {
        let ws = ws.clone();
        tokio::spawn(async move { ws.request(call(json!(9), "hang")).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    ws.close().await;
    assert_eq!(
        waiting.await.expect("join").unwrap_err(),
        UpstreamError::Closed
    );
    assert!(!ws.is_connected());
}

/// Accepts TCP and never speaks, so the WebSocket handshake never completes.
async fn silent_tcp_peer() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr
}

#[tokio::test]
async fn stalled_handshake_is_bounded_by_request_timeout() {
    let peer = silent_tcp_peer().await;
    let ws = Arc::new(WsUpstream::new(format!("ws://{peer}"), Duration::from_millis(200)));

    let stalled = {
        let ws = ws.clone();
        tokio::spawn(async move { ws.request(call(json!(1), "eth_chainId")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    // Status reads do not queue behind the dial.
    assert!(!ws.is_connected());

    let err = tokio::time::timeout(Duration::from_secs(2), stalled)
        .await
        .expect("request should give up on its own")
        .expect("join")
        .unwrap_err();
    assert_eq!(err, UpstreamError::Timeout);

    let open = tokio::time::timeout(Duration::from_secs(2), ws.open())
        .await
        .expect("open should give up on its own");
    assert_eq!(open.unwrap_err(), UpstreamError::Timeout);
}

#[tokio::test]
async fn ws_route_maps_upstream_drop_to_proxy_error() {
    let (node, _) = fake_ws_node().await;
    let ws = Arc::new(WsUpstream::new(format!("ws://{node}"), Duration::from_secs(2)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let proxy = listener.local_addr().expect("local addr");
    let app = router(ProxyState {
        http: None,
        ws: Some(ws),
    });
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let client = reqwest::Client::new();
    let post = |body: Value| {
        let client = client.clone();
        async move {
            client
                .post(format!("http://{proxy}/api/rpc-ws"))
                .json(&body)
                .send()
                .await
                .expect("proxy request")
                .json::<Value>()
                .await
                .expect("proxy response decode")
        }
    };

    let ok = post(call(json!(11), "eth_gasPrice")).await;
    assert_eq!(ok["id"], 11);
    assert_eq!(ok["result"], "eth_gasPrice");

    let failed = post(call(json!(12), "drop")).await;
    assert_eq!(failed["id"], 12);
    assert_eq!(failed["error"]["code"], JSONRPC_PROXY_ERROR);

    let batch = post(json!([call(json!(13), "eth_chainId")])).await;
    assert_eq!(batch["id"], Value::Null);
    assert_eq!(batch["error"]["code"], JSONRPC_PROXY_ERROR);
}
