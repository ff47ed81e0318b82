// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! One long-lived WebSocket to the node, shared by every proxied request.
//! Requests are re-tagged with a proxy id for correlation; the caller's id is
//! put back on the reply. A dropped connection fails everything in flight and
//! the next request dials again.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::{Instant, timeout_at};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::services::proxy::envelope::{UpstreamError, request_id};

type Reply = Result<Value, UpstreamError>;
type Pending = Arc<DashMap<u64, oneshot::Sender<Reply>>>;

#[derive(Clone)]
struct Connection {
    outbound: mpsc::UnboundedSender<Message>,
    pending: Pending,
    cancel: CancellationToken,
}

impl Connection {
    fn is_alive(&self) -> bool {
        !self.cancel.is_cancelled() && !self.outbound.is_closed()
    }

    /// Send one already re-tagged request and wait for its reply until `deadline`.
    async fn exchange(&self, proxy_id: u64, body: &Value, deadline: Instant) -> Reply {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(proxy_id, tx);
        // The reader cancels before draining `pending`; an entry added after
        // the drain must see the cancel here.
        if self.cancel.is_cancelled() {
            self.pending.remove(&proxy_id);
            return Err(UpstreamError::Closed);
        }
        if self.outbound.send(Message::Text(body.to_string().into())).is_err() {
            self.pending.remove(&proxy_id);
            return Err(UpstreamError::Closed);
        }

        match timeout_at(deadline, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(UpstreamError::Closed),
            Err(_) => {
                self.pending.remove(&proxy_id);
                Err(UpstreamError::Timeout)
            }
        }
    }
}

fn reject_all(pending: &Pending) {
    let ids: Vec<u64> = pending.iter().map(|e| *e.key()).collect();
    for id in ids {
        if let Some((_, tx)) = pending.remove(&id) {
            let _ = tx.send(Err(UpstreamError::Closed));
        }
    }
}

fn route_reply(pending: &Pending, text: &str) {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(target: "proxy_ws", error = %e, "Ignoring non-JSON frame");
            return;
        }
    };
    let Some(id) = value.get("id").and_then(Value::as_u64) else {
        // Subscription notifications carry no id; nothing waits on them.
        return;
    };
    if let Some((_, tx)) = pending.remove(&id) {
        let _ = tx.send(Ok(value));
    }
}

pub struct WsUpstream {
    url: String,
    request_timeout: Duration,
    next_id: AtomicU64,
    /// Current connection. Held only for a clone or a swap, never across an await.
    conn: StdMutex<Option<Connection>>,
    /// Serializes dials so concurrent requests share one new connection.
    dialing: Mutex<()>,
}

impl WsUpstream {
    /// No connection is made until [`open`](Self::open) or the first request.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            request_timeout,
            next_id: AtomicU64::new(1),
            conn: StdMutex::new(None),
            dialing: Mutex::new(()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn live(&self) -> Option<Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .filter(|c| c.is_alive())
            .cloned()
    }

    /// Never waits on an in-progress dial.
    pub fn is_connected(&self) -> bool {
        self.live().is_some()
    }

    /// Dial now instead of on the first request. Bounded by the request timeout.
    pub async fn open(&self) -> Result<(), UpstreamError> {
        self.connect(Instant::now() + self.request_timeout)
            .await
            .map(|_| ())
    }

    /// Close the upstream and fail every in-flight request.
    pub async fn close(&self) {
        let _dialing = self.dialing.lock().await;
        let taken = self.conn.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(conn) = taken {
            conn.cancel.cancel();
            reject_all(&conn.pending);
            tracing::info!(target: "proxy_ws", url = %self.url, "Upstream closed");
        }
    }

    /// Live connection, dialing when there is none. Gives up at `deadline`,
    /// whether still queued behind another dial or mid-handshake.
    async fn connect(&self, deadline: Instant) -> Result<Connection, UpstreamError> {
        if let Some(conn) = self.live() {
            return Ok(conn);
        }
        let attempt = async {
            let _dialing = self.dialing.lock().await;
            // Someone else may have finished dialing while we queued.
            if let Some(conn) = self.live() {
                return Ok(conn);
            }
            let conn = self.dial().await?;
            *self.conn.lock().unwrap_or_else(|e| e.into_inner()) = Some(conn.clone());
            Ok::<_, UpstreamError>(conn)
        };
        match timeout_at(deadline, attempt).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(target: "proxy_ws", url = %self.url, "Upstream dial timed out");
                Err(UpstreamError::Timeout)
            }
        }
    }

    async fn dial(&self) -> Result<Connection, UpstreamError> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(UpstreamError::unavailable)?;
        tracing::info!(target: "proxy_ws", url = %self.url, "Upstream connected");

        let (mut sink, mut source) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let pending: Pending = Arc::new(DashMap::new());
        let cancel = CancellationToken::new();

        let writer_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = writer_cancel.cancelled() => break,
                    next = outbound_rx.recv() => match next {
                        Some(msg) => {
                            if let Err(e) = sink.send(msg).await {
                                tracing::warn!(target: "proxy_ws", error = %e, "Upstream write failed");
                                writer_cancel.cancel();
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            let _ = sink.close().await;
        });

        let reader_cancel = cancel.clone();
        let reader_pending = pending.clone();
        let url = self.url.clone();
        tokio::spawn(async move {
            let reason = loop {
                tokio::select! {
                    _ = reader_cancel.cancelled() => break "upstream connection closed",
                    frame = source.next() => match frame {
                        Some(Ok(Message::Text(text))) => route_reply(&reader_pending, text.as_str()),
                        Some(Ok(Message::Binary(bytes))) => {
                            if let Ok(text) = std::str::from_utf8(&bytes) {
                                route_reply(&reader_pending, text);
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break "upstream connection closed",
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(target: "proxy_ws", error = %e, "Upstream read failed");
                            break "upstream connection lost";
                        }
                    },
                }
            };
            reader_cancel.cancel();
            let in_flight = reader_pending.len();
            reject_all(&reader_pending);
            tracing::warn!(target: "proxy_ws", url = %url, in_flight, reason, "Upstream dropped");
        });

        Ok(Connection {
            outbound,
            pending,
            cancel,
        })
    }

    /// Forward one JSON-RPC request object and wait for its reply. The request
    /// timeout covers dialing and the reply together.
    pub async fn request(&self, mut body: Value) -> Result<Value, UpstreamError> {
        if !body.is_object() {
            return Err(UpstreamError::Batch);
        }
        let deadline = Instant::now() + self.request_timeout;
        let original_id = request_id(&body);
        let proxy_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        body["id"] = Value::from(proxy_id);

        let conn = self.connect(deadline).await?;
        let mut reply = conn.exchange(proxy_id, &body, deadline).await?;
        reply["id"] = original_id;
        Ok(reply)
    }
}
