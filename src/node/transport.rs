//! JSON-RPC over WebSocket transport.
//!
//! # Responsibilities
//! - Open one socket per node and keep it for the process lifetime
//! - Correlate responses to requests by id
//! - Own the liveness flag: cleared as soon as the socket closes or errors
//!
//! # Data Flow
//! ```text
//! request() ──▶ pending[id] = oneshot ──▶ writer task ──▶ socket
//! socket ──▶ reader task ──▶ pending.remove(id) ──▶ oneshot ──▶ request()
//! ```

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;

use crate::node::types::{NodeError, NodeResult};

/// An open connection able to carry JSON-RPC calls.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send `method` with positional `params` and wait for the node's answer.
    async fn request(&self, method: &str, params: Vec<Value>) -> NodeResult<Value>;

    /// Whether the underlying socket is still up.
    fn is_connected(&self) -> bool;
}

/// Opens providers for node addresses.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, address: &str) -> NodeResult<Arc<dyn Provider>>;
}

type Pending = DashMap<u64, oneshot::Sender<NodeResult<Value>>>;

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    id: Option<u64>,
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

/// WebSocket JSON-RPC provider.
pub struct WsProvider {
    outbound: mpsc::UnboundedSender<Message>,
    pending: Arc<Pending>,
    next_id: AtomicU64,
    connected: Arc<AtomicBool>,
}

/// Removes an abandoned waiter when a request future is dropped early.
struct PendingSlot<'a> {
    id: u64,
    pending: &'a Pending,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

impl WsProvider {
    /// Open a socket to `url` and start the reader and writer tasks.
    pub async fn connect(url: &str) -> NodeResult<Self> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| NodeError::Transport(format!("WebSocket connection to {url} failed: {e}")))?;

        tracing::debug!(url = %url, status = response.status().as_u16(), "WebSocket connected");

        let (mut sink, mut source) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let pending: Arc<Pending> = Arc::new(DashMap::new());
        let connected = Arc::new(AtomicBool::new(true));

        let writer_connected = connected.clone();
        let writer_url = url.to_string();
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    tracing::warn!(url = %writer_url, error = %e, "WebSocket write failed");
                    break;
                }
            }
            writer_connected.store(false, Ordering::SeqCst);
            let _ = sink.close().await;
        });

        let reader_connected = connected.clone();
        let reader_pending = pending.clone();
        let reader_url = url.to_string();
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => route_response(&reader_pending, text.as_bytes()),
                    Ok(Message::Binary(bytes)) => route_response(&reader_pending, &bytes),
                    Ok(Message::Close(_)) => {
                        tracing::warn!(url = %reader_url, "Node closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(url = %reader_url, error = %e, "WebSocket read failed");
                        break;
                    }
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
            fail_pending(&reader_pending);
        });

        Ok(Self {
            outbound,
            pending,
            next_id: AtomicU64::new(1),
            connected,
        })
    }
}

/// Deliver one inbound frame to its waiter. Frames without an id
/// (subscription notifications) and unknown ids are dropped.
fn route_response(pending: &Pending, raw: &[u8]) {
    let response: RpcResponse = match serde_json::from_slice(raw) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring undecodable frame from node");
            return;
        }
    };
    let Some(id) = response.id else { return };
    let Some((_, waiter)) = pending.remove(&id) else {
        tracing::debug!(id, "Response for abandoned request");
        return;
    };

    let outcome = match response.error {
        Some(err) => Err(NodeError::Rpc { code: err.code, message: err.message }),
        None => Ok(response.result),
    };
    let _ = waiter.send(outcome);
}

/// Register the waiter for `id`, refusing it if the socket went down meanwhile.
///
/// The reader clears `connected` before its final [`fail_pending`], so a waiter
/// inserted after that sweep always sees the cleared flag here.
fn park_waiter(
    pending: &Pending,
    connected: &AtomicBool,
    id: u64,
    waiter: oneshot::Sender<NodeResult<Value>>,
) -> NodeResult<()> {
    pending.insert(id, waiter);
    if !connected.load(Ordering::SeqCst) {
        pending.remove(&id);
        return Err(NodeError::Disconnected);
    }
    Ok(())
}

fn fail_pending(pending: &Pending) {
    let ids: Vec<u64> = pending.iter().map(|entry| *entry.key()).collect();
    for id in ids {
        if let Some((_, waiter)) = pending.remove(&id) {
            let _ = waiter.send(Err(NodeError::Disconnected));
        }
    }
}

#[async_trait]
impl Provider for WsProvider {
    async fn request(&self, method: &str, params: Vec<Value>) -> NodeResult<Value> {
        if !self.is_connected() {
            return Err(NodeError::Disconnected);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        park_waiter(&self.pending, &self.connected, id, tx)?;
        let _slot = PendingSlot { id, pending: &self.pending };

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        self.outbound
            .send(Message::text(payload.to_string()))
            .map_err(|_| NodeError::Disconnected)?;

        rx.await.map_err(|_| NodeError::Disconnected)?
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Connector producing [`WsProvider`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, address: &str) -> NodeResult<Arc<dyn Provider>> {
        let provider = WsProvider::connect(address).await?;
        Ok(Arc::new(provider))
    }
}
