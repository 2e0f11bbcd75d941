//! Shared utilities for integration and load testing.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;

use substrate_gateway::config::{GatewayConfig, NodeConfig};
use substrate_gateway::http::GatewayServer;
use substrate_gateway::lifecycle::{bootstrap, Shutdown};
use substrate_gateway::node::WsConnector;

/// How the mock node answers one call.
#[allow(dead_code)]
pub enum Reply {
    Result(Value),
    Error(i64, &'static str),
    /// Never answer.
    Silent,
}

/// A JSON-RPC-over-WebSocket node on an ephemeral port.
pub struct MockNode {
    pub url: String,
    calls: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    drop_all: broadcast::Sender<()>,
}

#[allow(dead_code)]
impl MockNode {
    pub fn calls(&self, method: &str) -> Vec<Vec<Value>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    /// Close every open socket, as a crashing node would.
    pub fn disconnect_all(&self) {
        let _ = self.drop_all.send(());
    }
}

/// Start a programmable mock node.
pub async fn start_mock_node<F>(answer: F) -> MockNode
where
    F: Fn(&str, &[Value]) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let answer = Arc::new(answer);
    let calls = Arc::new(Mutex::new(Vec::new()));
    let (drop_all, _) = broadcast::channel(1);

    let node_calls = calls.clone();
    let node_drop = drop_all.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let answer = answer.clone();
            let calls = node_calls.clone();
            let mut drop_rx = node_drop.subscribe();
            tokio::spawn(async move {
                let Ok(socket) = tokio_tungstenite::accept_async(stream).await else { return };
                let (mut sink, mut source) = socket.split();
                let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

                loop {
                    tokio::select! {
                        frame = source.next() => {
                            let Some(Ok(Message::Text(text))) = frame else { break };
                            let request: Value = match serde_json::from_str(text.as_str()) {
                                Ok(v) => v,
                                Err(_) => continue,
                            };
                            let id = request["id"].clone();
                            let method = request["method"].as_str().unwrap_or_default().to_string();
                            let params = request["params"].as_array().cloned().unwrap_or_default();
                            calls.lock().unwrap().push((method.clone(), params.clone()));

                            let body = match answer(&method, &params) {
                                Reply::Result(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                                Reply::Error(code, message) => json!({
                                    "jsonrpc": "2.0",
                                    "id": id,
                                    "error": {"code": code, "message": message},
                                }),
                                Reply::Silent => continue,
                            };
                            let _ = out_tx.send(Message::text(body.to_string()));
                        }
                        Some(message) = out_rx.recv() => {
                            if sink.send(message).await.is_err() {
                                break;
                            }
                        }
                        _ = drop_rx.recv() => {
                            let _ = sink.close().await;
                            break;
                        }
                    }
                }
            });
        }
    });

    MockNode {
        url: format!("ws://{addr}"),
        calls,
        drop_all,
    }
}

/// A node that answers the connect handshake and the calls in `answers`.
#[allow(dead_code)]
pub async fn start_answering_node(answers: Vec<(&'static str, Value)>) -> MockNode {
    start_mock_node(move |method, _| {
        if method == "system_chain" {
            return Reply::Result(json!("Development"));
        }
        answers
            .iter()
            .find(|(m, _)| *m == method)
            .map(|(_, v)| Reply::Result(v.clone()))
            .unwrap_or(Reply::Error(-32601, "Method not found"))
    })
    .await
}

/// A running gateway on an ephemeral port.
pub struct TestGateway {
    pub url: String,
    pub shutdown: Shutdown,
}

/// Start the gateway with `nodes` pre-connected and the given timeouts.
pub async fn start_gateway(nodes: &[&MockNode], connect_ms: u64, dispatch_ms: u64) -> TestGateway {
    let mut config = GatewayConfig::default();
    config.timeouts.connect_ms = connect_ms;
    config.timeouts.dispatch_ms = dispatch_ms;
    config.nodes = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| NodeConfig {
            name: format!("node{i}"),
            ws_url: node.url.clone(),
        })
        .collect();
    start_gateway_with(config).await
}

pub async fn start_gateway_with(config: GatewayConfig) -> TestGateway {
    let gateway = bootstrap(&config, Arc::new(WsConnector)).await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (_, config_updates) = mpsc::unbounded_channel();
    let server = GatewayServer::new(&config, gateway.registry, gateway.dispatcher);
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestGateway {
        url: format!("http://{addr}"),
        shutdown,
    }
}
