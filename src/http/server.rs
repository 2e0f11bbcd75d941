//! HTTP server setup and route handlers.
//!
//! # Responsibilities
//! - Create the Axum Router with all gateway routes
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Resolve the `websocket` query parameter to a connection
//! - Hand method calls to the dispatcher and map envelopes to responses
//! - Serve until shutdown, applying node-list reloads on the side
//!
//! # Routes
//! - `GET /api/pingApi`
//! - `GET /api/pingNode?websocket=`
//! - `GET /api/getConnectionsList`
//! - `GET /api/rpc/{section}/{method}`
//! - `GET /api/query/{section}/{method}`
//! - `GET /api/custom/{method}` (query namespace, `custom/` prefix)
//! - `GET /api/derive/{section}/{method}`

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::watcher::apply_updates;
use crate::config::GatewayConfig;
use crate::connections::{ConnectionHandle, ConnectionRegistry};
use crate::dispatch::{Dispatcher, Envelope, Namespace, Params};
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::http::response::{reply, with_liveness, LOST_CONNECTION};

const WEBSOCKET_PARAM: &str = "websocket";
const PING_NODE_FAILED: &str = "API call pingNode failed.";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Dispatcher,
}

/// HTTP front of the gateway.
pub struct GatewayServer {
    router: Router,
    registry: Arc<ConnectionRegistry>,
}

impl GatewayServer {
    pub fn new(config: &GatewayConfig, registry: Arc<ConnectionRegistry>, dispatcher: Dispatcher) -> Self {
        let state = AppState {
            registry: registry.clone(),
            dispatcher,
        };
        let router = build_router(state, Duration::from_secs(config.timeouts.request_secs));
        Self { router, registry }
    }

    /// A copy of the router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// Reloaded configs arriving on `config_updates` get their new nodes connected.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        tokio::spawn(apply_updates(self.registry.clone(), config_updates, shutdown.resubscribe()));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/pingApi", get(ping_api))
        .route("/api/pingNode", get(ping_node))
        .route("/api/getConnectionsList", get(connections_list))
        .route("/api/rpc/{section}/{method}", get(rpc_call))
        .route("/api/query/{section}/{method}", get(query_call))
        .route("/api/custom/{method}", get(custom_call))
        .route("/api/derive/{section}/{method}", get(derive_call))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                .layer(propagate_request_id_layer())
                .layer(TimeoutLayer::new(request_timeout)),
        )
}

async fn ping_api() -> Response {
    reply("pingApi", Envelope::Result(json!("pong")))
}

async fn ping_node(State(state): State<AppState>, Query(query): Query<HashMap<String, String>>) -> Response {
    let handle = match resolve(&state, &query) {
        Ok(handle) => handle,
        Err(envelope) => return reply("pingNode", envelope),
    };

    let envelope = state
        .dispatcher
        .dispatch(Namespace::Rpc, &handle, "system/chain", Params::default())
        .await;
    let envelope = match envelope {
        Envelope::Result(_) => Envelope::Result(json!("pong")),
        Envelope::Error(_) if handle.is_live() => Envelope::error(PING_NODE_FAILED),
        Envelope::Error(_) => Envelope::error(LOST_CONNECTION),
    };
    reply("pingNode", envelope)
}

async fn connections_list(State(state): State<AppState>) -> Response {
    let endpoints: Vec<String> = state
        .registry
        .list_connected()
        .into_iter()
        .map(|endpoint| endpoint.to_string())
        .collect();
    reply("getConnectionsList", Envelope::Result(json!(endpoints)))
}

async fn rpc_call(
    State(state): State<AppState>,
    Path((section, method)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    forward(&state, "rpc", Namespace::Rpc, format!("{section}/{method}"), &query).await
}

async fn query_call(
    State(state): State<AppState>,
    Path((section, method)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    forward(&state, "query", Namespace::Query, format!("{section}/{method}"), &query).await
}

async fn custom_call(
    State(state): State<AppState>,
    Path(method): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    forward(&state, "custom", Namespace::Query, format!("custom/{method}"), &query).await
}

async fn derive_call(
    State(state): State<AppState>,
    Path((section, method)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    forward(&state, "derive", Namespace::Derive, format!("{section}/{method}"), &query).await
}

/// Shared path of every method route.
async fn forward(
    state: &AppState,
    route: &'static str,
    namespace: Namespace,
    method: String,
    query: &HashMap<String, String>,
) -> Response {
    let handle = match resolve(state, query) {
        Ok(handle) => handle,
        Err(envelope) => return reply(route, envelope),
    };

    let params = state.dispatcher.params_from_query(namespace, &method, query);
    let envelope = state.dispatcher.dispatch(namespace, &handle, &method, params).await;
    reply(route, with_liveness(envelope, handle.is_live()))
}

/// The connection named by the `websocket` query parameter.
fn resolve(state: &AppState, query: &HashMap<String, String>) -> Result<Arc<ConnectionHandle>, Envelope> {
    let websocket = query
        .get(WEBSOCKET_PARAM)
        .filter(|w| !w.is_empty())
        .ok_or_else(|| Envelope::error(format!("missing {WEBSOCKET_PARAM}")))?;
    state
        .registry
        .resolve(websocket)
        .map_err(|e| Envelope::error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::testing::{ConnectBehavior, StubConnector, StubProvider};
    use crate::node::NodeError;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn gateway_over(provider: Arc<StubProvider>) -> Router {
        let registry = Arc::new(ConnectionRegistry::new(StubConnector::always(provider), Duration::from_secs(1)));
        registry.connect("ws://node1", "ws://node1").await;
        router_for(registry, Duration::from_secs(1))
    }

    fn router_for(registry: Arc<ConnectionRegistry>, dispatch_ceiling: Duration) -> Router {
        let state = AppState {
            registry,
            dispatcher: Dispatcher::new(dispatch_ceiling),
        };
        build_router(state, Duration::from_secs(5))
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn node(answer: Value) -> Arc<StubProvider> {
        StubProvider::answering(move |method, _| match method {
            "system_chain" => Ok(json!("Development")),
            _ => Ok(answer.clone()),
        })
    }

    #[tokio::test]
    async fn test_ping_api() {
        let router = gateway_over(node(Value::Null)).await;
        let (status, body) = get_json(router, "/api/pingApi").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": "pong"}));
    }

    #[tokio::test]
    async fn test_query_success() {
        let router = gateway_over(node(json!("1000000"))).await;
        let (status, body) = get_json(router, "/api/query/balances/totalIssuance?websocket=ws://node1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": "1000000"}));
    }

    #[tokio::test]
    async fn test_unregistered_endpoint() {
        let router = gateway_over(node(Value::Null)).await;
        let (status, body) = get_json(router, "/api/rpc/system/health?websocket=ws://other").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error": "An API for ws://other needs to be setup before it can be queried"})
        );
    }

    #[tokio::test]
    async fn test_missing_websocket() {
        let router = gateway_over(node(Value::Null)).await;
        let (status, body) = get_json(router, "/api/rpc/system/health").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "missing websocket"}));
    }

    #[tokio::test]
    async fn test_endpoint_whose_setup_timed_out() {
        let registry = Arc::new(ConnectionRegistry::new(
            StubConnector::new(|_| ConnectBehavior::Hang),
            Duration::from_millis(50),
        ));
        registry.connect("ws://slow", "ws://slow").await;
        let router = router_for(registry, Duration::from_secs(1));

        let (status, body) = get_json(router, "/api/query/staking/activeEra?websocket=ws://slow").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error": "An API for ws://slow needs to be setup before it can be queried"})
        );
    }

    #[tokio::test]
    async fn test_missing_parameter() {
        let router = gateway_over(node(Value::Null)).await;
        let (status, body) = get_json(router, "/api/query/council/proposalOf?websocket=ws://node1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "missing hash"}));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let router = gateway_over(node(Value::Null)).await;
        let (status, body) = get_json(router, "/api/derive/staking/nothing?websocket=ws://node1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "invalid method"}));
    }

    #[tokio::test]
    async fn test_lost_connection_overrides_remote_error() {
        let provider = node(json!("0xabc"));
        let router = gateway_over(provider.clone()).await;
        provider.set_connected(false);

        let (status, body) = get_json(router.clone(), "/api/rpc/chain/getFinalizedHead?websocket=ws://node1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Lost connection with node."}));

        let (_, body) = get_json(router, "/api/pingNode?websocket=ws://node1").await;
        assert_eq!(body, json!({"error": "Lost connection with node."}));
        // only the handshake went out
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_ping_node() {
        let provider = node(Value::Null);
        let router = gateway_over(provider.clone()).await;

        let (status, body) = get_json(router, "/api/pingNode?websocket=ws://node1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": "pong"}));
        assert_eq!(provider.call_count("system_chain"), 2);
    }

    #[tokio::test]
    async fn test_ping_node_failure_while_live() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        // the first system_chain is the connect handshake; later ones fail
        let seen = AtomicUsize::new(0);
        let provider = StubProvider::answering(move |method, _| match method {
            "system_chain" if seen.fetch_add(1, Ordering::SeqCst) == 0 => Ok(json!("Development")),
            _ => Err(NodeError::Rpc { code: -32000, message: "busy".into() }),
        });
        let router = gateway_over(provider).await;

        let (status, body) = get_json(router, "/api/pingNode?websocket=ws://node1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "API call pingNode failed."}));
    }

    #[tokio::test]
    async fn test_custom_route_uses_custom_prefix() {
        let provider = StubProvider::answering(|method, _| match method {
            "system_chain" => Ok(json!("Development")),
            "query_system_events_at" => Ok(json!([
                {"event": {"section": "staking", "method": "Slash", "data": ["A", 100]}},
                {"event": {"section": "staking", "method": "Slash", "data": ["B", 50]}},
                {"event": {"section": "staking", "method": "Slash", "data": ["A", 25]}},
            ])),
            _ => Ok(Value::Null),
        });
        let router = gateway_over(provider).await;

        let (status, body) = get_json(
            router,
            "/api/custom/getSlashAmount?websocket=ws://node1&block_hash=0xabc&account_address=A",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": 125}));
    }

    #[tokio::test]
    async fn test_connections_list() {
        let router = gateway_over(node(Value::Null)).await;
        let (status, body) = get_json(router, "/api/getConnectionsList").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": ["ws://node1"]}));
    }

    #[tokio::test]
    async fn test_request_id_echoed() {
        let router = gateway_over(node(Value::Null)).await;

        let generated = router
            .clone()
            .oneshot(Request::builder().uri("/api/pingApi").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(generated.headers().contains_key("x-request-id"));

        let supplied = router
            .oneshot(
                Request::builder()
                    .uri("/api/pingApi")
                    .header("x-request-id", "req-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(supplied.headers()["x-request-id"], "req-1");
    }
}
