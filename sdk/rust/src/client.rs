use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway reply: `{"result": ...}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    Result(Value),
    Error(String),
}

impl Envelope {
    pub fn result(&self) -> Option<&Value> {
        match self {
            Envelope::Result(value) => Some(value),
            Envelope::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Envelope::Result(_) => None,
            Envelope::Error(message) => Some(message),
        }
    }
}

pub struct GatewayClient {
    client: Client,
    gateway_url: String,
}

impl GatewayClient {
    pub fn new(gateway_url: &str) -> Self {
        Self {
            client: Client::new(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn ping_api(&self) -> Result<Envelope, reqwest::Error> {
        self.get("/api/pingApi", &[]).await
    }

    pub async fn ping_node(&self, websocket: &str) -> Result<Envelope, reqwest::Error> {
        self.get("/api/pingNode", &[("websocket", websocket)]).await
    }

    /// Endpoints the gateway holds a connection to.
    pub async fn connections(&self) -> Result<Envelope, reqwest::Error> {
        self.get("/api/getConnectionsList", &[]).await
    }

    /// Call `method` in `namespace` (`rpc`, `query`, `custom` or `derive`) on `websocket`.
    ///
    /// `method` is `section/method`, or the bare method name for `custom`.
    /// Error envelopes come back as `Ok`; only transport failures are `Err`.
    pub async fn call(
        &self,
        namespace: &str,
        method: &str,
        websocket: &str,
        params: &[(&str, &str)],
    ) -> Result<Envelope, reqwest::Error> {
        let mut query = vec![("websocket", websocket)];
        query.extend_from_slice(params);
        self.get(&format!("/api/{namespace}/{method}"), &query).await
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Envelope, reqwest::Error> {
        self.client
            .get(format!("{}{}", self.gateway_url, path))
            .query(query)
            .send()
            .await?
            .json::<Envelope>()
            .await
    }
}
