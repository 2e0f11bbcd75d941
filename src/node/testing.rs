//! In-process stand-ins for a node, used by unit tests.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::node::transport::{Connector, Provider};
use crate::node::types::{NodeError, NodeResult};

type Answer = dyn Fn(&str, &[Value]) -> NodeResult<Value> + Send + Sync;

/// Provider answering from a closure and recording every call.
pub struct StubProvider {
    answer: Box<Answer>,
    hang_on: Option<&'static str>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    connected: AtomicBool,
}

impl StubProvider {
    pub fn answering<F>(answer: F) -> Arc<Self>
    where
        F: Fn(&str, &[Value]) -> NodeResult<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            answer: Box::new(answer),
            hang_on: None,
            calls: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        })
    }

    /// Like [`answering`](Self::answering), but calls to `method` never complete.
    pub fn hanging_on<F>(method: &'static str, answer: F) -> Arc<Self>
    where
        F: Fn(&str, &[Value]) -> NodeResult<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            answer: Box::new(answer),
            hang_on: Some(method),
            calls: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        })
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(m, _)| m == method).count()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

#[async_trait]
impl Provider for StubProvider {
    async fn request(&self, method: &str, params: Vec<Value>) -> NodeResult<Value> {
        if !self.is_connected() {
            return Err(NodeError::Disconnected);
        }
        self.calls.lock().unwrap().push((method.to_string(), params.clone()));
        if self.hang_on == Some(method) {
            std::future::pending::<()>().await;
        }
        (self.answer)(method, &params)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// What a [`StubConnector`] does for a given address.
pub enum ConnectBehavior {
    Succeed(Arc<StubProvider>),
    Refuse,
    Hang,
}

/// Connector whose behaviour is chosen per address.
pub struct StubConnector {
    behavior: Box<dyn Fn(&str) -> ConnectBehavior + Send + Sync>,
    delay: Duration,
    connects: AtomicUsize,
}

impl StubConnector {
    pub fn new<F>(behavior: F) -> Arc<Self>
    where
        F: Fn(&str) -> ConnectBehavior + Send + Sync + 'static,
    {
        Self::with_delay(Duration::ZERO, behavior)
    }

    pub fn with_delay<F>(delay: Duration, behavior: F) -> Arc<Self>
    where
        F: Fn(&str) -> ConnectBehavior + Send + Sync + 'static,
    {
        Arc::new(Self {
            behavior: Box::new(behavior),
            delay,
            connects: AtomicUsize::new(0),
        })
    }

    /// Connector that hands out `provider` for every address.
    pub fn always(provider: Arc<StubProvider>) -> Arc<Self> {
        Self::new(move |_| ConnectBehavior::Succeed(provider.clone()))
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for StubConnector {
    async fn connect(&self, address: &str) -> NodeResult<Arc<dyn Provider>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match (self.behavior)(address) {
            ConnectBehavior::Succeed(provider) => Ok(provider),
            ConnectBehavior::Refuse => Err(NodeError::Transport(format!("connection to {address} refused"))),
            ConnectBehavior::Hang => {
                std::future::pending::<()>().await;
                Err(NodeError::Disconnected)
            }
        }
    }
}

/// A registered connection over `provider`, as the registry would hand it out.
pub async fn handle_over(provider: Arc<StubProvider>) -> Arc<crate::connections::ConnectionHandle> {
    let api = crate::node::NodeApi::create(provider).await.unwrap();
    Arc::new(crate::connections::ConnectionHandle::new(
        crate::node::EndpointId::from("ws://node1"),
        api,
    ))
}
