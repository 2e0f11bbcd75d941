//! Method tables: name → (handler, parameter contract).

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::connections::ConnectionHandle;
use crate::dispatch::contract::{first_missing, ParamSpec, Params};
use crate::dispatch::dispatcher::Dispatcher;
use crate::node::NodeResult;

/// The three method namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Rpc,
    Query,
    Derive,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::Rpc, Namespace::Query, Namespace::Derive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Rpc => "rpc",
            Namespace::Query => "query",
            Namespace::Derive => "derive",
        }
    }
}

/// Everything a handler gets to work with.
///
/// `dispatcher` is there for handlers that issue nested dispatches.
pub struct Call {
    pub handle: Arc<ConnectionHandle>,
    pub params: Params,
    pub dispatcher: Dispatcher,
}

pub type Handler = Arc<dyn Fn(Call) -> BoxFuture<'static, NodeResult<Value>> + Send + Sync>;

pub struct MethodEntry {
    name: String,
    params: &'static [ParamSpec],
    handler: Handler,
}

impl MethodEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &'static [ParamSpec] {
        self.params
    }

    pub fn first_missing(&self, params: &Params) -> Option<&'static ParamSpec> {
        first_missing(self.params, params)
    }

    pub fn call(&self, call: Call) -> BoxFuture<'static, NodeResult<Value>> {
        (self.handler)(call)
    }
}

/// All methods of one namespace.
pub struct MethodTable {
    namespace: Namespace,
    entries: HashMap<String, MethodEntry>,
}

impl MethodTable {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            entries: HashMap::new(),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Register `section/method`. A later registration of the same name wins.
    pub fn register<F, Fut>(&mut self, section: &str, method: &str, params: &'static [ParamSpec], handler: F)
    where
        F: Fn(Call) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = NodeResult<Value>> + Send + 'static,
    {
        let name = format!("{section}/{method}");
        let handler: Handler = Arc::new(move |call| handler(call).boxed());
        self.entries.insert(name.clone(), MethodEntry { name, params, handler });
    }

    pub fn get(&self, name: &str) -> Option<&MethodEntry> {
        self.entries.get(name)
    }

    /// Method names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
