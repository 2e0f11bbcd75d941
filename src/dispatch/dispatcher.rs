//! Method dispatch.
//!
//! # Responsibilities
//! - Reject an empty or unknown method name
//! - Check the parameter contract before anything reaches the node
//! - Run the handler under the dispatch ceiling
//! - Turn every outcome into an [`Envelope`]
//!
//! # Design Decisions
//! - Tables are built once and shared; cloning a `Dispatcher` is cheap
//! - Handlers get a clone of the dispatcher so composites can dispatch again
//! - The timeout message names the method: `API call <method> failed.`

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::connections::ConnectionHandle;
use crate::dispatch::contract::{ParamSpec, Params};
use crate::dispatch::envelope::Envelope;
use crate::dispatch::table::{Call, MethodTable, Namespace};
use crate::dispatch::{derive, query, rpc};
use crate::node::NodeError;
use crate::observability::metrics;
use crate::resilience::Invoker;

pub const NO_METHOD: &str = "You did not enter a method.";
pub const INVALID_METHOD: &str = "invalid method";

struct Tables {
    rpc: MethodTable,
    query: MethodTable,
    derive: MethodTable,
}

/// Catalog line for one method.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub namespace: Namespace,
    pub method: String,
    pub params: &'static [ParamSpec],
}

#[derive(Clone)]
pub struct Dispatcher {
    tables: Arc<Tables>,
    invoker: Invoker,
}

impl Dispatcher {
    /// Build the full method catalog with `ceiling` as the per-dispatch deadline.
    pub fn new(ceiling: Duration) -> Self {
        Self::with_tables(rpc::table(), query::table(), derive::table(), ceiling)
    }

    pub fn with_tables(rpc: MethodTable, query: MethodTable, derive: MethodTable, ceiling: Duration) -> Self {
        Self {
            tables: Arc::new(Tables { rpc, query, derive }),
            invoker: Invoker::new(ceiling),
        }
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    pub fn table(&self, namespace: Namespace) -> &MethodTable {
        match namespace {
            Namespace::Rpc => &self.tables.rpc,
            Namespace::Query => &self.tables.query,
            Namespace::Derive => &self.tables.derive,
        }
    }

    /// Parameter contract of a method, if it exists.
    pub fn contract(&self, namespace: Namespace, method: &str) -> Option<&'static [ParamSpec]> {
        self.table(namespace).get(method).map(|entry| entry.params())
    }

    /// Pick the method's parameters out of a query string.
    ///
    /// Unknown methods get no parameters; dispatch rejects them anyway.
    pub fn params_from_query(&self, namespace: Namespace, method: &str, query: &HashMap<String, String>) -> Params {
        self.contract(namespace, method)
            .map(|contract| Params::from_query(contract, query))
            .unwrap_or_default()
    }

    /// Every method of every namespace.
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        Namespace::ALL
            .iter()
            .map(|&namespace| self.table(namespace))
            .flat_map(|table| {
                table.names().into_iter().filter_map(move |name| {
                    table.get(name).map(|entry| CatalogEntry {
                        namespace: table.namespace(),
                        method: entry.name().to_string(),
                        params: entry.params(),
                    })
                })
            })
            .collect()
    }

    /// Validate and run `method` against `handle`.
    ///
    /// Never fails: every outcome is an envelope.
    pub async fn dispatch(
        &self,
        namespace: Namespace,
        handle: &Arc<ConnectionHandle>,
        method: &str,
        params: Params,
    ) -> Envelope {
        if method.is_empty() {
            return Envelope::error(NO_METHOD);
        }
        let Some(entry) = self.table(namespace).get(method) else {
            tracing::debug!(namespace = namespace.as_str(), method, "Unknown method");
            return Envelope::error(INVALID_METHOD);
        };
        if let Some(missing) = entry.first_missing(&params) {
            tracing::debug!(method, parameter = missing.key, "Required parameter missing");
            return Envelope::error(format!("missing {}", missing.description));
        }

        let started = Instant::now();
        let call = Call {
            handle: handle.clone(),
            params,
            dispatcher: self.clone(),
        };
        let timeout_message = format!("API call {method} failed.");
        let outcome = self.invoker.run(entry.call(call), &timeout_message).await;
        metrics::record_dispatch(namespace.as_str(), method, outcome.is_ok(), started);

        match outcome {
            Ok(value) => {
                tracing::debug!(
                    namespace = namespace.as_str(),
                    method,
                    endpoint = %handle.endpoint(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Dispatch succeeded"
                );
                Envelope::Result(value)
            }
            Err(e) => {
                if matches!(e, NodeError::Timeout(_)) {
                    metrics::record_timeout(method);
                }
                tracing::warn!(
                    namespace = namespace.as_str(),
                    method,
                    endpoint = %handle.endpoint(),
                    error = %e,
                    "Dispatch failed"
                );
                Envelope::Error(e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("rpc", &self.tables.rpc.len())
            .field("query", &self.tables.query.len())
            .field("derive", &self.tables.derive.len())
            .field("ceiling", &self.invoker.ceiling())
            .finish()
    }
}
