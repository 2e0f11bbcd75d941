//! The `rpc` namespace: direct node JSON-RPC calls.

use crate::dispatch::contract::ParamSpec;
use crate::dispatch::table::{Call, MethodTable, Namespace};

const BLOCK_NUMBER: ParamSpec = ParamSpec::optional("block_number", "block number");
const HASH: ParamSpec = ParamSpec::optional("hash", "block hash");

const METHODS: &[(&str, &str, &[ParamSpec])] = &[
    ("chain", "getBlockHash", &[BLOCK_NUMBER]),
    ("chain", "getFinalizedHead", &[]),
    ("chain", "getHeader", &[HASH]),
    ("rpc", "methods", &[]),
    ("system", "chain", &[]),
    ("system", "health", &[]),
    ("system", "networkState", &[]),
    ("system", "properties", &[]),
];

pub fn table() -> MethodTable {
    let mut table = MethodTable::new(Namespace::Rpc);
    for &(section, method, params) in METHODS {
        table.register(section, method, params, move |call: Call| async move {
            call.handle.api().rpc(section, method, call.params.args()).await
        });
    }
    table
}
