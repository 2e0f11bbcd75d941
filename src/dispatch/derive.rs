//! The `derive` namespace: queries the node computes from several storage items.

use crate::dispatch::table::{Call, MethodTable, Namespace};

const METHODS: &[(&str, &str)] = &[("session", "progress"), ("staking", "validators")];

pub fn table() -> MethodTable {
    let mut table = MethodTable::new(Namespace::Derive);
    for &(section, method) in METHODS {
        table.register(section, method, &[], move |call: Call| async move {
            call.handle.api().derive(section, method, Vec::new()).await
        });
    }
    table
}
