//! The `query` namespace: storage reads, era-scoped staking reads and the
//! `custom/*` composites.
//!
//! # Era-scoped methods
//! `staking/erasRewardPoints`, `erasStakers`, `erasTotalStake`,
//! `erasValidatorReward` and `unappliedSlashes` take an optional era index.
//! Without one, the active era is looked up first and used in its place
//! (`erasValidatorReward` uses the era before it, the last one with a known
//! reward). A failed lookup reports `API call <method> failed.`

use serde_json::Value;

use crate::dispatch::composite;
use crate::dispatch::contract::ParamSpec;
use crate::dispatch::table::{Call, MethodTable, Namespace};
use crate::node::{NodeError, NodeResult};

const HASH: ParamSpec = ParamSpec::required("hash", "hash");
const REFERENDUM_INDEX: ParamSpec = ParamSpec::required("referendum_index", "referendum index");
const SESSION_INDEX: ParamSpec = ParamSpec::required("session_index", "session index");
const VALIDATOR_ID: ParamSpec = ParamSpec::required("validator_id", "validator stash address");
const AUTH_INDEX: ParamSpec = ParamSpec::required("auth_index", "validator index");
const ACCOUNT_ID: ParamSpec = ParamSpec::required("account_id", "stash address");
const ERA_INDEX: ParamSpec = ParamSpec::optional("era_index", "era index");
const EVENTS_AT: ParamSpec = ParamSpec::optional("block_hash", "block hash");
const SLASH_BLOCK: ParamSpec = ParamSpec::required("block_hash", "block hash");
const SLASH_ACCOUNT: ParamSpec = ParamSpec::required("account_address", "account address");

/// Plain storage reads: params are forwarded as-is.
const STORAGE: &[(&str, &str, &[ParamSpec])] = &[
    ("balances", "totalIssuance", &[]),
    ("council", "members", &[]),
    ("council", "proposalCount", &[]),
    ("council", "proposalOf", &[HASH]),
    ("council", "proposals", &[]),
    ("democracy", "publicPropCount", &[]),
    ("democracy", "referendumCount", &[]),
    ("democracy", "referendumInfoOf", &[REFERENDUM_INDEX]),
    ("imOnline", "authoredBlocks", &[SESSION_INDEX, VALIDATOR_ID]),
    ("imOnline", "receivedHeartbeats", &[SESSION_INDEX, AUTH_INDEX]),
    ("session", "currentIndex", &[]),
    ("session", "disabledValidators", &[]),
    ("session", "validators", &[]),
    ("staking", "activeEra", &[]),
    ("staking", "bonded", &[ACCOUNT_ID]),
    ("staking", "payee", &[ACCOUNT_ID]),
    ("staking", "validators", &[ACCOUNT_ID]),
];

/// A staking storage item keyed by era first.
#[derive(Debug, Clone, Copy)]
struct EraScoped {
    storage: &'static str,
    /// Slot of the optional era parameter.
    era_slot: usize,
    /// How many eras before the active one to use when none is given.
    back: u64,
}

const ERA_SCOPED: &[(EraScoped, &[ParamSpec])] = &[
    (EraScoped { storage: "erasRewardPoints", era_slot: 0, back: 0 }, &[ERA_INDEX]),
    (EraScoped { storage: "erasStakers", era_slot: 1, back: 0 }, &[ACCOUNT_ID, ERA_INDEX]),
    (EraScoped { storage: "erasTotalStake", era_slot: 0, back: 0 }, &[ERA_INDEX]),
    (EraScoped { storage: "erasValidatorReward", era_slot: 0, back: 1 }, &[ERA_INDEX]),
    (EraScoped { storage: "unappliedSlashes", era_slot: 0, back: 0 }, &[ERA_INDEX]),
];

pub fn table() -> MethodTable {
    let mut table = MethodTable::new(Namespace::Query);

    for &(section, storage, params) in STORAGE {
        table.register(section, storage, params, move |call: Call| async move {
            call.handle.api().query(section, storage, call.params.args()).await
        });
    }
    for &(scope, params) in ERA_SCOPED {
        table.register("staking", scope.storage, params, move |call: Call| era_scoped(call, scope));
    }

    table.register("system", "events", &[EVENTS_AT], |call: Call| async move {
        let api = call.handle.api();
        match call.params.get(0) {
            Some(block_hash) => api.query_at("system", "events", block_hash, Vec::new()).await,
            None => api.query("system", "events", Vec::new()).await,
        }
    });
    table.register("custom", "getSlashAmount", &[SLASH_BLOCK, SLASH_ACCOUNT], composite::slash_amount);

    table
}

/// Query an era-keyed item, filling in the era from the node when absent.
///
/// Remote args are the era followed by the remaining params in order.
async fn era_scoped(call: Call, scope: EraScoped) -> NodeResult<Value> {
    let era = match call.params.get(scope.era_slot) {
        Some(era) => era.to_string(),
        None => {
            let failed = || NodeError::Failed(format!("API call staking/{} failed.", scope.storage));
            let active = composite::active_era_index(&call).await.map_err(|e| {
                tracing::debug!(storage = scope.storage, error = %e, "Could not resolve active era");
                failed()
            })?;
            active.checked_sub(scope.back).ok_or_else(failed)?.to_string()
        }
    };

    let mut args = vec![Value::String(era)];
    args.extend(
        (0..crate::dispatch::contract::MAX_PARAMS)
            .filter(|slot| *slot != scope.era_slot)
            .filter_map(|slot| call.params.get(slot))
            .map(|v| Value::String(v.to_string())),
    );
    call.handle.api().query("staking", scope.storage, args).await
}
