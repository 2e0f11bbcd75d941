//! Multi-step queries built from other dispatches.
//!
//! # Responsibilities
//! - Resolve the active era index from `staking/activeEra`
//! - Total the `staking.Slash` amounts of one account in one block
//!
//! # Design Decisions
//! - Steps run in sequence, each as its own nested dispatch with its own deadline
//! - A failed step surfaces as one consolidated message; the inner text is logged only
//! - Unreadable slash payloads are skipped, except one naming the queried account,
//!   which fails the call

use serde_json::Value;

use crate::dispatch::contract::Params;
use crate::dispatch::envelope::Envelope;
use crate::dispatch::table::{Call, Namespace};
use crate::node::{EventRecord, NodeApi, NodeError, NodeResult, SlashEvent};

pub const ACTIVE_ERA_FAILED: &str = "API call custom/getActiveEraIndex failed.";
pub const SLASH_AMOUNT_FAILED: &str = "API call custom/getSlashAmount failed.";

/// Index of the era currently active on the node behind `call`.
pub async fn active_era_index(call: &Call) -> NodeResult<u64> {
    let envelope = call
        .dispatcher
        .dispatch(Namespace::Query, &call.handle, "staking/activeEra", Params::default())
        .await;

    let active_era = match envelope {
        Envelope::Result(value) => value,
        Envelope::Error(e) => {
            tracing::debug!(error = %e, "Active era lookup failed");
            return Err(NodeError::Failed(ACTIVE_ERA_FAILED.to_string()));
        }
    };

    active_era.get("index").and_then(era_index).ok_or_else(|| {
        tracing::debug!(%active_era, "Active era has no usable index");
        NodeError::Failed(ACTIVE_ERA_FAILED.to_string())
    })
}

fn era_index(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        _ => None,
    }
}

/// `custom/getSlashAmount`: params are `[block_hash, account_address]`.
pub async fn slash_amount(call: Call) -> NodeResult<Value> {
    let (Some(block_hash), Some(account)) = (call.params.get(0), call.params.get(1)) else {
        return Err(NodeError::Failed(SLASH_AMOUNT_FAILED.to_string()));
    };

    let envelope = call
        .dispatcher
        .dispatch(Namespace::Query, &call.handle, "system/events", Params::positional([Some(block_hash)]))
        .await;
    let raw = envelope.into_result().map_err(|e| {
        tracing::debug!(error = %e, block_hash, "Event log lookup failed");
        NodeError::Failed(SLASH_AMOUNT_FAILED.to_string())
    })?;

    let records = NodeApi::decode_events(raw).map_err(|e| {
        tracing::debug!(error = %e, block_hash, "Event log could not be decoded");
        NodeError::Failed(SLASH_AMOUNT_FAILED.to_string())
    })?;

    let total = total_slashed(&records, account)?;
    Ok(amount_value(total))
}

/// Sum of the `staking.Slash` amounts in `records` that name `account`.
pub fn total_slashed(records: &[EventRecord], account: &str) -> NodeResult<u128> {
    let mut total: u128 = 0;
    for record in records.iter().filter(|r| r.event.is("staking", "Slash")) {
        match SlashEvent::from_payload(&record.event.data) {
            Ok(slash) if slash.account == account => {
                total = total
                    .checked_add(slash.amount)
                    .ok_or_else(|| NodeError::Failed(SLASH_AMOUNT_FAILED.to_string()))?;
            }
            Ok(_) => {}
            Err(e) if e.account() == Some(account) => {
                tracing::debug!(
                    error = %e,
                    data = %record.event.data,
                    "Unreadable Slash payload for queried account"
                );
                return Err(NodeError::Failed(SLASH_AMOUNT_FAILED.to_string()));
            }
            Err(e) => {
                tracing::debug!(error = %e, data = %record.event.data, "Skipping unreadable Slash payload");
            }
        }
    }
    Ok(total)
}

/// Numbers that fit JSON's safe range stay numbers; larger totals become strings.
fn amount_value(total: u128) -> Value {
    match u64::try_from(total) {
        Ok(small) => Value::from(small),
        Err(_) => Value::String(total.to_string()),
    }
}
