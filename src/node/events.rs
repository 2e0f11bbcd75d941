//! Event log records and the staking `Slash` payload.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// One entry of a block's event log.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub phase: Value,
    pub event: RuntimeEvent,
    #[serde(default)]
    pub topics: Vec<Value>,
}

/// The event itself, tagged with the pallet section and method.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeEvent {
    pub section: String,
    pub method: String,
    #[serde(default)]
    pub data: Value,
}

impl RuntimeEvent {
    pub fn is(&self, section: &str, method: &str) -> bool {
        self.section == section && self.method == method
    }
}

/// Why a `Slash` payload could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("expected two fields, found {0}")]
    FieldCount(usize),
    #[error("account field is not a string")]
    Account,
    #[error("amount '{raw}' for {account} is not an unsigned integer")]
    Amount { account: String, raw: String },
    #[error("unsupported payload shape")]
    Shape,
}

impl PayloadError {
    /// The account the payload names, when it got far enough to read one.
    pub fn account(&self) -> Option<&str> {
        match self {
            PayloadError::Amount { account, .. } => Some(account),
            _ => None,
        }
    }
}

/// A decoded `staking.Slash(account, amount)` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashEvent {
    pub account: String,
    pub amount: u128,
}

impl SlashEvent {
    /// Decode an event payload.
    ///
    /// Accepts a JSON array `[account, amount]`, or its textual rendering
    /// `["account",amount]` (brackets, quoted account, comma separator).
    /// Amounts may be numbers, decimal strings or `0x` hex strings.
    pub fn from_payload(data: &Value) -> Result<Self, PayloadError> {
        match data {
            Value::Array(fields) => Self::from_fields(fields),
            Value::String(text) => Self::from_text(text),
            _ => Err(PayloadError::Shape),
        }
    }

    fn from_fields(fields: &[Value]) -> Result<Self, PayloadError> {
        let [account, amount] = fields else {
            return Err(PayloadError::FieldCount(fields.len()));
        };
        let account = account.as_str().ok_or(PayloadError::Account)?;
        let amount = match amount {
            Value::Number(n) => n.as_u64().map(u128::from),
            Value::String(s) => parse_amount(s),
            _ => None,
        };
        let amount = amount.ok_or_else(|| PayloadError::Amount {
            account: account.to_string(),
            raw: fields[1].to_string(),
        })?;
        Ok(Self { account: account.to_string(), amount })
    }

    fn from_text(text: &str) -> Result<Self, PayloadError> {
        if let Ok(Value::Array(fields)) = serde_json::from_str::<Value>(text) {
            return Self::from_fields(&fields);
        }

        let inner = text
            .trim()
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .ok_or(PayloadError::Shape)?;
        let fields: Vec<&str> = inner.split(',').collect();
        let [account, amount] = fields.as_slice() else {
            return Err(PayloadError::FieldCount(fields.len()));
        };

        let account = unquote(account);
        if account.is_empty() {
            return Err(PayloadError::Account);
        }
        let raw = unquote(amount);
        let amount = parse_amount(raw).ok_or_else(|| PayloadError::Amount {
            account: account.to_string(),
            raw: raw.to_string(),
        })?;
        Ok(Self { account: account.to_string(), amount })
    }
}

fn unquote(field: &str) -> &str {
    field.trim().trim_matches('"')
}

fn parse_amount(raw: &str) -> Option<u128> {
    let raw = raw.trim();
    match raw.strip_prefix("0x") {
        Some(hex) => u128::from_str_radix(hex, 16).ok(),
        None => raw.parse::<u128>().ok(),
    }
}
