//! Parameter contracts and positional parameters.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Most parameters any method takes.
pub const MAX_PARAMS: usize = 3;

/// One positional parameter of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    /// Query-string key the route layer reads it from.
    pub key: &'static str,
    /// Used in the `missing <description>` error.
    pub description: &'static str,
    pub required: bool,
}

impl ParamSpec {
    pub const fn required(key: &'static str, description: &'static str) -> Self {
        Self { key, description, required: true }
    }

    pub const fn optional(key: &'static str, description: &'static str) -> Self {
        Self { key, description, required: false }
    }
}

/// First required parameter of `contract` that `params` does not carry.
pub fn first_missing<'a>(contract: &'a [ParamSpec], params: &Params) -> Option<&'a ParamSpec> {
    contract
        .iter()
        .enumerate()
        .find(|(slot, spec)| spec.required && params.get(*slot).is_none())
        .map(|(_, spec)| spec)
}

/// Positional parameter values. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params([Option<String>; MAX_PARAMS]);

impl Params {
    /// Build from positional values; anything past [`MAX_PARAMS`] is ignored.
    pub fn positional<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let mut params = Self::default();
        for (slot, value) in values.into_iter().take(MAX_PARAMS).enumerate() {
            params.0[slot] = value.map(Into::into).filter(|v| !v.is_empty());
        }
        params
    }

    /// Read each parameter of `contract` from a query string map.
    pub fn from_query(contract: &[ParamSpec], query: &HashMap<String, String>) -> Self {
        Self::positional(contract.iter().map(|spec| query.get(spec.key).cloned()))
    }

    pub fn get(&self, slot: usize) -> Option<&str> {
        self.0.get(slot).and_then(|v| v.as_deref())
    }

    /// Present values in slot order, as JSON strings.
    pub fn args(&self) -> Vec<Value> {
        self.0
            .iter()
            .flatten()
            .map(|v| Value::String(v.clone()))
            .collect()
    }
}
