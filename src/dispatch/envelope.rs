//! The uniform response shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{"result": ...}` on success, `{"error": "..."}` on failure. Never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    Result(Value),
    Error(String),
}

impl Envelope {
    pub fn error(message: impl Into<String>) -> Self {
        Envelope::Error(message.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Envelope::Result(_))
    }

    pub fn into_result(self) -> Result<Value, String> {
        match self {
            Envelope::Result(value) => Ok(value),
            Envelope::Error(message) => Err(message),
        }
    }
}
