//! Wire types for the helper-process line channel.
//!
//! One JSON object per line. Each outbound message names a call and carries a
//! single string argument; each inbound message carries the matching result
//! value or an error, correlated by `id`.

use serde::{Deserialize, Serialize};

use super::errors::BridgeError;

// ─── Messages ────────────────────────────────────────────────────────────────

/// A call written to the helper's stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    pub id: u64,
    pub name: String,
    pub arg: String,
}

impl WireRequest {
    /// Create a new request.
    pub fn new(id: u64, name: &str, arg: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            arg: arg.to_string(),
        }
    }
}

/// A reply read from the helper's stdout (success or error).
///
/// Exactly one of `result`/`error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireReply {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WireReply {
    /// A successful reply carrying `result`.
    pub fn ok(id: u64, result: impl Into<String>) -> Self {
        Self {
            id,
            result: Some(result.into()),
            error: None,
        }
    }

    /// An error reply carrying `message`.
    pub fn err(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Extract the result value, converting helper-side errors to `BridgeError`.
    pub fn into_result(self) -> Result<String, BridgeError> {
        if let Some(message) = self.error {
            return Err(BridgeError::CallFailed { message });
        }
        self.result.ok_or(BridgeError::CallFailed {
            message: "reply carried neither result nor error".into(),
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
